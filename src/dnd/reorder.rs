use crate::models::Note;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// The ordered notes a drag list mirrors.
pub trait NoteCollection {
    fn notes(&self) -> Vec<Note>;
    /// Replaces the whole collection and persists it.
    fn replace_notes(&self, notes: Vec<Note>);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReorderError {
    Empty,
    UnknownId(String),
    DuplicateId(String),
    Missing { expected: usize, found: usize },
}

impl fmt::Display for ReorderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no notes to reorder"),
            Self::UnknownId(id) => write!(f, "list item {id:?} has no backing note"),
            Self::DuplicateId(id) => write!(f, "list item {id:?} appears more than once"),
            Self::Missing { expected, found } => {
                write!(f, "list shows {found} of {expected} notes")
            }
        }
    }
}

impl std::error::Error for ReorderError {}

/// Orders `current` by `dom_ids`, accepting only a full permutation.
pub fn plan_reorder(current: &[Note], dom_ids: &[String]) -> Result<Vec<Note>, ReorderError> {
    if current.is_empty() {
        return Err(ReorderError::Empty);
    }
    let by_id: HashMap<&str, &Note> = current.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut seen = HashSet::new();
    let mut ordered = Vec::with_capacity(current.len());
    for id in dom_ids {
        let note = by_id
            .get(id.as_str())
            .ok_or_else(|| ReorderError::UnknownId(id.clone()))?;
        if !seen.insert(id.as_str()) {
            return Err(ReorderError::DuplicateId(id.clone()));
        }
        ordered.push((*note).clone());
    }

    if ordered.len() != current.len() {
        return Err(ReorderError::Missing {
            expected: current.len(),
            found: ordered.len(),
        });
    }
    Ok(ordered)
}
