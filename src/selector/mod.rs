//! CSS selector text.
//!
//! Production code only carries the text: the browser backend hands
//! [`Selector::as_css`] straight to `querySelector`/`matches`/`closest`.
//! Test builds also parse it so the in-memory DOM can match elements.

use std::fmt;

#[cfg(test)]
mod parse;
#[cfg(test)]
pub use parse::{ElementView, SelectorError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    source: String,
    /// `None` when the source could not be parsed; such a selector never
    /// matches in memory.
    #[cfg(test)]
    alternatives: Option<Vec<parse::Compound>>,
}

impl Selector {
    /// Selector for built-in CSS text, trimmed.
    pub fn new(source: &str) -> Self {
        Self {
            source: source.trim().to_string(),
            #[cfg(test)]
            alternatives: parse::parse_list(source).ok(),
        }
    }

    pub fn as_css(&self) -> &str {
        &self.source
    }

    /// Join several selectors into one list, preserving their order.
    pub fn any_of(parts: &[&str]) -> Self {
        Self::new(&parts.join(", "))
    }
}

#[cfg(test)]
impl Selector {
    /// Strict parse.
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let alternatives = parse::parse_list(source)?;
        Ok(Self {
            source: source.trim().to_string(),
            alternatives: Some(alternatives),
        })
    }

    pub fn is_parsed(&self) -> bool {
        self.alternatives.is_some()
    }

    pub fn matches<E: ElementView + ?Sized>(&self, el: &E) -> bool {
        self.alternatives
            .as_ref()
            .is_some_and(|alts| alts.iter().any(|c| c.matches(el)))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
