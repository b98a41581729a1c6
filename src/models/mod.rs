use crate::tags::sanitize_tags;
use crate::util::{generate_id, normalize_chat_url, now_ms};
use serde::{Deserialize, Serialize};

/// A captured snippet.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub content: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Normalised `/c/...` chat URL, or empty.
    #[serde(default, alias = "chatId")]
    pub chat_url: String,
}

impl Note {
    /// A fresh note with a new id; `None` when `content` is blank.
    pub fn new(content: &str, tags: &[String], chat_url: &str) -> Option<Self> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        Some(Self {
            id: generate_id(),
            content: content.to_string(),
            created_at: now_ms(),
            tags: sanitize_tags(tags),
            chat_url: normalize_chat_url(chat_url, None),
        })
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        crate::tags::contains_tag(&self.tags, tag)
    }

    #[cfg(test)]
    pub(crate) fn for_test(id: &str) -> Self {
        Self {
            id: id.to_string(),
            content: format!("note {id}"),
            created_at: 0,
            tags: Vec::new(),
            chat_url: String::new(),
        }
    }
}

/// Whatever an older build or a hand-edited store left behind.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct StoredNote {
    id: serde_json::Value,
    content: serde_json::Value,
    created_at: serde_json::Value,
    tags: serde_json::Value,
    chat_url: serde_json::Value,
    chat_id: serde_json::Value,
}

impl StoredNote {
    fn into_note(self) -> Option<Note> {
        let content = self.content.as_str()?.trim().to_string();
        if content.is_empty() {
            return None;
        }
        let id = match self.id.as_str() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => generate_id(),
        };
        let created_at = self
            .created_at
            .as_f64()
            .map(|ms| ms.round() as i64)
            .unwrap_or_else(now_ms);
        let tags = match self.tags.as_array() {
            Some(raw) => {
                let strings: Vec<&str> = raw.iter().filter_map(|t| t.as_str()).collect();
                sanitize_tags(strings.as_slice())
            }
            None => Vec::new(),
        };
        let chat_url = [self.chat_url.as_str(), self.chat_id.as_str()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .map(|raw| normalize_chat_url(raw, None))
            .unwrap_or_default();
        Some(Note {
            id,
            content,
            created_at,
            tags,
            chat_url,
        })
    }
}

/// Lenient load: non-array input yields nothing, entries without string
/// content or with blank content are dropped, missing ids are generated.
pub fn normalize_notes(raw: serde_json::Value) -> Vec<Note> {
    let serde_json::Value::Array(entries) = raw else {
        return Vec::new();
    };
    entries
        .into_iter()
        .filter(serde_json::Value::is_object)
        .filter_map(|entry| serde_json::from_value::<StoredNote>(entry).ok())
        .filter_map(StoredNote::into_note)
        .collect()
}

/// The shape written back to storage: trimmed content, sanitised tags and
/// normalised chat URLs. Blank notes are not written.
pub fn serialize_notes(notes: &[Note]) -> Vec<Note> {
    notes
        .iter()
        .filter_map(|note| {
            let content = note.content.trim();
            if content.is_empty() {
                return None;
            }
            Some(Note {
                id: if note.id.is_empty() {
                    generate_id()
                } else {
                    note.id.clone()
                },
                content: content.to_string(),
                created_at: note.created_at,
                tags: sanitize_tags(note.tags.as_slice()),
                chat_url: normalize_chat_url(&note.chat_url, None),
            })
        })
        .collect()
}

/// Saved panel placement, CSS pixels from the viewport's top-left.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PanelPosition {
    pub left: f64,
    pub top: f64,
}
