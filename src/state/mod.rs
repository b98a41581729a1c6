use crate::config::{COLLAPSED_KEY, NOTES_KEY};
use crate::models::{normalize_notes, serialize_notes, Note};
use crate::storage::{load_json, save_json, SettingsStore, StorageResult};
use crate::tags::{self, compute_tag_stats, TagEdit, TagStat};
use leptos::logging::warn;
use leptos::prelude::*;

/// A deleted note that can still come back.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingUndo {
    pub note: Note,
    /// Position in the full list at deletion time.
    pub index: usize,
    pub token: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatLinkChange {
    Linked,
    Unlinked,
    /// Nothing to link to: the page is not a conversation.
    NoChat,
    Missing,
}

/// Reactive panel state. Everything is a signal so the view and the list
/// render effect follow it.
#[derive(Clone, Copy)]
pub struct NoteState {
    pub notes: RwSignal<Vec<Note>>,
    pub collapsed: RwSignal<bool>,
    /// Active tag filter; empty shows everything.
    pub filter_tag: RwSignal<String>,

    pub composer_open: RwSignal<bool>,
    pub composer_text: RwSignal<String>,
    pub composer_tags: RwSignal<Vec<String>>,
    pub composer_tag_input: RwSignal<String>,
    /// Set when a tag could not be added; the editor flashes.
    pub tag_flash: RwSignal<bool>,

    /// Freshly added or restored note.
    pub highlight: RwSignal<Option<String>>,
    pub pending_undo: RwSignal<Vec<PendingUndo>>,
    pub attention: RwSignal<bool>,
    /// Note open in the inline editor.
    pub editing: RwSignal<Option<String>>,

    undo_seq: RwSignal<u64>,
}

impl Default for NoteState {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteState {
    pub fn new() -> Self {
        Self {
            notes: RwSignal::new(Vec::new()),
            collapsed: RwSignal::new(false),
            filter_tag: RwSignal::new(String::new()),
            composer_open: RwSignal::new(false),
            composer_text: RwSignal::new(String::new()),
            composer_tags: RwSignal::new(Vec::new()),
            composer_tag_input: RwSignal::new(String::new()),
            tag_flash: RwSignal::new(false),
            highlight: RwSignal::new(None),
            pending_undo: RwSignal::new(Vec::new()),
            attention: RwSignal::new(false),
            editing: RwSignal::new(None),
            undo_seq: RwSignal::new(0),
        }
    }

    /// Prepends a note. Returns its id, or `None` for blank content.
    pub fn add_note(&self, content: &str, tags: &[String], chat_url: &str) -> Option<String> {
        let note = Note::new(content, tags, chat_url)?;
        let id = note.id.clone();
        self.notes.update(|notes| notes.insert(0, note));
        self.highlight.set(Some(id.clone()));
        Some(id)
    }

    /// Removes a note and opens an undo window for it. Returns the undo
    /// token.
    pub fn delete_note(&self, id: &str) -> Option<u64> {
        let index = self
            .notes
            .with_untracked(|notes| notes.iter().position(|n| n.id == id))?;
        let mut removed = None;
        self.notes.update(|notes| removed = Some(notes.remove(index)));
        let note = removed?;
        if self.editing.get_untracked().as_deref() == Some(id) {
            self.editing.set(None);
        }

        let token = self.undo_seq.get_untracked() + 1;
        self.undo_seq.set(token);
        self.pending_undo
            .update(|pending| pending.push(PendingUndo { note, index, token }));
        Some(token)
    }

    /// Puts the note back where it was, bounded by the current length.
    pub fn undo_delete(&self, token: u64) -> Option<String> {
        let mut taken = None;
        self.pending_undo.update(|pending| {
            if let Some(pos) = pending.iter().position(|p| p.token == token) {
                taken = Some(pending.remove(pos));
            }
        });
        let PendingUndo { note, index, .. } = taken?;
        let id = note.id.clone();
        self.notes.update(|notes| {
            let at = index.min(notes.len());
            notes.insert(at, note);
        });
        self.highlight.set(Some(id.clone()));
        Some(id)
    }

    /// Closes the undo window; the deletion becomes final.
    pub fn expire_undo(&self, token: u64) -> bool {
        let mut found = false;
        self.pending_undo.update(|pending| {
            let before = pending.len();
            pending.retain(|p| p.token != token);
            found = pending.len() < before;
        });
        found
    }

    /// Unlinks when the note points at this chat (or there is no chat),
    /// links to `current` otherwise.
    pub fn toggle_chat_link(&self, id: &str, current: Option<&str>) -> ChatLinkChange {
        let current = current.unwrap_or_default();
        let Some(linked) = self
            .notes
            .with_untracked(|notes| notes.iter().find(|n| n.id == id).map(|n| n.chat_url.clone()))
        else {
            return ChatLinkChange::Missing;
        };

        let change = if !linked.is_empty() && (current.is_empty() || linked == current) {
            ChatLinkChange::Unlinked
        } else if current.is_empty() {
            return ChatLinkChange::NoChat;
        } else {
            ChatLinkChange::Linked
        };
        let value = match change {
            ChatLinkChange::Linked => current.to_string(),
            _ => String::new(),
        };
        self.notes.update(|notes| {
            if let Some(note) = notes.iter_mut().find(|n| n.id == id) {
                note.chat_url = value;
            }
        });
        self.highlight.set(Some(id.to_string()));
        change
    }

    /// Opens the inline editor on `id`, closing any other. `false` when the
    /// note is gone.
    pub fn start_edit(&self, id: &str) -> bool {
        if self.note(id).is_none() {
            return false;
        }
        self.editing.set(Some(id.to_string()));
        true
    }

    pub fn cancel_edit(&self) {
        self.editing.set(None);
    }

    /// Replaces a note's content and tags and closes its editor. `false` for
    /// blank content or an unknown id; nothing changes then.
    pub fn update_note(&self, id: &str, content: &str, tags: &[String]) -> bool {
        let content = content.trim();
        if content.is_empty() {
            return false;
        }
        if self.note(id).is_none() {
            return false;
        }
        let tags = tags::sanitize_tags(tags);
        self.notes.update(|notes| {
            if let Some(note) = notes.iter_mut().find(|n| n.id == id) {
                note.content = content.to_string();
                note.tags = tags;
            }
        });
        if self.editing.get_untracked().as_deref() == Some(id) {
            self.editing.set(None);
        }
        self.highlight.set(Some(id.to_string()));
        true
    }

    /// Drops every note. Returns `false` when there was nothing to drop.
    pub fn clear_notes(&self) -> bool {
        if self.notes.with_untracked(Vec::is_empty) {
            return false;
        }
        self.notes.set(Vec::new());
        self.editing.set(None);
        true
    }

    pub fn note(&self, id: &str) -> Option<Note> {
        self.notes
            .with_untracked(|notes| notes.iter().find(|n| n.id == id).cloned())
    }

    pub fn toggle_collapsed(&self) -> bool {
        let next = !self.collapsed.get_untracked();
        self.collapsed.set(next);
        next
    }

    /// Selecting the active tag again clears the filter.
    pub fn toggle_filter_tag(&self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }
        let active = self.filter_tag.get_untracked();
        if active.to_lowercase() == tag.to_lowercase() {
            self.filter_tag.set(String::new());
        } else {
            self.filter_tag.set(tag.to_string());
        }
    }

    pub fn clear_filter(&self) {
        self.filter_tag.set(String::new());
    }

    pub fn is_filter_active(&self, tag: &str) -> bool {
        self.filter_tag
            .with(|active| !active.is_empty() && active.to_lowercase() == tag.to_lowercase())
    }

    /// Notes passing the tag filter (case-insensitive).
    pub fn visible_notes(&self) -> Vec<Note> {
        let filter = self.filter_tag.get();
        self.notes.with(|notes| {
            if filter.is_empty() {
                return notes.clone();
            }
            notes.iter().filter(|n| n.has_tag(&filter)).cloned().collect()
        })
    }

    /// `1 Note`, `3 Notes`, `2 Notes (filtered)`; empty when there are none.
    pub fn counter_label(&self) -> String {
        let total = self.notes.with(Vec::len);
        if total == 0 {
            return String::new();
        }
        if self.filter_tag.with(String::is_empty) {
            return count_label(total);
        }
        format!("{} (filtered)", count_label(self.visible_notes().len()))
    }

    pub fn tag_stats(&self) -> Vec<TagStat> {
        self.notes
            .with(|notes| compute_tag_stats(notes.iter().map(|n| n.tags.as_slice())))
    }

    pub fn open_composer(&self, text: &str) {
        self.composer_text.set(text.trim().to_string());
        self.composer_tag_input.set(String::new());
        self.composer_open.set(true);
    }

    pub fn close_composer(&self) {
        self.composer_open.set(false);
        self.composer_text.set(String::new());
        self.composer_tag_input.set(String::new());
    }

    pub fn can_save_composer(&self) -> bool {
        self.composer_text.with(|t| !t.trim().is_empty())
    }

    /// Text and tags to save, with any half-typed tag committed first.
    /// `None` when the text is blank.
    pub fn take_composer(&self) -> Option<(String, Vec<String>)> {
        let text = self.composer_text.get_untracked().trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.commit_composer_tag_input();
        let tags = self.composer_tags.get_untracked();
        self.close_composer();
        Some((text, tags))
    }

    pub fn edit_composer_tags(&self, edit: impl FnOnce(&mut Vec<String>) -> TagEdit) -> TagEdit {
        let mut result = TagEdit::Invalid;
        self.composer_tags.update(|tags| result = edit(tags));
        if result == TagEdit::LimitReached {
            self.tag_flash.set(true);
        }
        result
    }

    pub fn toggle_composer_tag(&self, tag: &str) -> TagEdit {
        self.edit_composer_tags(|tags| tags::toggle_tag(tags, tag))
    }

    pub fn remove_composer_tag(&self, tag: &str) -> TagEdit {
        self.edit_composer_tags(|tags| tags::remove_tag(tags, tag))
    }

    pub fn clear_composer_tags(&self) {
        self.composer_tags.set(Vec::new());
        self.composer_tag_input.set(String::new());
    }

    /// Adds whatever is typed in the tag input. Returns `false` (and flashes)
    /// when there was input but none of it was added.
    pub fn commit_composer_tag_input(&self) -> bool {
        let input = self.composer_tag_input.get_untracked();
        if input.trim().is_empty() {
            return true;
        }
        let mut ok = true;
        self.composer_tags
            .update(|tags| ok = tags::commit_tag_input(tags, &input));
        self.composer_tag_input.set(String::new());
        if !ok {
            self.tag_flash.set(true);
        }
        ok
    }

    /// Backspace in an empty tag input drops the last tag.
    pub fn pop_composer_tag(&self) -> Option<String> {
        let mut popped = None;
        self.composer_tags.update(|tags| popped = tags.pop());
        popped
    }

    pub fn clear_highlight(&self, id: &str) {
        if self.highlight.get_untracked().as_deref() == Some(id) {
            self.highlight.set(None);
        }
    }

    /// Reads notes and the collapsed flag. Unreadable notes are logged and
    /// leave the list empty.
    pub fn load(&self, store: &dyn SettingsStore) {
        match load_json::<serde_json::Value>(store, NOTES_KEY) {
            Ok(Some(raw)) => self.notes.set(normalize_notes(raw)),
            Ok(None) => self.notes.set(Vec::new()),
            Err(e) => {
                warn!("[note-helper] failed to load notes: {e}");
                self.notes.set(Vec::new());
            }
        }
        let collapsed = store
            .get_raw(COLLAPSED_KEY)
            .ok()
            .flatten()
            .is_some_and(|raw| raw.trim() == "true");
        self.collapsed.set(collapsed);
    }

    /// Writes notes and the collapsed flag; failures are logged.
    pub fn persist(&self, store: &dyn SettingsStore) {
        if let Err(e) = self.try_persist(store) {
            warn!("[note-helper] failed to save notes: {e}");
        }
    }

    fn try_persist(&self, store: &dyn SettingsStore) -> StorageResult<()> {
        let serialized = self.notes.with_untracked(|notes| serialize_notes(notes));
        save_json(store, NOTES_KEY, &serialized)?;
        let collapsed = self.collapsed.get_untracked();
        store.set_raw(COLLAPSED_KEY, if collapsed { "true" } else { "false" })
    }
}

fn count_label(n: usize) -> String {
    if n == 1 {
        "1 Note".to_string()
    } else {
        format!("{n} Notes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn state_with(ids: &[&str]) -> NoteState {
        let state = NoteState::new();
        state
            .notes
            .set(ids.iter().map(|id| Note::for_test(id)).collect());
        state
    }

    fn order(state: &NoteState) -> Vec<String> {
        state
            .notes
            .get_untracked()
            .into_iter()
            .map(|n| n.id)
            .collect()
    }

    #[test]
    fn test_add_note_prepends_trimmed_and_highlights() {
        let state = state_with(&["a"]);
        let id = state
            .add_note("  snippet \n", &["bug".to_string(), "BUG".to_string()], "")
            .expect("added");
        let notes = state.notes.get_untracked();
        assert_eq!(notes[0].id, id);
        assert_eq!(notes[0].content, "snippet");
        assert_eq!(notes[0].tags, vec!["bug"]);
        assert_eq!(state.highlight.get_untracked(), Some(id));
        assert!(state.add_note("   ", &[], "").is_none());
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn test_undo_restores_original_index() {
        let state = state_with(&["a", "b", "c"]);
        let token = state.delete_note("b").expect("deleted");
        assert_eq!(order(&state), vec!["a", "c"]);
        assert_eq!(state.pending_undo.get_untracked().len(), 1);

        assert_eq!(state.undo_delete(token).as_deref(), Some("b"));
        assert_eq!(order(&state), vec!["a", "b", "c"]);
        assert!(state.pending_undo.get_untracked().is_empty());
        assert!(state.undo_delete(token).is_none());
    }

    #[test]
    fn test_undo_index_is_bounded_and_expiry_is_final() {
        let state = state_with(&["a", "b", "c"]);
        let late = state.delete_note("c").expect("deleted");
        let early = state.delete_note("a").expect("deleted");
        state.delete_note("b").expect("deleted");

        assert!(state.expire_undo(early));
        assert!(!state.expire_undo(early));
        assert!(state.undo_delete(early).is_none());

        // "c" was at index 2 but the list is empty now
        state.undo_delete(late).expect("restored");
        assert_eq!(order(&state), vec!["c"]);
        assert!(state.delete_note("missing").is_none());
    }

    #[test]
    fn test_update_note_replaces_content_and_tags() {
        let state = state_with(&["a", "b"]);
        assert!(state.start_edit("b"));
        assert!(!state.start_edit("missing"));
        assert_eq!(state.editing.get_untracked().as_deref(), Some("b"));

        assert!(!state.update_note("b", "  \n ", &[]));
        assert_eq!(state.note("b").map(|n| n.content).as_deref(), Some("note b"));
        assert_eq!(state.editing.get_untracked().as_deref(), Some("b"));

        let tags = vec![" Bug ".to_string(), "bug".to_string(), "idea".to_string()];
        assert!(state.update_note("b", " fixed text ", &tags));
        let note = state.note("b").expect("note");
        assert_eq!(note.content, "fixed text");
        assert_eq!(note.tags, vec!["Bug", "idea"]);
        assert!(state.editing.get_untracked().is_none());
        assert_eq!(state.highlight.get_untracked().as_deref(), Some("b"));
        assert_eq!(order(&state), vec!["a", "b"]);

        assert!(!state.update_note("zz", "text", &[]));
    }

    #[test]
    fn test_toggle_chat_link() {
        let state = state_with(&["a"]);
        let chat = "https://chat.openai.com/c/one";
        let other = "https://chat.openai.com/c/two";

        assert_eq!(state.toggle_chat_link("a", None), ChatLinkChange::NoChat);
        assert_eq!(state.toggle_chat_link("a", Some(chat)), ChatLinkChange::Linked);
        assert_eq!(state.note("a").map(|n| n.chat_url).as_deref(), Some(chat));
        // linked elsewhere: relink to the current chat
        assert_eq!(state.toggle_chat_link("a", Some(other)), ChatLinkChange::Linked);
        assert_eq!(state.toggle_chat_link("a", Some(other)), ChatLinkChange::Unlinked);
        assert_eq!(state.toggle_chat_link("a", Some(chat)), ChatLinkChange::Linked);
        // no chat open: unlink
        assert_eq!(state.toggle_chat_link("a", None), ChatLinkChange::Unlinked);
        assert_eq!(state.toggle_chat_link("zz", Some(chat)), ChatLinkChange::Missing);
    }

    #[test]
    fn test_filter_and_counter_label() {
        let state = NoteState::new();
        assert_eq!(state.counter_label(), "");
        state.add_note("one", &["Bug".to_string()], "");
        assert_eq!(state.counter_label(), "1 Note");
        state.add_note("two", &["idea".to_string()], "");
        state.add_note("three", &["bug".to_string()], "");
        assert_eq!(state.counter_label(), "3 Notes");

        state.toggle_filter_tag("BUG");
        assert_eq!(state.visible_notes().len(), 2);
        assert_eq!(state.counter_label(), "2 Notes (filtered)");
        assert!(state.is_filter_active("bug"));

        state.toggle_filter_tag("idea");
        assert_eq!(state.counter_label(), "1 Note (filtered)");
        state.toggle_filter_tag("Idea");
        assert_eq!(state.filter_tag.get_untracked(), "");
        assert_eq!(state.visible_notes().len(), 3);

        let stats = state.tag_stats();
        assert_eq!(stats[0].tag, "bug");
        assert_eq!(stats[0].count, 2);
    }

    #[test]
    fn test_composer_commits_pending_tag_input() {
        let state = NoteState::new();
        state.open_composer("  body  ");
        assert!(state.composer_open.get_untracked());
        assert_eq!(state.composer_text.get_untracked(), "body");

        state.toggle_composer_tag("todo");
        state.composer_tag_input.set("alpha, beta".to_string());
        let (text, tags) = state.take_composer().expect("saved");
        assert_eq!(text, "body");
        assert_eq!(tags, vec!["todo", "alpha", "beta"]);
        assert!(!state.composer_open.get_untracked());
        assert_eq!(state.composer_text.get_untracked(), "");

        assert!(state.take_composer().is_none());
    }

    #[test]
    fn test_tag_limit_flashes() {
        let state = NoteState::new();
        state
            .composer_tags
            .set((0..12).map(|i| format!("t{i}")).collect());
        assert_eq!(state.toggle_composer_tag("extra"), TagEdit::LimitReached);
        assert!(state.tag_flash.get_untracked());
    }

    #[test]
    fn test_persist_then_load() {
        let store = MemoryStore::default();
        let state = state_with(&["a", "b"]);
        state.collapsed.set(true);
        state.persist(&store);
        assert_eq!(
            store.get_raw(COLLAPSED_KEY).expect("read").as_deref(),
            Some("true")
        );

        let loaded = NoteState::new();
        loaded.load(&store);
        assert_eq!(order(&loaded), vec!["a", "b"]);
        assert!(loaded.collapsed.get_untracked());
    }

    #[test]
    fn test_load_survives_corrupt_store() {
        let store = MemoryStore::default();
        store.set_raw(NOTES_KEY, "[{oops").expect("write");
        let state = state_with(&["stale"]);
        state.load(&store);
        assert!(state.notes.get_untracked().is_empty());
        assert!(!state.collapsed.get_untracked());
    }
}
