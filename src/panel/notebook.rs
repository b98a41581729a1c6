use super::platform::Platform;
use crate::companion::{ChatUrlSource, NoteOptions, NoteSink};
use crate::dnd::NoteCollection;
use crate::models::Note;
use crate::schedule::Scheduler;
use crate::state::{ChatLinkChange, NoteState};
use crate::storage::SettingsStore;
use crate::tags::parse_tag_input;
use leptos::prelude::*;
use std::rc::Rc;
use std::sync::Arc;

pub const UNDO_WINDOW_MS: u32 = 10_000;
pub const HIGHLIGHT_MS: u32 = 1_200;
pub const ATTENTION_MS: u32 = 600;
pub const TAG_FLASH_MS: u32 = 600;

pub const CLEAR_CONFIRM: &str = "Delete all notes?";
pub const NO_CHAT_ALERT: &str = "No chat link detected. Open a chat and try again.";

/// `data-action` values used across the panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumString, strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum NoteAction {
    OpenComposer,
    CancelComposer,
    SaveComposer,
    TogglePanel,
    ClearNotes,
    ToggleChatLink,
    CopyNote,
    EditNote,
    SaveNoteEdit,
    CancelNoteEdit,
    DeleteNote,
    UndoDelete,
    ToggleFilterTag,
    ClearTagFilter,
    ToggleTag,
    RemoveTag,
    ClearTags,
}

/// What an action applies to, read from the clicked element and its item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionTarget {
    pub note_id: Option<String>,
    pub tag: Option<String>,
    pub undo_token: Option<u64>,
    /// Inline editor text, when the item has an open editor.
    pub edit_content: Option<String>,
    /// Inline editor tag field, comma separated.
    pub edit_tags: Option<String>,
}

/// Panel controller: applies user intents to [`NoteState`], persists, and
/// runs the timers (highlight, undo window, attention pulse).
pub struct Notebook {
    state: NoteState,
    store: Arc<dyn SettingsStore>,
    scheduler: Rc<dyn Scheduler>,
    platform: Rc<dyn Platform>,
    chat_url: ChatUrlSource,
}

impl Notebook {
    pub fn new(
        state: NoteState,
        store: Arc<dyn SettingsStore>,
        scheduler: Rc<dyn Scheduler>,
        platform: Rc<dyn Platform>,
        chat_url: ChatUrlSource,
    ) -> Self {
        Self {
            state,
            store,
            scheduler,
            platform,
            chat_url,
        }
    }

    pub fn state(&self) -> NoteState {
        self.state
    }

    pub fn store(&self) -> Arc<dyn SettingsStore> {
        self.store.clone()
    }

    pub fn load(&self) {
        self.state.load(self.store.as_ref());
    }

    pub fn persist(&self) {
        self.state.persist(self.store.as_ref());
    }

    pub fn add(&self, text: &str, tags: &[String], chat_url: Option<&str>) -> Option<String> {
        let id = self
            .state
            .add_note(text, tags, chat_url.unwrap_or_default())?;
        self.persist();
        self.fade_highlight(&id);
        Some(id)
    }

    fn fade_highlight(&self, id: &str) {
        let state = self.state;
        let id = id.to_string();
        self.scheduler
            .set_timeout(HIGHLIGHT_MS, Box::new(move || state.clear_highlight(&id)));
    }

    /// Expands the panel and pulses it.
    pub fn focus(&self) {
        if self.state.collapsed.get_untracked() {
            self.state.collapsed.set(false);
            self.persist();
        }
        self.state.attention.set(true);
        let state = self.state;
        self.scheduler
            .set_timeout(ATTENTION_MS, Box::new(move || state.attention.set(false)));
    }

    pub fn open_composer(&self, text: &str) {
        self.focus();
        self.state.open_composer(text);
    }

    pub fn save_composer(&self) -> Option<String> {
        let saved = self.state.take_composer();
        self.schedule_flash_reset();
        let (text, tags) = saved?;
        let id = self.add(&text, &tags, None)?;
        self.focus();
        Some(id)
    }

    pub fn commit_tag_input(&self) -> bool {
        let ok = self.state.commit_composer_tag_input();
        self.schedule_flash_reset();
        ok
    }

    pub fn toggle_composer_tag(&self, tag: &str) {
        self.state.toggle_composer_tag(tag);
        self.schedule_flash_reset();
    }

    fn schedule_flash_reset(&self) {
        if !self.state.tag_flash.get_untracked() {
            return;
        }
        let state = self.state;
        self.scheduler
            .set_timeout(TAG_FLASH_MS, Box::new(move || state.tag_flash.set(false)));
    }

    /// Deletes with a [`UNDO_WINDOW_MS`] undo window. The deletion is
    /// persisted right away; undo writes the note back.
    pub fn delete(&self, id: &str) -> Option<u64> {
        let token = self.state.delete_note(id)?;
        self.persist();
        let state = self.state;
        self.scheduler.set_timeout(
            UNDO_WINDOW_MS,
            Box::new(move || {
                state.expire_undo(token);
            }),
        );
        Some(token)
    }

    pub fn undo(&self, token: u64) -> Option<String> {
        let id = self.state.undo_delete(token)?;
        self.persist();
        self.fade_highlight(&id);
        Some(id)
    }

    pub fn toggle_chat_link(&self, id: &str) -> ChatLinkChange {
        let current = (self.chat_url)();
        let change = self.state.toggle_chat_link(id, current.as_deref());
        match change {
            ChatLinkChange::Linked | ChatLinkChange::Unlinked => {
                self.persist();
                self.fade_highlight(id);
            }
            ChatLinkChange::NoChat => self.platform.alert(NO_CHAT_ALERT),
            ChatLinkChange::Missing => {}
        }
        change
    }

    pub fn edit(&self, id: &str) -> bool {
        self.state.start_edit(id)
    }

    /// Saves the inline editor. Blank content deletes the note instead,
    /// with the usual undo window.
    pub fn save_edit(&self, id: &str, content: &str, tags_input: &str) -> bool {
        if content.trim().is_empty() {
            return self.delete(id).is_some();
        }
        let tags = parse_tag_input(tags_input);
        if !self.state.update_note(id, content, &tags) {
            return false;
        }
        self.persist();
        self.fade_highlight(id);
        true
    }

    pub fn cancel_edit(&self) {
        self.state.cancel_edit();
    }

    pub fn copy(&self, id: &str) -> bool {
        let Some(note) = self.state.note(id) else {
            return false;
        };
        self.platform.copy_text(&note.content);
        true
    }

    /// Asks first; does nothing on an empty list.
    pub fn clear(&self) -> bool {
        if self.state.notes.with_untracked(Vec::is_empty) {
            return false;
        }
        if !self.platform.confirm(CLEAR_CONFIRM) {
            return false;
        }
        self.state.clear_notes();
        self.persist();
        true
    }

    pub fn toggle_collapsed(&self) {
        self.state.toggle_collapsed();
        self.persist();
    }

    pub fn handle(&self, action: NoteAction, target: &ActionTarget) {
        let note_id = target.note_id.as_deref();
        let tag = target.tag.as_deref().unwrap_or_default();
        match action {
            NoteAction::OpenComposer => self.open_composer(""),
            NoteAction::CancelComposer => self.state.close_composer(),
            NoteAction::SaveComposer => {
                self.save_composer();
            }
            NoteAction::TogglePanel => self.toggle_collapsed(),
            NoteAction::ClearNotes => {
                self.clear();
            }
            NoteAction::ToggleChatLink => {
                if let Some(id) = note_id {
                    self.toggle_chat_link(id);
                }
            }
            NoteAction::CopyNote => {
                if let Some(id) = note_id {
                    self.copy(id);
                }
            }
            NoteAction::EditNote => {
                if let Some(id) = note_id {
                    self.edit(id);
                }
            }
            NoteAction::SaveNoteEdit => {
                if let (Some(id), Some(content)) = (note_id, target.edit_content.as_deref()) {
                    self.save_edit(id, content, target.edit_tags.as_deref().unwrap_or_default());
                }
            }
            NoteAction::CancelNoteEdit => self.cancel_edit(),
            NoteAction::DeleteNote => {
                if let Some(id) = note_id {
                    self.delete(id);
                }
            }
            NoteAction::UndoDelete => {
                if let Some(token) = target.undo_token {
                    self.undo(token);
                }
            }
            NoteAction::ToggleFilterTag => self.state.toggle_filter_tag(tag),
            NoteAction::ClearTagFilter => self.state.clear_filter(),
            NoteAction::ToggleTag => self.toggle_composer_tag(tag),
            NoteAction::RemoveTag => {
                self.state.remove_composer_tag(tag);
            }
            NoteAction::ClearTags => self.state.clear_composer_tags(),
        }
    }
}

impl NoteSink for Notebook {
    fn add_note(&self, text: &str, options: NoteOptions) {
        self.add(text, &[], options.chat_url.as_deref());
    }

    fn open_composer(&self, text: &str) {
        Notebook::open_composer(self, text);
    }

    fn focus_panel(&self) {
        self.focus();
    }
}

impl NoteCollection for Notebook {
    fn notes(&self) -> Vec<Note> {
        self.state.notes.get_untracked()
    }

    fn replace_notes(&self, notes: Vec<Note>) {
        self.state.notes.set(notes);
        self.persist();
    }
}
