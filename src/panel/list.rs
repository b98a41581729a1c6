//! The note list is rendered imperatively through [`HostDom`] so the drag
//! engine can own its children between renders.

use super::notebook::{ActionTarget, NoteAction, Notebook};
use crate::dom::{DomEvent, EventData, HostDom};
use crate::models::Note;
use crate::selector::Selector;
use crate::state::NoteState;
use crate::tags::format_tag_label;
use crate::util::format_timestamp;
use leptos::prelude::*;
use std::rc::Rc;
use std::str::FromStr;

pub const UNDO_LABEL: &str = "Note deleted";
pub const EDIT_TAGS_PLACEHOLDER: &str = "Tags, comma separated";

const EDITING_ITEM: &str = r#"[data-note-editing="true"]"#;
const EDIT_INPUT: &str = r#"textarea[data-role="note-edit-input"]"#;
const EDIT_TAGS: &str = r#"input[data-role="note-edit-tags"]"#;

/// Unsaved inline editor contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditDraft {
    pub content: String,
    pub tags: String,
}

impl EditDraft {
    fn of(note: &Note) -> Self {
        Self {
            content: note.content.clone(),
            tags: note.tags.join(", "),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ListEntry {
    Note(Note),
    /// Inline undo placeholder where a deleted note used to be.
    Undo(u64),
}

/// What the list shows right now: visible notes with undo placeholders
/// spliced in at their old positions. Reads the signals tracked.
pub fn list_entries(state: &NoteState) -> Vec<ListEntry> {
    let filter = state.filter_tag.get();
    let mut entries: Vec<(bool, ListEntry)> = state.notes.with(|notes| {
        notes
            .iter()
            .map(|n| (filter.is_empty() || n.has_tag(&filter), ListEntry::Note(n.clone())))
            .collect()
    });
    state.pending_undo.with(|pending| {
        for p in pending {
            let at = p.index.min(entries.len());
            entries.insert(at, (true, ListEntry::Undo(p.token)));
        }
    });
    entries
        .into_iter()
        .filter_map(|(shown, entry)| shown.then_some(entry))
        .collect()
}

fn append<D: HostDom>(
    dom: &D,
    parent: &D::Node,
    tag: &str,
    attrs: &[(&str, &str)],
    text: Option<&str>,
) -> Option<D::Node> {
    let el = dom.create_element(tag)?;
    for (name, value) in attrs {
        dom.set_attribute(&el, name, value);
    }
    if let Some(text) = text {
        dom.set_text_content(&el, text);
    }
    dom.insert_before(parent, &el, None);
    Some(el)
}

fn render_note<D: HostDom>(
    dom: &D,
    list: &D::Node,
    note: &Note,
    highlight: bool,
    draft: Option<&EditDraft>,
) -> Option<D::Node> {
    let class = if highlight {
        "cgpt-note-item cgpt-note-highlight"
    } else {
        "cgpt-note-item"
    };
    let item = append(dom, list, "article", &[("class", class), ("data-note-id", note.id.as_str())], None)?;

    let header = append(dom, &item, "header", &[("class", "cgpt-note-item-header")], None)?;
    let meta = append(dom, &header, "div", &[("class", "cgpt-note-meta")], None)?;
    append(
        dom,
        &meta,
        "span",
        &[("class", "cgpt-note-time")],
        Some(format_timestamp(note.created_at).as_str()),
    );
    let linked = !note.chat_url.is_empty();
    if linked {
        append(
            dom,
            &meta,
            "a",
            &[
                ("class", "cgpt-note-chat-link"),
                ("data-role", "note-chat-link"),
                ("href", note.chat_url.as_str()),
                ("target", "_blank"),
                ("rel", "noopener noreferrer"),
            ],
            Some("Open chat"),
        );
    }

    let actions = append(dom, &header, "div", &[("class", "cgpt-note-item-actions")], None)?;
    if let Some(draft) = draft {
        dom.set_attribute(&item, "data-note-editing", "true");
        dom.set_attribute(&actions, "data-edit-mode", "true");
        let save = (NoteAction::SaveNoteEdit, "cgpt-note-btn small", "Save changes", "Save");
        let cancel = (NoteAction::CancelNoteEdit, "cgpt-note-btn small ghost", "Discard changes", "Cancel");
        for (action, class, title, label) in [save, cancel] {
            append_button(dom, &actions, action, class, title, label)?;
        }
        render_edit_area(dom, &item, draft)?;
        return Some(item);
    }

    let buttons: [(NoteAction, &str, &str, &str); 4] = [
        (
            NoteAction::ToggleChatLink,
            "cgpt-note-icon-btn",
            if linked {
                "Remove chat link"
            } else {
                "Link to the current chat"
            },
            "Chat",
        ),
        (NoteAction::EditNote, "cgpt-note-icon-btn", "Edit note", "Edit"),
        (NoteAction::CopyNote, "cgpt-note-icon-btn", "Copy to clipboard", "Copy"),
        (NoteAction::DeleteNote, "cgpt-note-icon-btn danger", "Delete note", "Delete"),
    ];
    for (action, class, title, label) in buttons {
        let btn = append_button(dom, &actions, action, class, title, label)?;
        if action == NoteAction::ToggleChatLink {
            dom.set_attribute(&btn, "data-chat-linked", if linked { "true" } else { "false" });
        }
    }

    if !note.tags.is_empty() {
        let tags = append(
            dom,
            &item,
            "div",
            &[("class", "cgpt-note-tags"), ("data-role", "note-tags")],
            None,
        )?;
        for tag in &note.tags {
            append(
                dom,
                &tags,
                "span",
                &[("class", "cgpt-note-tag"), ("data-tag", tag.as_str())],
                Some(format_tag_label(tag).as_str()),
            );
        }
    }

    append(dom, &item, "pre", &[("class", "cgpt-note-text")], Some(note.content.as_str()));
    Some(item)
}

fn append_button<D: HostDom>(
    dom: &D,
    parent: &D::Node,
    action: NoteAction,
    class: &str,
    title: &str,
    label: &str,
) -> Option<D::Node> {
    append(
        dom,
        parent,
        "button",
        &[
            ("type", "button"),
            ("class", class),
            ("data-action", action.as_ref()),
            ("title", title),
        ],
        Some(label),
    )
}

/// Textarea plus tag field in place of the note text.
fn render_edit_area<D: HostDom>(dom: &D, item: &D::Node, draft: &EditDraft) -> Option<D::Node> {
    let area = append(dom, item, "div", &[("class", "cgpt-note-edit-area")], None)?;
    let input = append(
        dom,
        &area,
        "textarea",
        &[("class", "cgpt-note-edit-input"), ("data-role", "note-edit-input")],
        None,
    )?;
    dom.set_value(&input, &draft.content);
    let tags = append(
        dom,
        &area,
        "input",
        &[
            ("type", "text"),
            ("class", "cgpt-note-edit-tags"),
            ("data-role", "note-edit-tags"),
            ("placeholder", EDIT_TAGS_PLACEHOLDER),
        ],
        None,
    )?;
    dom.set_value(&tags, &draft.tags);
    Some(area)
}

/// Editor contents of the open editor for `id`, if it is on screen.
fn read_draft<D: HostDom>(dom: &D, list: &D::Node, id: &str) -> Option<EditDraft> {
    let item = dom.query_selector(list, &Selector::new(EDITING_ITEM))?;
    if dom.attribute(&item, "data-note-id").as_deref() != Some(id) {
        return None;
    }
    Some(read_editor(dom, &item))
}

fn read_editor<D: HostDom>(dom: &D, item: &D::Node) -> EditDraft {
    let value = |css: &str| {
        dom.query_selector(item, &Selector::new(css))
            .map(|el| dom.value(&el))
            .unwrap_or_default()
    };
    EditDraft {
        content: value(EDIT_INPUT),
        tags: value(EDIT_TAGS),
    }
}

fn render_undo<D: HostDom>(dom: &D, list: &D::Node, token: u64) -> Option<D::Node> {
    let token = token.to_string();
    let ph = append(
        dom,
        list,
        "div",
        &[("class", "cgpt-note-undo-inline"), ("data-undo-token", token.as_str())],
        None,
    )?;
    append(dom, &ph, "span", &[], Some(UNDO_LABEL));
    append(
        dom,
        &ph,
        "button",
        &[
            ("type", "button"),
            ("class", "cgpt-note-btn small"),
            ("data-action", NoteAction::UndoDelete.as_ref()),
            ("data-undo-token", token.as_str()),
        ],
        Some("Undo"),
    );
    Some(ph)
}

/// Replaces the list's children with `entries`. The note `editing` is drawn
/// with its inline editor; a draft already on screen for it survives.
pub fn render_note_list<D: HostDom>(
    dom: &D,
    list: &D::Node,
    entries: &[ListEntry],
    highlight: Option<&str>,
    editing: Option<&str>,
) {
    let kept = editing.and_then(|id| read_draft(dom, list, id));
    dom.set_text_content(list, "");
    for entry in entries {
        match entry {
            ListEntry::Note(note) => {
                let draft = (editing == Some(note.id.as_str()))
                    .then(|| kept.clone().unwrap_or_else(|| EditDraft::of(note)));
                render_note(
                    dom,
                    list,
                    note,
                    highlight == Some(note.id.as_str()),
                    draft.as_ref(),
                );
            }
            ListEntry::Undo(token) => {
                render_undo(dom, list, *token);
            }
        }
    }
}

/// One capture listener on `root` routes every `data-action` click inside it
/// to the notebook.
pub fn bind_actions<D: HostDom + 'static>(dom: &Rc<D>, root: &D::Node, notebook: Rc<Notebook>) {
    let weak = Rc::downgrade(dom);
    let action_selector = Selector::new("[data-action]");
    let item_selector = Selector::new("[data-note-id]");
    dom.listen(
        root,
        DomEvent::ClickCapture,
        Rc::new(move |ev: &EventData<D::Node>| {
            let (Some(dom), Some(target)) = (weak.upgrade(), ev.target.as_ref()) else {
                return;
            };
            let Some(actor) = dom.closest(target, &action_selector) else {
                return;
            };
            let Some(action) = dom
                .attribute(&actor, "data-action")
                .and_then(|name| NoteAction::from_str(&name).ok())
            else {
                return;
            };
            let item = dom.closest(&actor, &item_selector);
            let draft = item
                .as_ref()
                .filter(|item| dom.has_attribute(item, "data-note-editing"))
                .map(|item| read_editor(dom.as_ref(), item));
            let target = ActionTarget {
                note_id: item.and_then(|item| dom.attribute(&item, "data-note-id")),
                tag: dom.attribute(&actor, "data-tag"),
                undo_token: dom
                    .attribute(&actor, "data-undo-token")
                    .and_then(|t| t.parse().ok()),
                edit_content: draft.as_ref().map(|d| d.content.clone()),
                edit_tags: draft.map(|d| d.tags),
            };
            notebook.handle(action, &target);
        }),
    );
}
