use super::list::{bind_actions, list_entries, render_note_list};
use super::notebook::Notebook;
use super::position::{
    apply_saved_position, current_position, panel_size, place_panel, save_position,
    viewport_size, DragOrigin,
};
use super::style::{PANEL_CSS, PANEL_STYLE_ID};
use crate::config::PANEL_ID;
use crate::dnd::{DragReorder, PanelHost};
use crate::dom::WebDom;
use crate::tags::{contains_tag, format_tag_label, PRESET_TAGS};
use leptos::ev;
use leptos::html;
use leptos::prelude::*;
use std::rc::Rc;
use wasm_bindgen::JsCast;

pub const PANEL_TITLE: &str = "Work Notes";
pub const EMPTY_TEXT: &str = "No notes yet. Use the \"Set Note\" button or start manually.";
pub const COMPOSER_PLACEHOLDER: &str = "Write your note here or paste it from ChatGPT...";

pub struct PanelDeps {
    pub notebook: Rc<Notebook>,
    pub dom: Rc<WebDom>,
    pub dnd: DragReorder<WebDom>,
}

/// Finds the mounted panel by id. The panel itself is created by
/// [`mount_panel`], so there is nothing to build here.
pub struct WebPanelHost {
    dom: Rc<WebDom>,
}

impl WebPanelHost {
    pub fn new(dom: Rc<WebDom>) -> Self {
        Self { dom }
    }
}

impl PanelHost<WebDom> for WebPanelHost {
    fn ensure_panel(&self) -> Option<web_sys::Element> {
        self.dom.document()?.get_element_by_id(PANEL_ID)
    }
}

fn panel_class(attention: bool, dragging: bool) -> String {
    let mut class = String::from("cgpt-note-panel");
    if attention {
        class.push_str(" cgpt-note-panel-attention");
    }
    if dragging {
        class.push_str(" cgpt-note-dragging");
    }
    class
}

/// Focus on the next tick, caret at the end.
fn focus_at_end(el: web_sys::HtmlTextAreaElement) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        wasm_bindgen::closure::Closure::once_into_js(move || {
            let _ = el.focus();
            // selectionStart/End are in UTF-16 code units.
            let end = el.value().encode_utf16().count() as u32;
            let _ = el.set_selection_range(end, end);
        })
        .as_ref()
        .unchecked_ref(),
        0,
    );
}

fn starts_on_button(ev: &web_sys::PointerEvent) -> bool {
    ev.target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        .and_then(|el| el.closest("button").ok().flatten())
        .is_some()
}

#[component]
pub fn NotePanel(deps: PanelDeps) -> impl IntoView {
    let PanelDeps { notebook, dom, dnd } = deps;
    let state = notebook.state();
    let store = notebook.store();

    let panel_ref: NodeRef<html::Section> = NodeRef::new();
    let list_ref: NodeRef<html::Div> = NodeRef::new();
    let composer_ref: NodeRef<html::Textarea> = NodeRef::new();
    let dragging = RwSignal::new(false);
    let drag_origin: StoredValue<Option<DragOrigin>> = StoredValue::new(None);

    // Clicks anywhere in the panel go through one delegated listener.
    {
        let dom = dom.clone();
        let notebook = notebook.clone();
        let store = store.clone();
        Effect::new(move |_| {
            let Some(panel) = panel_ref.get() else {
                return;
            };
            apply_saved_position(&panel, store.as_ref());
            bind_actions(&dom, &web_sys::Element::from(panel), notebook.clone());
        });
    }

    // The list is drawn imperatively; the drag engine re-arms it after each draw.
    {
        let draw_dom = dom.clone();
        let focused_edit: StoredValue<Option<String>> = StoredValue::new(None);
        let draw: Rc<dyn Fn()> = Rc::new(move || {
            let Some(list) = list_ref.get_untracked() else {
                return;
            };
            let list = web_sys::Element::from(list);
            let highlight = state.highlight.get();
            let editing = state.editing.get();
            render_note_list(
                draw_dom.as_ref(),
                &list,
                &list_entries(&state),
                highlight.as_deref(),
                editing.as_deref(),
            );
            // focus the editor once when it opens, not on every redraw
            if editing.is_some() && editing != focused_edit.get_value() {
                if let Some(input) = list
                    .query_selector(r#"textarea[data-role="note-edit-input"]"#)
                    .ok()
                    .flatten()
                    .and_then(|el| el.dyn_into::<web_sys::HtmlTextAreaElement>().ok())
                {
                    focus_at_end(input);
                }
            }
            focused_edit.set_value(editing);
        });
        let host: Rc<dyn PanelHost<WebDom>> = Rc::new(WebPanelHost::new(dom.clone()));
        let render = dnd.wrap_render(host, draw);
        Effect::new(move |_| {
            if list_ref.get().is_some() {
                render();
            }
        });
    }

    Effect::new(move |_| {
        if !state.composer_open.get() {
            return;
        }
        if let Some(el) = composer_ref.get_untracked() {
            focus_at_end(el);
        }
    });

    let move_handle = window_event_listener(ev::pointermove, move |ev: web_sys::PointerEvent| {
        let Some(origin) = drag_origin.get_value() else {
            return;
        };
        let Some(panel) = panel_ref.get_untracked() else {
            return;
        };
        let next = origin.follow(
            f64::from(ev.client_x()),
            f64::from(ev.client_y()),
            panel_size(&panel),
            viewport_size(),
        );
        place_panel(&panel, next);
    });
    let up_store = store.clone();
    let up_handle = window_event_listener(ev::pointerup, move |_ev: web_sys::PointerEvent| {
        if drag_origin.get_value().is_none() {
            return;
        }
        drag_origin.set_value(None);
        dragging.set(false);
        if let Some(panel) = panel_ref.get_untracked() {
            save_position(up_store.as_ref(), current_position(&panel));
        }
    });
    let resize_store = store.clone();
    let resize_handle = window_event_listener(ev::resize, move |_ev: web_sys::UiEvent| {
        if let Some(panel) = panel_ref.get_untracked() {
            apply_saved_position(&panel, resize_store.as_ref());
        }
    });
    on_cleanup(move || {
        move_handle.remove();
        up_handle.remove();
        resize_handle.remove();
    });

    let on_header_down = move |ev: web_sys::PointerEvent| {
        if ev.button() != 0 || starts_on_button(&ev) {
            return;
        }
        let Some(panel) = panel_ref.get_untracked() else {
            return;
        };
        drag_origin.set_value(Some(DragOrigin {
            pointer_x: f64::from(ev.client_x()),
            pointer_y: f64::from(ev.client_y()),
            panel: current_position(&panel),
        }));
        dragging.set(true);
        ev.prevent_default();
    };

    let save_notebook = notebook.clone();
    let on_composer_key = move |ev: web_sys::KeyboardEvent| {
        if ev.key() == "Enter" && (ev.ctrl_key() || ev.meta_key()) {
            ev.prevent_default();
            save_notebook.save_composer();
        }
    };

    let tag_notebook = notebook.clone();
    let on_tag_key = move |ev: web_sys::KeyboardEvent| match ev.key().as_str() {
        "Enter" | "Tab" | "," | ";" => {
            ev.prevent_default();
            tag_notebook.commit_tag_input();
        }
        "Backspace" if state.composer_tag_input.with_untracked(String::is_empty) => {
            state.pop_composer_tag();
        }
        _ => {}
    };

    let blur_notebook = notebook.clone();
    let on_tag_blur = move |_ev: web_sys::FocusEvent| {
        if !state.composer_tag_input.with_untracked(|v| v.trim().is_empty()) {
            blur_notebook.commit_tag_input();
        }
    };

    let presets = PRESET_TAGS
        .iter()
        .map(|preset| {
            let tag = preset.id;
            view! {
                <button
                    type="button"
                    class="cgpt-tag-preset"
                    data-action="toggle-tag"
                    data-tag=tag
                    data-active=move || state.composer_tags.with(|t| contains_tag(t, tag)).to_string()
                >
                    {preset.label}
                </button>
            }
        })
        .collect_view();

    view! {
        <style id=PANEL_STYLE_ID>{PANEL_CSS}</style>
        <section
            id=PANEL_ID
            node_ref=panel_ref
            class=move || panel_class(state.attention.get(), dragging.get())
            data-collapsed=move || state.collapsed.get().to_string()
        >
            <header class="cgpt-note-header" on:pointerdown=on_header_down>
                <div class="cgpt-note-header-title">
                    <span class="cgpt-note-title">{PANEL_TITLE}</span>
                    <span class="cgpt-note-counter" data-role="note-counter">
                        {move || state.counter_label()}
                    </span>
                </div>
                <div class="cgpt-note-header-actions">
                    <button
                        type="button"
                        class="cgpt-note-icon-btn"
                        data-action="toggle-panel"
                        title="Expand or collapse panel"
                    >
                        "Toggle"
                    </button>
                    <button
                        type="button"
                        class="cgpt-note-icon-btn"
                        data-action="clear-notes"
                        title="Remove all notes"
                    >
                        "Clear"
                    </button>
                </div>
            </header>

            <div
                class="cgpt-note-composer"
                data-role="composer"
                data-open=move || state.composer_open.get().to_string()
            >
                <textarea
                    data-role="composer-input"
                    placeholder=COMPOSER_PLACEHOLDER
                    node_ref=composer_ref
                    prop:value=move || state.composer_text.get()
                    on:input=move |ev| state.composer_text.set(event_target_value(&ev))
                    on:keydown=on_composer_key
                ></textarea>
                <div
                    class=move || {
                        if state.tag_flash.get() {
                            "cgpt-tag-editor cgpt-tag-limit"
                        } else {
                            "cgpt-tag-editor"
                        }
                    }
                    data-role="tag-editor"
                    data-context="composer"
                >
                    <div class="cgpt-tag-editor-top">
                        <span class="cgpt-tag-editor-title">"Tags"</span>
                        <button type="button" class="cgpt-tag-editor-reset" data-action="clear-tags">
                            "Reset"
                        </button>
                    </div>
                    <div class="cgpt-tag-chip-list" data-role="tag-chip-list">
                        {move || {
                            state
                                .composer_tags
                                .get()
                                .into_iter()
                                .map(|tag| {
                                    let label = format_tag_label(&tag);
                                    let chip_tag = tag.clone();
                                    view! {
                                        <span class="cgpt-tag-chip" data-tag=chip_tag>
                                            {label}
                                            <button
                                                type="button"
                                                class="cgpt-tag-chip-remove"
                                                data-action="remove-tag"
                                                data-tag=tag
                                                title="Remove tag"
                                            >
                                                "×"
                                            </button>
                                        </span>
                                    }
                                })
                                .collect_view()
                        }}
                        <input
                            type="text"
                            class="cgpt-tag-input"
                            data-role="tag-input"
                            placeholder="Add tag"
                            prop:value=move || state.composer_tag_input.get()
                            on:input=move |ev| state.composer_tag_input.set(event_target_value(&ev))
                            on:keydown=on_tag_key
                            on:blur=on_tag_blur
                        />
                    </div>
                    <div class="cgpt-tag-preset-row" data-role="tag-presets">
                        {presets}
                    </div>
                </div>
                <div class="cgpt-note-composer-actions">
                    <button
                        type="button"
                        class="cgpt-note-btn primary"
                        data-action="save-composer"
                        disabled=move || !state.can_save_composer()
                    >
                        "Save"
                    </button>
                    <button type="button" class="cgpt-note-btn ghost" data-action="cancel-composer">
                        "Discard"
                    </button>
                </div>
            </div>

            <div class="cgpt-note-toolbar">
                <button type="button" class="cgpt-note-btn primary" data-action="open-composer">
                    "+ New Note"
                </button>
                <div
                    class="cgpt-tag-filter"
                    data-role="tag-filter"
                    style=move || {
                        if state.notes.with(|n| n.iter().all(|note| note.tags.is_empty())) {
                            "display: none"
                        } else {
                            "display: flex"
                        }
                    }
                >
                    {move || {
                        let filtered = !state.filter_tag.with(String::is_empty);
                        let stats = state.tag_stats();
                        view! {
                            <button
                                type="button"
                                class="cgpt-tag-preset"
                                data-action="clear-tag-filter"
                                data-active=(!filtered).to_string()
                            >
                                "All"
                            </button>
                            {stats
                                .into_iter()
                                .map(|stat| {
                                    let active = state.is_filter_active(&stat.tag);
                                    let label = format!("{} ({})", format_tag_label(&stat.tag), stat.count);
                                    view! {
                                        <button
                                            type="button"
                                            class="cgpt-tag-preset"
                                            data-action="toggle-filter-tag"
                                            data-tag=stat.tag
                                            data-active=active.to_string()
                                        >
                                            {label}
                                        </button>
                                    }
                                })
                                .collect_view()}
                        }
                    }}
                </div>
            </div>

            <div class="cgpt-note-list" data-role="note-list" node_ref=list_ref></div>
            <div
                class="cgpt-note-empty"
                data-role="empty-state"
                style=move || {
                    if state.notes.with(Vec::is_empty) { "display: block" } else { "display: none" }
                }
            >
                {EMPTY_TEXT}
            </div>
        </section>
    }
}

/// Mounts [`NotePanel`] at the end of `<body>` for the page's lifetime.
pub fn mount_panel(deps: PanelDeps) {
    mount_to_body(move || view! { <NotePanel deps=deps /> });
}
