//! Drag-to-reorder for the note list.
//!
//! Items move live under the pointer; every move is animated with FLIP
//! (snapshot rects, move, invert with a transform, then play it back to
//! zero). The backing collection is only touched on drop, and only with a
//! complete permutation of what it already holds.

mod reorder;

pub use reorder::{plan_reorder, NoteCollection, ReorderError};

use crate::config::DndConfig;
use crate::dom::{DomEvent, EventData, HostDom, MutationBatch, ObserveOptions, Rect};
use crate::schedule::{FrameHandle, Scheduler};
use crate::selector::Selector;
use crate::watcher::watch_until;
use leptos::logging::warn;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

pub const STYLE_ID: &str = "cgpt-dnd-anim-style";

/// Gives access to the panel root, creating it when needed.
pub trait PanelHost<D: HostDom> {
    fn ensure_panel(&self) -> Option<D::Node>;
}

#[derive(Default)]
struct AutoScroll {
    frame: Cell<Option<FrameHandle>>,
    dir: Cell<i8>,
}

struct Inner<D: HostDom> {
    dom: Rc<D>,
    scheduler: Rc<dyn Scheduler>,
    collection: Rc<dyn NoteCollection>,
    config: DndConfig,
    list_union: Selector,
    dragging: Selector,
    rects: RefCell<HashMap<String, Rect>>,
    autoscroll: AutoScroll,
    /// Set once the current drag's order reached the collection.
    committed: Cell<bool>,
}

pub struct DragReorder<D: HostDom> {
    inner: Rc<Inner<D>>,
}

impl<D: HostDom> Clone for DragReorder<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: HostDom + 'static> DragReorder<D> {
    pub fn new(
        dom: Rc<D>,
        scheduler: Rc<dyn Scheduler>,
        collection: Rc<dyn NoteCollection>,
        config: DndConfig,
    ) -> Self {
        let union = config
            .list_selectors
            .iter()
            .map(Selector::as_css)
            .collect::<Vec<_>>()
            .join(", ");
        let dragging = Selector::new(&format!(".{}", config.dragging_class));
        Self {
            inner: Rc::new(Inner {
                dom,
                scheduler,
                collection,
                list_union: Selector::new(&union),
                dragging,
                config,
                rects: RefCell::new(HashMap::new()),
                autoscroll: AutoScroll::default(),
                committed: Cell::new(false),
            }),
        }
    }

    fn from_weak(weak: &Weak<Inner<D>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn dom(&self) -> &D {
        &self.inner.dom
    }

    /// First list under `panel`, trying the configured selectors in order.
    pub fn find_list(&self, panel: &D::Node) -> Option<D::Node> {
        self.inner
            .config
            .list_selectors
            .iter()
            .find_map(|sel| self.dom().query_selector(panel, sel))
    }

    pub fn items_of(&self, list: &D::Node) -> Vec<D::Node> {
        self.dom()
            .query_selector_all(list, &self.inner.config.item_selector)
    }

    pub fn item_id(&self, item: &D::Node) -> Option<String> {
        ["data-note-id", "data-id", "id"]
            .iter()
            .filter_map(|name| self.dom().attribute(item, name))
            .find(|v| !v.is_empty())
    }

    fn list_of(&self, item: &D::Node) -> Option<D::Node> {
        self.dom()
            .closest(item, &self.inner.list_union)
            .or_else(|| self.dom().parent_element(item))
    }

    /// Makes `list` sortable. Returns `false` when it already was.
    pub fn enable(&self, list: &D::Node) -> bool {
        let enabled_attr = self.inner.config.enabled_attr;
        if self.dom().attribute(list, enabled_attr).as_deref() == Some("true") {
            return false;
        }
        self.dom().set_attribute(list, enabled_attr, "true");

        let weak = Rc::downgrade(&self.inner);
        let target = list.clone();
        self.dom().listen(
            list,
            DomEvent::DragOver,
            Rc::new(move |ev: &EventData<D::Node>| {
                if let Some(engine) = Self::from_weak(&weak) {
                    engine.on_drag_over(&target, ev.client_x, ev.client_y);
                }
            }),
        );

        let weak = Rc::downgrade(&self.inner);
        let target = list.clone();
        self.dom().listen(
            list,
            DomEvent::Drop,
            Rc::new(move |_ev: &EventData<D::Node>| {
                if let Some(engine) = Self::from_weak(&weak) {
                    engine.stop_autoscroll();
                    engine.settle(&target);
                }
            }),
        );

        // the backend already cancels the default; nothing else to do
        self.dom()
            .listen(list, DomEvent::DragEnter, Rc::new(|_: &EventData<D::Node>| {}));

        let weak = Rc::downgrade(&self.inner);
        self.dom().listen(
            list,
            DomEvent::DragLeave,
            Rc::new(move |_ev: &EventData<D::Node>| {
                if let Some(engine) = Self::from_weak(&weak) {
                    engine.stop_autoscroll();
                }
            }),
        );

        let weak = Rc::downgrade(&self.inner);
        let target = list.clone();
        self.dom().observe(
            list,
            ObserveOptions::child_list(),
            Rc::new(move |_batch: MutationBatch<D::Node>| {
                if let Some(engine) = Self::from_weak(&weak) {
                    engine.bind_items(&target);
                }
            }),
        );

        self.bind_items(list);
        true
    }

    /// Makes every not-yet-bound item of `list` draggable.
    pub fn bind_items(&self, list: &D::Node) {
        for item in self.items_of(list) {
            if self.dom().has_attribute(&item, "draggable") {
                continue;
            }
            self.dom().set_attribute(&item, "draggable", "true");

            let weak = Rc::downgrade(&self.inner);
            let me = item.clone();
            self.dom().listen(
                &item,
                DomEvent::DragStart,
                Rc::new(move |_ev: &EventData<D::Node>| {
                    if let Some(engine) = Self::from_weak(&weak) {
                        engine.on_drag_start(&me);
                    }
                }),
            );

            let weak = Rc::downgrade(&self.inner);
            let me = item.clone();
            self.dom().listen(
                &item,
                DomEvent::DragEnd,
                Rc::new(move |_ev: &EventData<D::Node>| {
                    if let Some(engine) = Self::from_weak(&weak) {
                        engine.on_drag_end(&me);
                    }
                }),
            );

            if self.dom().style(&item, "cursor").is_empty() {
                self.dom().set_style(&item, "cursor", "grab");
            }
        }
    }

    fn on_drag_start(&self, item: &D::Node) {
        self.inner.committed.set(false);
        self.dom().add_class(item, self.inner.config.dragging_class);
        self.dom().set_style(item, "cursor", "grabbing");
        if let Some(list) = self.list_of(item) {
            self.snapshot_rects(&list);
        }
    }

    fn on_drag_end(&self, item: &D::Node) {
        self.dom().remove_class(item, self.inner.config.dragging_class);
        self.dom().set_style(item, "cursor", "grab");
        self.stop_autoscroll();
        if let Some(list) = self.list_of(item) {
            self.settle(&list);
        }
    }

    /// Commits the drag's order unless drop already did. `dragend` follows
    /// `drop`, so both end up here.
    fn settle(&self, list: &D::Node) {
        if self.inner.committed.get() {
            return;
        }
        // a rejected order is logged by `commit`; dragend may retry it
        if self.commit(list).is_ok() {
            self.inner.committed.set(true);
        }
    }

    fn on_drag_over(&self, list: &D::Node, x: f64, y: f64) {
        let Some(dragging) = self.dom().query_selector(list, &self.inner.dragging) else {
            return;
        };
        self.autoscroll(list, y);
        self.snapshot_rects(list);
        let before = self.insertion_point(list, x, y, &dragging);
        self.dom().insert_before(list, &dragging, before.as_ref());
        self.play_flip(list);
    }

    /// The item the dragged one should be inserted before, or `None` to
    /// append.
    pub fn insertion_point(&self, list: &D::Node, x: f64, y: f64, dragging: &D::Node) -> Option<D::Node> {
        let epsilon = self.inner.config.center_epsilon_px;
        self.items_of(list)
            .into_iter()
            .filter(|el| el != dragging)
            .find(|el| {
                let r = self.dom().bounding_rect(el);
                y < r.center_y() || ((y - r.center_y()).abs() < epsilon && x < r.center_x())
            })
    }

    pub fn snapshot_rects(&self, list: &D::Node) {
        let mut rects = self.inner.rects.borrow_mut();
        rects.clear();
        for item in self.items_of(list) {
            if let Some(id) = self.item_id(&item) {
                rects.insert(id, self.dom().bounding_rect(&item));
            }
        }
    }

    /// Animates items from their snapshot rects to where they are now.
    /// Returns how many items moved.
    pub fn play_flip(&self, list: &D::Node) -> usize {
        let min = self.inner.config.min_flip_delta_px;
        let mut moved = 0;
        for item in self.items_of(list) {
            let Some(first) = self
                .item_id(&item)
                .and_then(|id| self.inner.rects.borrow().get(&id).copied())
            else {
                continue;
            };
            let last = self.dom().bounding_rect(&item);
            let dx = first.left - last.left;
            let dy = first.top - last.top;
            if dx.abs() <= min && dy.abs() <= min {
                continue;
            }
            moved += 1;

            let dom = self.dom();
            dom.set_style(&item, "will-change", "transform");
            dom.set_style(&item, "transform", &format!("translate({dx}px, {dy}px)"));
            dom.set_style(&item, "transition", "none");
            self.play_after_two_frames(&item);

            let weak = Rc::downgrade(&self.inner.dom);
            let el = item.clone();
            dom.on_transition_end_once(
                &item,
                Box::new(move || {
                    if let Some(dom) = weak.upgrade() {
                        for prop in ["transition", "transform", "will-change"] {
                            dom.set_style(&el, prop, "");
                        }
                    }
                }),
            );
        }
        moved
    }

    /// The inverted transform has to be applied for a frame before the
    /// transition is switched on, or the browser skips the animation.
    fn play_after_two_frames(&self, item: &D::Node) {
        let transition = format!(
            "transform {}ms {}",
            self.inner.config.animation_ms, self.inner.config.easing
        );
        let weak = Rc::downgrade(&self.inner.dom);
        let scheduler = self.inner.scheduler.clone();
        let el = item.clone();
        self.inner.scheduler.request_frame(Box::new(move || {
            scheduler.request_frame(Box::new(move || {
                if let Some(dom) = weak.upgrade() {
                    dom.set_style(&el, "transition", &transition);
                    dom.set_style(&el, "transform", "translate(0px, 0px)");
                }
            }));
        }));
    }

    /// Starts, steers or stops the per-frame scroll depending on how close
    /// `client_y` is to the list's top or bottom edge.
    pub fn autoscroll(&self, list: &D::Node, client_y: f64) {
        let rect = self.dom().bounding_rect(list);
        let threshold = self.inner.config.edge_threshold_px;
        let dir = if client_y < rect.top + threshold {
            -1
        } else if client_y > rect.bottom() - threshold {
            1
        } else {
            0
        };

        if dir == 0 {
            self.stop_autoscroll();
            return;
        }
        self.inner.autoscroll.dir.set(dir);
        if self.inner.autoscroll.frame.get().is_none() {
            self.schedule_scroll_step(list.clone());
        }
    }

    fn schedule_scroll_step(&self, list: D::Node) {
        let weak = Rc::downgrade(&self.inner);
        let handle = self.inner.scheduler.request_frame(Box::new(move || {
            let Some(engine) = Self::from_weak(&weak) else {
                return;
            };
            engine.inner.autoscroll.frame.set(None);
            let dir = engine.inner.autoscroll.dir.get();
            if dir == 0 {
                return;
            }
            engine
                .dom()
                .scroll_by(&list, f64::from(dir) * engine.inner.config.scroll_speed_px);
            engine.schedule_scroll_step(list);
        }));
        self.inner.autoscroll.frame.set(handle);
    }

    pub fn stop_autoscroll(&self) {
        self.inner.autoscroll.dir.set(0);
        if let Some(handle) = self.inner.autoscroll.frame.take() {
            self.inner.scheduler.cancel_frame(handle);
        }
    }

    pub fn is_autoscrolling(&self) -> bool {
        self.inner.autoscroll.frame.get().is_some()
    }

    /// Writes the on-screen order back to the collection if it is a full
    /// permutation of it.
    pub fn commit(&self, list: &D::Node) -> Result<(), ReorderError> {
        let ids: Vec<String> = self
            .items_of(list)
            .iter()
            .filter_map(|item| self.item_id(item))
            .collect();
        let current = self.inner.collection.notes();
        match plan_reorder(&current, &ids) {
            Ok(ordered) => {
                self.inner.collection.replace_notes(ordered);
                Ok(())
            }
            Err(err) => {
                warn!("[note-helper] reorder discarded: {err}");
                Err(err)
            }
        }
    }

    /// Adds the drag styles once per document.
    pub fn ensure_styles(&self) {
        let dom = self.dom();
        let Some(body) = dom.body() else {
            return;
        };
        if dom
            .query_selector(&body, &Selector::new(&format!("#{STYLE_ID}")))
            .is_some()
        {
            return;
        }
        let Some(style) = dom.create_element("style") else {
            return;
        };
        dom.set_attribute(&style, "id", STYLE_ID);
        dom.set_text_content(&style, &self.stylesheet());
        dom.insert_before(&body, &style, None);
    }

    fn stylesheet(&self) -> String {
        let cfg = &self.inner.config;
        format!(
            ".cgpt-note-item, .cgpt-note {{ transition: box-shadow 120ms {ease}, transform {ms}ms {ease}; }}\n\
             .{dragging} {{ opacity: 0.95; box-shadow: 0 6px 24px rgba(0,0,0,0.25), 0 2px 6px rgba(0,0,0,0.15); }}\n",
            ease = cfg.easing,
            ms = cfg.animation_ms,
            dragging = cfg.dragging_class,
        )
    }

    /// Wraps the panel's render so every render leaves the current list
    /// sortable.
    pub fn wrap_render(&self, host: Rc<dyn PanelHost<D>>, render: Rc<dyn Fn()>) -> Rc<dyn Fn()> {
        let engine = self.clone();
        Rc::new(move || {
            render();
            engine.enable_in(host.as_ref());
        })
    }

    fn enable_in(&self, host: &dyn PanelHost<D>) {
        let Some(list) = host.ensure_panel().and_then(|panel| self.find_list(&panel)) else {
            return;
        };
        // a re-render may have replaced the items under an enabled list
        if !self.enable(&list) {
            self.bind_items(&list);
        }
    }

    /// Enables the list now if it exists, otherwise once it shows up.
    pub fn start(&self, host: Rc<dyn PanelHost<D>>) {
        self.ensure_styles();
        let Some(body) = self.dom().body() else {
            return;
        };
        let lookup_engine = self.clone();
        let lookup_host = host.clone();
        let engine = self.clone();
        watch_until(
            &self.inner.dom,
            &body,
            move || {
                lookup_host
                    .ensure_panel()
                    .and_then(|panel| lookup_engine.find_list(&panel))
            },
            move |list| {
                engine.enable(&list);
            },
        );
    }
}
