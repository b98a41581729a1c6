//! `HostDom` over the live page via web-sys.

use super::{
    DomEvent, EventData, Handler, HostDom, MutationBatch, MutationCallback, ObserveOptions,
    ObserverId, Rect,
};
use crate::selector::Selector;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, HtmlElement, HtmlInputElement, HtmlTextAreaElement, MutationObserver,
    MutationRecord,
};

type ObserverClosure = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

pub struct WebDom {
    document: Option<Document>,
    /// Companion pairings; a `WeakMap` so entries go away with the host subtree.
    pairs: js_sys::WeakMap,
    observers: RefCell<HashMap<u32, (MutationObserver, ObserverClosure)>>,
    next_observer: Cell<u32>,
}

impl WebDom {
    pub fn new() -> Self {
        Self {
            document: web_sys::window().and_then(|w| w.document()),
            pairs: js_sys::WeakMap::new(),
            observers: RefCell::new(HashMap::new()),
            next_observer: Cell::new(0),
        }
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    fn style_of(node: &Element) -> Option<web_sys::CssStyleDeclaration> {
        node.dyn_ref::<HtmlElement>().map(|el| el.style())
    }

    fn event_data(ev: &web_sys::Event) -> EventData<Element> {
        let target = ev.target().and_then(|t| t.dyn_into::<Element>().ok());
        match ev.dyn_ref::<web_sys::MouseEvent>() {
            Some(m) => EventData {
                target,
                client_x: m.client_x() as f64,
                client_y: m.client_y() as f64,
                modifier: m.shift_key() || m.alt_key(),
            },
            None => EventData {
                target,
                client_x: 0.0,
                client_y: 0.0,
                modifier: false,
            },
        }
    }

    fn batch_from(records: &js_sys::Array) -> MutationBatch<Element> {
        let mut batch = MutationBatch::default();
        for rec in records.iter() {
            let Ok(rec) = rec.dyn_into::<MutationRecord>() else {
                continue;
            };
            if rec.type_() == "attributes" {
                if let Some(el) = rec.target().and_then(|t| t.dyn_into::<Element>().ok()) {
                    if !batch.attribute_targets.contains(&el) {
                        batch.attribute_targets.push(el);
                    }
                }
                continue;
            }
            let added = rec.added_nodes();
            for i in 0..added.length() {
                if let Some(el) = added.get(i).and_then(|n| n.dyn_into::<Element>().ok()) {
                    batch.added.push(el);
                }
            }
        }
        batch
    }
}

impl Default for WebDom {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDom for WebDom {
    type Node = Element;

    fn body(&self) -> Option<Element> {
        self.document.as_ref()?.body().map(Element::from)
    }

    fn parent_element(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn next_element_sibling(&self, node: &Element) -> Option<Element> {
        node.next_element_sibling()
    }

    fn previous_element_sibling(&self, node: &Element) -> Option<Element> {
        node.previous_element_sibling()
    }

    fn is_connected(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn matches(&self, node: &Element, selector: &Selector) -> bool {
        node.matches(selector.as_css()).unwrap_or(false)
    }

    fn closest(&self, node: &Element, selector: &Selector) -> Option<Element> {
        node.closest(selector.as_css()).ok().flatten()
    }

    fn query_selector(&self, root: &Element, selector: &Selector) -> Option<Element> {
        root.query_selector(selector.as_css()).ok().flatten()
    }

    fn query_selector_all(&self, root: &Element, selector: &Selector) -> Vec<Element> {
        let Ok(list) = root.query_selector_all(selector.as_css()) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|n| n.dyn_into::<Element>().ok())
            .collect()
    }

    fn text_content(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn set_text_content(&self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn value(&self, node: &Element) -> String {
        if let Some(area) = node.dyn_ref::<HtmlTextAreaElement>() {
            area.value()
        } else if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.value()
        } else {
            String::new()
        }
    }

    fn set_value(&self, node: &Element, value: &str) {
        if let Some(area) = node.dyn_ref::<HtmlTextAreaElement>() {
            area.set_value(value);
        } else if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        }
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) {
        let _ = node.set_attribute(name, value);
    }

    fn has_attribute(&self, node: &Element, name: &str) -> bool {
        node.has_attribute(name)
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn add_class(&self, node: &Element, class: &str) {
        let _ = node.class_list().add_1(class);
    }

    fn remove_class(&self, node: &Element, class: &str) {
        let _ = node.class_list().remove_1(class);
    }

    fn style(&self, node: &Element, property: &str) -> String {
        Self::style_of(node)
            .and_then(|s| s.get_property_value(property).ok())
            .unwrap_or_default()
    }

    fn set_style(&self, node: &Element, property: &str, value: &str) {
        let Some(style) = Self::style_of(node) else {
            return;
        };
        if value.is_empty() {
            let _ = style.remove_property(property);
        } else {
            let _ = style.set_property(property, value);
        }
    }

    fn create_element(&self, tag: &str) -> Option<Element> {
        self.document.as_ref()?.create_element(tag).ok()
    }

    fn insert_before(&self, parent: &Element, node: &Element, reference: Option<&Element>) {
        let reference: Option<&web_sys::Node> = reference.map(|r| r.as_ref());
        let _ = parent.insert_before(node, reference);
    }

    fn insert_after(&self, parent: &Element, node: &Element, anchor: &Element) {
        // text nodes count as siblings here
        let next = anchor.next_sibling();
        let _ = parent.insert_before(node, next.as_ref());
    }

    fn bounding_rect(&self, node: &Element) -> Rect {
        let r = node.get_bounding_client_rect();
        Rect::new(r.left(), r.top(), r.width(), r.height())
    }

    fn scroll_by(&self, node: &Element, dy: f64) {
        node.scroll_by_with_x_and_y(0.0, dy);
    }

    fn listen(&self, node: &Element, event: DomEvent, handler: Handler<Element>) {
        let document = self.document.clone();
        let cb = Closure::<dyn FnMut(web_sys::Event)>::new(move |ev: web_sys::Event| {
            if event.prevents_default() {
                ev.prevent_default();
            }
            match event {
                DomEvent::Activate => ev.stop_propagation(),
                DomEvent::DragStart => prepare_drag_start(document.as_ref(), &ev),
                DomEvent::DragOver => {
                    if let Some(dt) = ev
                        .dyn_ref::<web_sys::DragEvent>()
                        .and_then(|d| d.data_transfer())
                    {
                        dt.set_drop_effect("move");
                    }
                }
                _ => {}
            }
            handler(&WebDom::event_data(&ev));
        });

        let capture = matches!(event, DomEvent::ClickCapture);
        let _ = node.add_event_listener_with_callback_and_bool(
            event.as_ref(),
            cb.as_ref().unchecked_ref(),
            capture,
        );
        // Listener lifetime follows the element; JS owns the closure from here.
        let _ = cb.into_js_value();
    }

    fn on_transition_end_once(&self, node: &Element, callback: Box<dyn FnOnce()>) {
        let opts = web_sys::AddEventListenerOptions::new();
        opts.set_once(true);
        let cb = Closure::once_into_js(move || callback());
        let _ = node.add_event_listener_with_callback_and_add_event_listener_options(
            DomEvent::TransitionEnd.as_ref(),
            cb.unchecked_ref(),
            &opts,
        );
    }

    fn observe(
        &self,
        root: &Element,
        options: ObserveOptions,
        callback: MutationCallback<Element>,
    ) -> Option<ObserverId> {
        let cb = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |records: js_sys::Array, _observer: MutationObserver| {
                let batch = WebDom::batch_from(&records);
                if !batch.is_empty() {
                    callback(batch);
                }
            },
        );
        let observer = MutationObserver::new(cb.as_ref().unchecked_ref()).ok()?;

        let init = web_sys::MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(options.subtree);
        if !options.attribute_filter.is_empty() {
            let filter = options
                .attribute_filter
                .iter()
                .map(|s| JsValue::from_str(s))
                .collect::<js_sys::Array>();
            init.set_attributes(true);
            init.set_attribute_filter(&filter);
        }
        observer.observe_with_options(root, &init).ok()?;

        let id = self.next_observer.get();
        self.next_observer.set(id + 1);
        self.observers.borrow_mut().insert(id, (observer, cb));
        Some(ObserverId(id))
    }

    fn disconnect(&self, id: ObserverId) {
        if let Some((observer, _cb)) = self.observers.borrow_mut().remove(&id.0) {
            observer.disconnect();
        }
    }

    fn paired(&self, key: &Element) -> Option<Element> {
        self.pairs
            .get(key.unchecked_ref::<js_sys::Object>())
            .dyn_into::<Element>()
            .ok()
    }

    fn pair(&self, key: &Element, value: &Element) {
        self.pairs.set(key.unchecked_ref::<js_sys::Object>(), value);
    }
}

/// Hides the native drag ghost and advertises a move.
fn prepare_drag_start(document: Option<&Document>, ev: &web_sys::Event) {
    let Some(dt) = ev
        .dyn_ref::<web_sys::DragEvent>()
        .and_then(|d| d.data_transfer())
    else {
        return;
    };
    dt.set_effect_allowed("move");
    dt.set_drop_effect("move");
    if let Some(canvas) = document
        .and_then(|d| d.create_element("canvas").ok())
        .and_then(|el| el.dyn_into::<web_sys::HtmlCanvasElement>().ok())
    {
        canvas.set_width(1);
        canvas.set_height(1);
        dt.set_drag_image(&canvas, 0, 0);
    }
}
