//! Dragging the panel by its header, with the result kept in settings.

use crate::config::POSITION_KEY;
use crate::models::PanelPosition;
use crate::storage::{load_json, save_json, SettingsStore};
use crate::util::clamp;
use leptos::logging::warn;
use wasm_bindgen::JsCast;

/// Distance kept between the panel and every viewport edge.
pub const EDGE_MARGIN: f64 = 8.0;

/// Keeps a `width` x `height` panel inside the viewport. When the viewport is
/// too small the top-left corner wins.
pub fn clamp_position(pos: PanelPosition, size: (f64, f64), viewport: (f64, f64)) -> PanelPosition {
    let (width, height) = size;
    let (vw, vh) = viewport;
    PanelPosition {
        left: clamp(pos.left, EDGE_MARGIN, vw - width - EDGE_MARGIN),
        top: clamp(pos.top, EDGE_MARGIN, vh - height - EDGE_MARGIN),
    }
}

/// Pointer-down state of a header drag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragOrigin {
    pub pointer_x: f64,
    pub pointer_y: f64,
    pub panel: PanelPosition,
}

impl DragOrigin {
    /// Where the panel goes with the pointer at `(x, y)`.
    pub fn follow(&self, x: f64, y: f64, size: (f64, f64), viewport: (f64, f64)) -> PanelPosition {
        clamp_position(
            PanelPosition {
                left: self.panel.left + (x - self.pointer_x),
                top: self.panel.top + (y - self.pointer_y),
            },
            size,
            viewport,
        )
    }
}

pub fn load_position(store: &dyn SettingsStore) -> Option<PanelPosition> {
    match load_json::<PanelPosition>(store, POSITION_KEY) {
        Ok(pos) => pos.filter(|p| p.left.is_finite() && p.top.is_finite()),
        Err(e) => {
            warn!("[note-helper] ignoring saved panel position: {e}");
            None
        }
    }
}

pub fn save_position(store: &dyn SettingsStore, pos: PanelPosition) {
    if let Err(e) = save_json(store, POSITION_KEY, &pos) {
        warn!("[note-helper] failed to save panel position: {e}");
    }
}

/// The larger of the layout and window sizes, as the page sees it.
pub fn viewport_size() -> (f64, f64) {
    let Some(window) = web_sys::window() else {
        return (0.0, 0.0);
    };
    let (mut vw, mut vh) = (0.0f64, 0.0f64);
    if let Some(root) = window.document().and_then(|d| d.document_element()) {
        vw = f64::from(root.client_width());
        vh = f64::from(root.client_height());
    }
    let inner = |v: Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>| {
        v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
    };
    (vw.max(inner(window.inner_width())), vh.max(inner(window.inner_height())))
}

pub fn panel_size(panel: &web_sys::Element) -> (f64, f64) {
    let rect = panel.get_bounding_client_rect();
    (rect.width(), rect.height())
}

/// Where the panel currently sits, from its inline style or its layout box.
pub fn current_position(panel: &web_sys::Element) -> PanelPosition {
    let rect = panel.get_bounding_client_rect();
    let style = panel.dyn_ref::<web_sys::HtmlElement>().map(|el| el.style());
    let inline = |prop: &str| {
        style
            .as_ref()
            .and_then(|s| s.get_property_value(prop).ok())
            .and_then(|v| v.trim_end_matches("px").parse::<f64>().ok())
    };
    PanelPosition {
        left: inline("left").unwrap_or(rect.left()),
        top: inline("top").unwrap_or(rect.top()),
    }
}

/// Pins the panel at `pos`, switching it from right- to left-anchored.
pub fn place_panel(panel: &web_sys::Element, pos: PanelPosition) {
    let Some(el) = panel.dyn_ref::<web_sys::HtmlElement>() else {
        return;
    };
    let style = el.style();
    let _ = style.set_property("left", &format!("{}px", pos.left));
    let _ = style.set_property("top", &format!("{}px", pos.top));
    let _ = style.set_property("right", "auto");
}

/// Re-applies the saved position, clamped to the current viewport.
pub fn apply_saved_position(panel: &web_sys::Element, store: &dyn SettingsStore) {
    let Some(saved) = load_position(store) else {
        return;
    };
    place_panel(panel, clamp_position(saved, panel_size(panel), viewport_size()));
}
