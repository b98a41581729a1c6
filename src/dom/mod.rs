//! The slice of the DOM the engines talk to.
//!
//! Every operation is total: lookups return `Option`/empty `Vec` and writes
//! on detached or foreign nodes are ignored. Nothing here may panic, since the
//! callers run inside mutation-observer and event callbacks.

#[cfg(test)]
pub mod mem;
pub mod web;

use crate::selector::Selector;
use std::rc::Rc;

#[cfg(test)]
pub use mem::{MemDom, NodeId};
pub use web::WebDom;

/// Bounding geometry in client (viewport) pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Events the engines subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DomEvent {
    /// Click on a control we own: default action prevented, propagation stopped.
    #[strum(serialize = "click")]
    Activate,
    /// Passive click observed in the capture phase.
    #[strum(serialize = "click")]
    ClickCapture,
    DragStart,
    DragEnd,
    DragEnter,
    DragOver,
    DragLeave,
    Drop,
    TransitionEnd,
}

impl DomEvent {
    /// Whether the backend must call `preventDefault` before dispatching.
    pub fn prevents_default(self) -> bool {
        matches!(
            self,
            Self::Activate | Self::DragEnter | Self::DragOver | Self::Drop
        )
    }
}

/// What a handler gets to see of an event.
#[derive(Clone, Debug, PartialEq)]
pub struct EventData<N> {
    pub target: Option<N>,
    pub client_x: f64,
    pub client_y: f64,
    /// Shift or Alt held.
    pub modifier: bool,
}

impl<N> EventData<N> {
    pub fn at(client_x: f64, client_y: f64) -> Self {
        Self {
            target: None,
            client_x,
            client_y,
            modifier: false,
        }
    }
}

pub type Handler<N> = Rc<dyn Fn(&EventData<N>)>;

/// One delivered mutation-observer batch.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationBatch<N> {
    /// Added element nodes, in record order.
    pub added: Vec<N>,
    /// Elements whose observed attributes changed.
    pub attribute_targets: Vec<N>,
}

impl<N> Default for MutationBatch<N> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            attribute_targets: Vec::new(),
        }
    }
}

impl<N> MutationBatch<N> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.attribute_targets.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub subtree: bool,
    /// Empty means attribute changes are not observed.
    pub attribute_filter: Vec<String>,
}

impl ObserveOptions {
    pub fn child_list() -> Self {
        Self {
            subtree: true,
            attribute_filter: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, names: &[&str]) -> Self {
        self.attribute_filter = names.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u32);

pub type MutationCallback<N> = Rc<dyn Fn(MutationBatch<N>)>;

pub trait HostDom {
    type Node: Clone + PartialEq + std::fmt::Debug + 'static;

    fn body(&self) -> Option<Self::Node>;

    fn parent_element(&self, node: &Self::Node) -> Option<Self::Node>;
    fn next_element_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
    fn previous_element_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Whether `node` is still attached to the document.
    fn is_connected(&self, node: &Self::Node) -> bool;

    fn matches(&self, node: &Self::Node, selector: &Selector) -> bool;
    /// Nearest inclusive ancestor matching `selector`.
    fn closest(&self, node: &Self::Node, selector: &Selector) -> Option<Self::Node>;
    /// First matching descendant in document order (excludes `root`).
    fn query_selector(&self, root: &Self::Node, selector: &Selector) -> Option<Self::Node>;
    /// All matching descendants in document order (excludes `root`).
    fn query_selector_all(&self, root: &Self::Node, selector: &Selector) -> Vec<Self::Node>;

    fn text_content(&self, node: &Self::Node) -> String;
    fn set_text_content(&self, node: &Self::Node, text: &str);

    /// Current value of a form control; empty for anything else.
    fn value(&self, node: &Self::Node) -> String;
    fn set_value(&self, node: &Self::Node, value: &str);

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);
    fn has_attribute(&self, node: &Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    fn has_class(&self, node: &Self::Node, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|c| c.split_whitespace().any(|t| t == class))
    }
    fn add_class(&self, node: &Self::Node, class: &str);
    fn remove_class(&self, node: &Self::Node, class: &str);

    fn style(&self, node: &Self::Node, property: &str) -> String;
    /// An empty `value` removes the property.
    fn set_style(&self, node: &Self::Node, property: &str, value: &str);

    fn create_element(&self, tag: &str) -> Option<Self::Node>;
    /// Moves `node` under `parent` before `reference`, or appends when
    /// `reference` is `None`.
    fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>);

    fn insert_after(&self, parent: &Self::Node, node: &Self::Node, anchor: &Self::Node) {
        let next = self.next_sibling_of(anchor);
        self.insert_before(parent, node, next.as_ref());
    }

    /// Next sibling of any kind (text included in the browser); used only as an
    /// insertion reference.
    fn next_sibling_of(&self, node: &Self::Node) -> Option<Self::Node> {
        self.next_element_sibling(node)
    }

    fn bounding_rect(&self, node: &Self::Node) -> Rect;
    fn scroll_by(&self, node: &Self::Node, dy: f64);

    fn listen(&self, node: &Self::Node, event: DomEvent, handler: Handler<Self::Node>);
    /// Runs `callback` on the next `transitionend` of `node`, then forgets it.
    fn on_transition_end_once(&self, node: &Self::Node, callback: Box<dyn FnOnce()>);

    fn observe(
        &self,
        root: &Self::Node,
        options: ObserveOptions,
        callback: MutationCallback<Self::Node>,
    ) -> Option<ObserverId>;
    fn disconnect(&self, id: ObserverId);

    /// Side table of companion pairings. Entries die with their key.
    fn paired(&self, key: &Self::Node) -> Option<Self::Node>;
    fn pair(&self, key: &Self::Node, value: &Self::Node);
}
