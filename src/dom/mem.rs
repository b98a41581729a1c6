//! Arena-backed DOM used by the test suites.
//!
//! It models exactly what the engines observe: an element tree with
//! attributes, inline styles and text, explicit or stacked geometry,
//! scrolling, event listeners and mutation observers with browser-like
//! batching (records are queued and delivered by [`MemDom::flush_mutations`]).

use super::{
    DomEvent, EventData, Handler, HostDom, MutationBatch, MutationCallback, ObserveOptions,
    ObserverId, Rect,
};
use crate::selector::{ElementView, Selector};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Default)]
struct MemNode {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    /// Form control value, separate from the `value` attribute.
    value: String,
    styles: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Option<Rect>,
    /// When set, children are laid out as a vertical stack of this height.
    row_height: Option<f64>,
    scroll_top: f64,
}

impl ElementView for MemNode {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

struct Observer {
    root: NodeId,
    options: ObserveOptions,
    callback: MutationCallback<NodeId>,
    queued: MutationBatch<NodeId>,
}

#[derive(Default)]
struct Inner {
    nodes: Vec<MemNode>,
    root: NodeId,
    body: NodeId,
    handlers: Vec<(NodeId, DomEvent, Handler<NodeId>)>,
    transition_end: Vec<(NodeId, Box<dyn FnOnce()>)>,
    observers: BTreeMap<u32, Observer>,
    next_observer: u32,
    pairs: HashMap<NodeId, NodeId>,
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId(0)
    }
}

impl Inner {
    fn node(&self, id: NodeId) -> Option<&MemNode> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut MemNode> {
        self.nodes.get_mut(id.0)
    }

    fn alloc(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MemNode {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        });
        id
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.node(node).and_then(|n| n.parent) {
                Some(p) => node = p,
                None => return false,
            }
        }
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.node(node).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
    }

    fn descendants(&self, root: NodeId, out: &mut Vec<NodeId>) {
        let Some(n) = self.node(root) else {
            return;
        };
        for child in &n.children {
            out.push(*child);
            self.descendants(*child, out);
        }
    }

    fn record_added(&mut self, parent: NodeId, node: NodeId) {
        let targets: Vec<u32> = self
            .observers
            .iter()
            .filter(|(_, o)| {
                o.root == parent || (o.options.subtree && self.is_inclusive_ancestor(o.root, parent))
            })
            .map(|(id, _)| *id)
            .collect();
        for id in targets {
            if let Some(o) = self.observers.get_mut(&id) {
                o.queued.added.push(node);
            }
        }
    }

    fn record_attribute(&mut self, target: NodeId, name: &str) {
        let targets: Vec<u32> = self
            .observers
            .iter()
            .filter(|(_, o)| o.options.attribute_filter.iter().any(|f| f == name))
            .filter(|(_, o)| {
                o.root == target || (o.options.subtree && self.is_inclusive_ancestor(o.root, target))
            })
            .map(|(id, _)| *id)
            .collect();
        for id in targets {
            if let Some(o) = self.observers.get_mut(&id) {
                if !o.queued.attribute_targets.contains(&target) {
                    o.queued.attribute_targets.push(target);
                }
            }
        }
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: Option<&str>) {
        let Some(n) = self.node_mut(node) else {
            return;
        };
        n.attrs.retain(|(k, _)| k != name);
        if let Some(v) = value {
            n.attrs.push((name.to_string(), v.to_string()));
        }
        self.record_attribute(node, name);
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.node(node) else {
            return;
        };
        out.push_str(&n.text);
        for child in &n.children {
            self.collect_text(*child, out);
        }
    }

    fn rect_of(&self, node: NodeId) -> Rect {
        let Some(n) = self.node(node) else {
            return Rect::default();
        };
        if let Some(r) = n.rect {
            return r;
        }
        let Some(parent) = n.parent else {
            return Rect::default();
        };
        let Some(p) = self.node(parent) else {
            return Rect::default();
        };
        let Some(row) = p.row_height else {
            return Rect::default();
        };
        let index = p.children.iter().position(|c| *c == node).unwrap_or(0);
        let pr = self.rect_of(parent);
        Rect::new(pr.left, pr.top + index as f64 * row - p.scroll_top, pr.width, row)
    }
}

pub struct MemDom {
    inner: RefCell<Inner>,
}

impl Default for MemDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemDom {
    pub fn new() -> Self {
        let mut inner = Inner::default();
        let root = inner.alloc("html");
        let body = inner.alloc("body");
        if let Some(n) = inner.node_mut(body) {
            n.parent = Some(root);
        }
        if let Some(n) = inner.node_mut(root) {
            n.children.push(body);
        }
        inner.root = root;
        inner.body = body;
        Self {
            inner: RefCell::new(inner),
        }
    }

    pub fn body_id(&self) -> NodeId {
        self.inner.borrow().body
    }

    /// Creates `<tag attrs..>` and appends it to `parent`.
    pub fn el(&self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.inner.borrow_mut().alloc(tag);
        for (k, v) in attrs {
            self.inner.borrow_mut().set_attr(id, k, Some(*v));
        }
        self.insert_before(&parent, &id, None);
        id
    }

    /// Like [`MemDom::el`] with text content.
    pub fn text_el(&self, parent: NodeId, tag: &str, attrs: &[(&str, &str)], text: &str) -> NodeId {
        let id = self.el(parent, tag, attrs);
        self.set_text_content(&id, text);
        id
    }

    pub fn remove(&self, node: NodeId) {
        self.inner.borrow_mut().detach(node);
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn set_rect(&self, node: NodeId, rect: Rect) {
        if let Some(n) = self.inner.borrow_mut().node_mut(node) {
            n.rect = Some(rect);
        }
    }

    pub fn set_stack_layout(&self, node: NodeId, row_height: f64) {
        if let Some(n) = self.inner.borrow_mut().node_mut(node) {
            n.row_height = Some(row_height);
        }
    }

    pub fn scroll_top(&self, node: NodeId) -> f64 {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.scroll_top)
            .unwrap_or(0.0)
    }

    /// Runs the handlers registered on `node` for `event`.
    pub fn dispatch(&self, node: NodeId, event: DomEvent, data: EventData<NodeId>) {
        let handlers: Vec<Handler<NodeId>> = self
            .inner
            .borrow()
            .handlers
            .iter()
            .filter(|(n, e, _)| *n == node && *e == event)
            .map(|(_, _, h)| h.clone())
            .collect();
        for h in handlers {
            h(&data);
        }
    }

    /// A user click: capture listeners on the ancestors first, then the
    /// activation handlers on the target.
    pub fn click(&self, node: NodeId, modifier: bool) {
        let mut path = Vec::new();
        let mut cur = Some(node);
        while let Some(n) = cur {
            path.push(n);
            cur = self.parent_element(&n);
        }
        path.reverse();

        let data = EventData {
            target: Some(node),
            client_x: 0.0,
            client_y: 0.0,
            modifier,
        };
        for n in path {
            self.dispatch(n, DomEvent::ClickCapture, data.clone());
        }
        self.dispatch(node, DomEvent::Activate, data);
    }

    pub fn fire_transition_end(&self, node: NodeId) {
        let callbacks: Vec<Box<dyn FnOnce()>> = {
            let mut inner = self.inner.borrow_mut();
            let (fire, keep): (Vec<_>, Vec<_>) = inner
                .transition_end
                .drain(..)
                .partition(|(n, _)| *n == node);
            inner.transition_end = keep;
            fire.into_iter().map(|(_, cb)| cb).collect()
        };
        for cb in callbacks {
            cb();
        }
    }

    pub fn pending_transition_ends(&self) -> usize {
        self.inner.borrow().transition_end.len()
    }

    /// Delivers queued records, one batch per observer per round, until the
    /// tree settles. Returns the number of batches delivered.
    pub fn flush_mutations(&self) -> usize {
        let mut delivered = 0;
        for _ in 0..64 {
            let batches: Vec<(MutationCallback<NodeId>, MutationBatch<NodeId>)> = {
                let mut inner = self.inner.borrow_mut();
                inner
                    .observers
                    .values_mut()
                    .filter(|o| !o.queued.is_empty())
                    .map(|o| (o.callback.clone(), std::mem::take(&mut o.queued)))
                    .collect()
            };
            if batches.is_empty() {
                break;
            }
            for (cb, batch) in batches {
                delivered += 1;
                cb(batch);
            }
        }
        delivered
    }

    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    pub fn listener_count(&self, node: NodeId, event: DomEvent) -> usize {
        self.inner
            .borrow()
            .handlers
            .iter()
            .filter(|(n, e, _)| *n == node && *e == event)
            .count()
    }
}

impl HostDom for MemDom {
    type Node = NodeId;

    fn body(&self) -> Option<NodeId> {
        Some(self.inner.borrow().body)
    }

    fn parent_element(&self, node: &NodeId) -> Option<NodeId> {
        self.inner.borrow().node(*node).and_then(|n| n.parent)
    }

    fn next_element_sibling(&self, node: &NodeId) -> Option<NodeId> {
        let inner = self.inner.borrow();
        let parent = inner.node(*node)?.parent?;
        let siblings = &inner.node(parent)?.children;
        let idx = siblings.iter().position(|c| c == node)?;
        siblings.get(idx + 1).copied()
    }

    fn previous_element_sibling(&self, node: &NodeId) -> Option<NodeId> {
        let inner = self.inner.borrow();
        let parent = inner.node(*node)?.parent?;
        let siblings = &inner.node(parent)?.children;
        let idx = siblings.iter().position(|c| c == node)?;
        idx.checked_sub(1).and_then(|i| siblings.get(i).copied())
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        let inner = self.inner.borrow();
        inner.is_inclusive_ancestor(inner.root, *node)
    }

    fn matches(&self, node: &NodeId, selector: &Selector) -> bool {
        self.inner
            .borrow()
            .node(*node)
            .is_some_and(|n| selector.matches(n))
    }

    fn closest(&self, node: &NodeId, selector: &Selector) -> Option<NodeId> {
        let mut cur = Some(*node);
        while let Some(n) = cur {
            if self.matches(&n, selector) {
                return Some(n);
            }
            cur = self.parent_element(&n);
        }
        None
    }

    fn query_selector(&self, root: &NodeId, selector: &Selector) -> Option<NodeId> {
        self.query_selector_all(root, selector).into_iter().next()
    }

    fn query_selector_all(&self, root: &NodeId, selector: &Selector) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let mut all = Vec::new();
        inner.descendants(*root, &mut all);
        all.into_iter()
            .filter(|id| inner.node(*id).is_some_and(|n| selector.matches(n)))
            .collect()
    }

    fn text_content(&self, node: &NodeId) -> String {
        let mut out = String::new();
        self.inner.borrow().collect_text(*node, &mut out);
        out
    }

    fn set_text_content(&self, node: &NodeId, text: &str) {
        let mut inner = self.inner.borrow_mut();
        let children = inner
            .node(*node)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            inner.detach(child);
        }
        if let Some(n) = inner.node_mut(*node) {
            n.text = text.to_string();
        }
    }

    fn value(&self, node: &NodeId) -> String {
        self.inner
            .borrow()
            .node(*node)
            .map(|n| n.value.clone())
            .unwrap_or_default()
    }

    fn set_value(&self, node: &NodeId, value: &str) {
        if let Some(n) = self.inner.borrow_mut().node_mut(*node) {
            n.value = value.to_string();
        }
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.inner
            .borrow()
            .node(*node)
            .and_then(|n| n.attr(name).map(str::to_string))
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) {
        self.inner.borrow_mut().set_attr(*node, name, Some(value));
    }

    fn add_class(&self, node: &NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let current = self.attribute(node, "class").unwrap_or_default();
        let next = if current.trim().is_empty() {
            class.to_string()
        } else {
            format!("{} {class}", current.trim())
        };
        self.set_attribute(node, "class", &next);
    }

    fn remove_class(&self, node: &NodeId, class: &str) {
        let Some(current) = self.attribute(node, "class") else {
            return;
        };
        let next = current
            .split_whitespace()
            .filter(|t| *t != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "class", &next);
    }

    fn style(&self, node: &NodeId, property: &str) -> String {
        self.inner
            .borrow()
            .node(*node)
            .and_then(|n| n.styles.iter().find(|(k, _)| k == property))
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    fn set_style(&self, node: &NodeId, property: &str, value: &str) {
        if let Some(n) = self.inner.borrow_mut().node_mut(*node) {
            n.styles.retain(|(k, _)| k != property);
            if !value.is_empty() {
                n.styles.push((property.to_string(), value.to_string()));
            }
        }
    }

    fn create_element(&self, tag: &str) -> Option<NodeId> {
        Some(self.inner.borrow_mut().alloc(tag))
    }

    fn insert_before(&self, parent: &NodeId, node: &NodeId, reference: Option<&NodeId>) {
        let mut inner = self.inner.borrow_mut();
        if inner.node(*parent).is_none() || inner.node(*node).is_none() {
            return;
        }
        // a node cannot become its own ancestor
        if inner.is_inclusive_ancestor(*node, *parent) {
            return;
        }
        inner.detach(*node);
        let Some(p) = inner.node_mut(*parent) else {
            return;
        };
        let idx = reference
            .and_then(|r| p.children.iter().position(|c| c == r))
            .unwrap_or(p.children.len());
        p.children.insert(idx, *node);
        if let Some(n) = inner.node_mut(*node) {
            n.parent = Some(*parent);
        }
        inner.record_added(*parent, *node);
    }

    fn bounding_rect(&self, node: &NodeId) -> Rect {
        self.inner.borrow().rect_of(*node)
    }

    fn scroll_by(&self, node: &NodeId, dy: f64) {
        let mut inner = self.inner.borrow_mut();
        let max = inner
            .node(*node)
            .and_then(|n| n.row_height.map(|row| (row, n.children.len(), n.rect)))
            .map(|(row, count, rect)| {
                let height = rect.map(|r| r.height).unwrap_or(0.0);
                (row * count as f64 - height).max(0.0)
            })
            .unwrap_or(f64::MAX);
        if let Some(n) = inner.node_mut(*node) {
            n.scroll_top = (n.scroll_top + dy).clamp(0.0, max);
        }
    }

    fn listen(&self, node: &NodeId, event: DomEvent, handler: Handler<NodeId>) {
        self.inner.borrow_mut().handlers.push((*node, event, handler));
    }

    fn on_transition_end_once(&self, node: &NodeId, callback: Box<dyn FnOnce()>) {
        self.inner.borrow_mut().transition_end.push((*node, callback));
    }

    fn observe(
        &self,
        root: &NodeId,
        options: ObserveOptions,
        callback: MutationCallback<NodeId>,
    ) -> Option<ObserverId> {
        let mut inner = self.inner.borrow_mut();
        inner.node(*root)?;
        let id = inner.next_observer;
        inner.next_observer += 1;
        inner.observers.insert(
            id,
            Observer {
                root: *root,
                options,
                callback,
                queued: MutationBatch::default(),
            },
        );
        Some(ObserverId(id))
    }

    fn disconnect(&self, id: ObserverId) {
        self.inner.borrow_mut().observers.remove(&id.0);
    }

    fn paired(&self, key: &NodeId) -> Option<NodeId> {
        self.inner.borrow().pairs.get(key).copied()
    }

    fn pair(&self, key: &NodeId, value: &NodeId) {
        self.inner.borrow_mut().pairs.insert(*key, *value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_stack_layout_follows_child_order_and_scroll() {
        let dom = MemDom::new();
        let list = dom.el(dom.body_id(), "div", &[]);
        dom.set_rect(list, Rect::new(0.0, 100.0, 200.0, 60.0));
        dom.set_stack_layout(list, 40.0);
        let a = dom.el(list, "article", &[]);
        let b = dom.el(list, "article", &[]);

        assert_eq!(dom.bounding_rect(&b).top, 140.0);
        dom.insert_before(&list, &b, Some(&a));
        assert_eq!(dom.bounding_rect(&b).top, 100.0);
        assert_eq!(dom.bounding_rect(&a).top, 140.0);

        dom.scroll_by(&list, 100.0);
        // content is 80px tall in a 60px box
        assert_eq!(dom.scroll_top(list), 20.0);
    }

    #[test]
    fn test_observer_batches_added_nodes_within_subtree() {
        let dom = MemDom::new();
        let outside = dom.el(dom.body_id(), "div", &[]);
        let watched = dom.el(dom.body_id(), "section", &[]);

        let seen = Rc::new(Cell::new(0usize));
        let seen2 = seen.clone();
        dom.observe(
            &watched,
            ObserveOptions::child_list(),
            Rc::new(move |batch: MutationBatch<NodeId>| {
                seen2.set(seen2.get() + batch.added.len());
            }),
        )
        .expect("observe");

        let inner = dom.el(watched, "div", &[]);
        dom.el(inner, "pre", &[]);
        dom.el(outside, "pre", &[]);

        assert_eq!(dom.flush_mutations(), 1);
        assert_eq!(seen.get(), 2);
        assert_eq!(dom.flush_mutations(), 0);
    }

    #[test]
    fn test_text_content_concatenates_descendants() {
        let dom = MemDom::new();
        let pre = dom.el(dom.body_id(), "pre", &[]);
        dom.text_el(pre, "code", &[], "let x = 1;");
        dom.text_el(pre, "span", &[], " // ok");
        assert_eq!(dom.text_content(&pre), "let x = 1; // ok");
    }
}
