//! Mutation observers over the host page.

use crate::companion::{CompanionEngine, ReconcileScope};
use crate::dom::{HostDom, MutationBatch, ObserveOptions, ObserverId};
use std::cell::Cell;
use std::rc::Rc;

pub struct HostWatcher<D: HostDom> {
    engine: CompanionEngine<D>,
    observer: Rc<Cell<Option<ObserverId>>>,
}

impl<D: HostDom + 'static> HostWatcher<D> {
    pub fn new(engine: CompanionEngine<D>) -> Self {
        Self {
            engine,
            observer: Rc::new(Cell::new(None)),
        }
    }

    /// Initial pass over everything already on the page.
    pub fn scan_for_action_controls(&self, root: &D::Node) {
        self.engine.reconcile(root, ReconcileScope::Fresh);
    }

    pub fn handle_batch(&self, batch: &MutationBatch<D::Node>) {
        for node in &batch.added {
            self.engine.reconcile(node, ReconcileScope::Fresh);
        }
        for target in &batch.attribute_targets {
            if self.engine.is_action_control(target) {
                self.engine.ensure(target);
            }
        }
    }

    /// Starts observing the document body. Calling it again is a no-op.
    pub fn observe_host_page(&self) -> Option<ObserverId> {
        if let Some(id) = self.observer.get() {
            return Some(id);
        }
        let dom = self.engine.dom().clone();
        let body = dom.body()?;
        let options =
            ObserveOptions::child_list().with_attributes(&self.engine.config().observed_attributes);

        let engine = self.engine.clone();
        let watcher = HostWatcher {
            engine,
            observer: self.observer.clone(),
        };
        let id = dom.observe(
            &body,
            options,
            Rc::new(move |batch: MutationBatch<D::Node>| watcher.handle_batch(&batch)),
        )?;
        self.observer.set(Some(id));
        Some(id)
    }

    pub fn disconnect(&self) {
        if let Some(id) = self.observer.take() {
            self.engine.dom().disconnect(id);
        }
    }
}

/// Calls `found` once `lookup` succeeds, checking now and then after every
/// child-list change under `root`. The observer disconnects itself on
/// success.
pub fn watch_until<D, P, F>(dom: &Rc<D>, root: &D::Node, lookup: P, found: F) -> Option<ObserverId>
where
    D: HostDom + 'static,
    P: Fn() -> Option<D::Node> + 'static,
    F: Fn(D::Node) + 'static,
{
    if let Some(node) = lookup() {
        found(node);
        return None;
    }

    let slot: Rc<Cell<Option<ObserverId>>> = Rc::new(Cell::new(None));
    let done = Rc::new(Cell::new(false));
    let weak = Rc::downgrade(dom);
    let slot_cb = slot.clone();
    let id = dom.observe(
        root,
        ObserveOptions::child_list(),
        Rc::new(move |_batch: MutationBatch<D::Node>| {
            if done.get() {
                return;
            }
            let Some(node) = lookup() else {
                return;
            };
            done.set(true);
            if let (Some(dom), Some(id)) = (weak.upgrade(), slot_cb.take()) {
                dom.disconnect(id);
            }
            found(node);
        }),
    )?;
    slot.set(Some(id));
    Some(id)
}
