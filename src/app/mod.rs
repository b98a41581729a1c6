//! Bootstrap: wires storage, the panel, the companion engine, the host-page
//! watcher and the drag engine together once `<body>` exists.

use crate::companion::{ChatUrlSource, CompanionEngine};
use crate::config::HelperConfig;
use crate::dnd::{DragReorder, NoteCollection, PanelHost};
use crate::dom::{HostDom, WebDom};
use crate::panel::{mount_panel, Notebook, PanelDeps, WebPanelHost, WebPlatform};
use crate::schedule::{Scheduler, WebScheduler};
use crate::state::NoteState;
use crate::storage::{default_store, SettingsStore};
use crate::util::current_chat_url;
use crate::watcher::{watch_until, HostWatcher};
use leptos::logging::{error, log};
use std::rc::Rc;
use std::sync::Arc;

/// Everything that has to outlive `init`.
struct Helper {
    _notebook: Rc<Notebook>,
    _watcher: HostWatcher<WebDom>,
    _dnd: DragReorder<WebDom>,
}

/// Starts the helper now, or as soon as the page gets a body.
pub fn init() {
    let dom = Rc::new(WebDom::new());
    if dom.body().is_some() {
        start(dom);
        return;
    }
    let Some(root) = dom.document().and_then(|d| d.document_element()) else {
        error!("[note-helper] no document to attach to");
        return;
    };
    let lookup_dom = Rc::downgrade(&dom);
    let start_dom = dom.clone();
    watch_until(
        &dom,
        &root,
        move || lookup_dom.upgrade().and_then(|d| d.body()),
        move |_body| start(start_dom.clone()),
    );
}

/// Storage has to be read before anything renders; the extension area is
/// async, so the rest of the start-up runs once it has answered. The leptos
/// executor is not set up until the panel mounts, hence the plain
/// wasm-bindgen task.
fn start(dom: Rc<WebDom>) {
    wasm_bindgen_futures::spawn_local(async move {
        let store = default_store().await;
        run(dom, store);
    });
}

fn run(dom: Rc<WebDom>, store: Arc<dyn SettingsStore>) {
    let Some(body) = dom.body() else {
        error!("[note-helper] body vanished before start");
        return;
    };
    let config = Rc::new(HelperConfig::load(store.as_ref()));
    let scheduler: Rc<dyn Scheduler> = Rc::new(WebScheduler);
    let chat_url: ChatUrlSource = Rc::new(current_chat_url);

    let notebook = Rc::new(Notebook::new(
        NoteState::new(),
        store,
        scheduler.clone(),
        Rc::new(WebPlatform),
        chat_url.clone(),
    ));
    notebook.load();

    let collection: Rc<dyn NoteCollection> = notebook.clone();
    let dnd = DragReorder::new(dom.clone(), scheduler.clone(), collection, config.dnd.clone());
    mount_panel(PanelDeps {
        notebook: notebook.clone(),
        dom: dom.clone(),
        dnd: dnd.clone(),
    });

    let engine = CompanionEngine::new(dom.clone(), scheduler, notebook.clone(), config, chat_url);
    engine.install_click_capture(&body);
    let watcher = HostWatcher::new(engine);
    watcher.scan_for_action_controls(&body);
    if watcher.observe_host_page().is_none() {
        error!("[note-helper] could not observe the page; new replies get no companion");
    }

    let host: Rc<dyn PanelHost<WebDom>> = Rc::new(WebPanelHost::new(dom));
    dnd.start(host);
    log!("[note-helper] ready");

    // Lives for the page's lifetime.
    std::mem::forget(Helper {
        _notebook: notebook,
        _watcher: watcher,
        _dnd: dnd,
    });
}
