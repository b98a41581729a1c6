//! "Set Note" companion buttons next to the host page's copy buttons.
//!
//! The host re-renders its code-block headers freely (the "Copied!" swap is
//! the usual culprit), so a companion is never trusted to stay put. Every
//! pass looks it up again and moves it back next to its control.

use crate::config::{HelperConfig, NoteMode, COMPANION_CLASS, PROCESSED_ATTR};
use crate::dom::{DomEvent, EventData, HostDom};
use crate::locator::{is_plain_text_language, Locator};
use crate::schedule::Scheduler;
use std::rc::{Rc, Weak};

pub const COMPANION_LABEL: &str = "Set Note";
pub const COMPANION_TITLE: &str = "Send to the note panel (Shift: edit before saving)";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteOptions {
    pub chat_url: Option<String>,
}

/// Where captured snippets go.
pub trait NoteSink {
    fn add_note(&self, text: &str, options: NoteOptions);
    fn open_composer(&self, text: &str);
    fn focus_panel(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileScope {
    /// Skip controls already marked processed.
    Fresh,
    /// Re-assert every control.
    All,
}

pub type ChatUrlSource = Rc<dyn Fn() -> Option<String>>;

pub struct CompanionEngine<D: HostDom> {
    dom: Rc<D>,
    scheduler: Rc<dyn Scheduler>,
    sink: Rc<dyn NoteSink>,
    config: Rc<HelperConfig>,
    chat_url: ChatUrlSource,
}

impl<D: HostDom> Clone for CompanionEngine<D> {
    fn clone(&self) -> Self {
        Self {
            dom: self.dom.clone(),
            scheduler: self.scheduler.clone(),
            sink: self.sink.clone(),
            config: self.config.clone(),
            chat_url: self.chat_url.clone(),
        }
    }
}

impl<D: HostDom + 'static> CompanionEngine<D> {
    pub fn new(
        dom: Rc<D>,
        scheduler: Rc<dyn Scheduler>,
        sink: Rc<dyn NoteSink>,
        config: Rc<HelperConfig>,
        chat_url: ChatUrlSource,
    ) -> Self {
        Self {
            dom,
            scheduler,
            sink,
            config,
            chat_url,
        }
    }

    pub fn dom(&self) -> &Rc<D> {
        &self.dom
    }

    pub fn config(&self) -> &HelperConfig {
        &self.config
    }

    fn locator(&self) -> Locator<'_, D> {
        Locator::new(&self.dom, &self.config)
    }

    pub fn is_action_control(&self, node: &D::Node) -> bool {
        self.dom.matches(node, &self.config.copy_button_selector)
    }

    fn is_processed(&self, control: &D::Node) -> bool {
        self.dom.attribute(control, PROCESSED_ATTR).as_deref() == Some("true")
    }

    /// Inside an assistant bubble, with a block to read from, and in strict
    /// mode only for plain-text blocks.
    pub fn is_eligible(&self, control: &D::Node) -> bool {
        let loc = self.locator();
        if loc.bubble_of(control).is_none() || loc.block_for_control(control).is_none() {
            return false;
        }
        match self.config.mode {
            NoteMode::Loose => true,
            NoteMode::Strict => is_plain_text_language(&loc.detect_language(control)),
        }
    }

    /// Makes sure exactly one companion sits right after `control`.
    ///
    /// Returns the companion, or `None` when the control is not eligible or
    /// is detached from any container.
    pub fn ensure(&self, control: &D::Node) -> Option<D::Node> {
        if !self.is_eligible(control) {
            return None;
        }
        let container = self.dom.parent_element(control)?;
        let header = self.locator().header_of(control);

        let companion = match self.existing_companion(&header, control) {
            Some(found) => {
                if self.dom.previous_element_sibling(&found).as_ref() != Some(control) {
                    self.dom.insert_after(&container, &found, control);
                }
                found
            }
            None => {
                let created = self.create_companion()?;
                self.dom.insert_after(&container, &created, control);
                created
            }
        };

        self.dom.pair(&header, &companion);
        self.dom.pair(control, &companion);
        if !self.is_processed(control) {
            self.dom.set_attribute(control, PROCESSED_ATTR, "true");
        }
        Some(companion)
    }

    fn existing_companion(&self, header: &D::Node, control: &D::Node) -> Option<D::Node> {
        self.dom
            .paired(header)
            .or_else(|| self.dom.paired(control))
            .or_else(|| self.dom.query_selector(header, &self.config.companion_selector))
    }

    fn create_companion(&self) -> Option<D::Node> {
        let button = self.dom.create_element("button")?;
        self.dom.set_attribute(&button, "type", "button");
        self.dom.set_attribute(&button, "class", COMPANION_CLASS);
        self.dom.set_attribute(&button, "title", COMPANION_TITLE);
        self.dom.set_text_content(&button, COMPANION_LABEL);

        let activation = Activation {
            dom: Rc::downgrade(&self.dom),
            sink: self.sink.clone(),
            config: self.config.clone(),
            chat_url: self.chat_url.clone(),
        };
        let me = button.clone();
        self.dom.listen(
            &button,
            DomEvent::Activate,
            Rc::new(move |ev: &EventData<D::Node>| activation.run(&me, ev.modifier)),
        );
        Some(button)
    }

    /// Runs [`CompanionEngine::ensure`] over the controls at and below `root`.
    pub fn reconcile(&self, root: &D::Node, scope: ReconcileScope) {
        if self.is_action_control(root) {
            self.ensure(root);
        }
        for control in self
            .dom
            .query_selector_all(root, &self.config.copy_button_selector)
        {
            if scope == ReconcileScope::Fresh && self.is_processed(&control) {
                continue;
            }
            self.ensure(&control);
        }
    }

    /// Re-asserts the companions around `control` a few times after a copy
    /// click, while the host swaps its "Copied!" state in and out.
    pub fn schedule_keep_alive(&self, control: &D::Node) {
        let loc = self.locator();
        let root = loc
            .bubble_of(control)
            .unwrap_or_else(|| loc.header_of(control));
        for delay in self.config.keep_alive_delays_ms.iter().copied() {
            let engine = self.clone();
            let root = root.clone();
            self.scheduler.set_timeout(
                delay,
                Box::new(move || engine.reconcile(&root, ReconcileScope::All)),
            );
        }
    }

    /// Watches clicks on `body` in the capture phase and starts a keep-alive
    /// burst for clicks that land on a copy control.
    pub fn install_click_capture(&self, body: &D::Node) {
        let engine = self.clone();
        self.dom.listen(
            body,
            DomEvent::ClickCapture,
            Rc::new(move |ev: &EventData<D::Node>| {
                let Some(target) = ev.target.as_ref() else {
                    return;
                };
                if let Some(control) = engine
                    .dom
                    .closest(target, &engine.config.copy_button_selector)
                {
                    engine.schedule_keep_alive(&control);
                }
            }),
        );
    }
}

/// What a companion click needs; holds the DOM weakly so listeners do not
/// keep it alive.
struct Activation<D: HostDom> {
    dom: Weak<D>,
    sink: Rc<dyn NoteSink>,
    config: Rc<HelperConfig>,
    chat_url: ChatUrlSource,
}

impl<D: HostDom> Activation<D> {
    fn run(&self, companion: &D::Node, modifier: bool) {
        let Some(dom) = self.dom.upgrade() else {
            return;
        };
        // read from wherever the companion sits now
        let Some(header) = dom.parent_element(companion) else {
            return;
        };
        let text = Locator::new(dom.as_ref(), &self.config).text_for_header(&header);
        if text.is_empty() {
            return;
        }
        if modifier {
            self.sink.open_composer(&text);
            return;
        }
        self.sink.focus_panel();
        self.sink.add_note(
            &text,
            NoteOptions {
                chat_url: (self.chat_url)(),
            },
        );
    }
}
