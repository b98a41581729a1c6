//! Finds the code block that belongs to a host "copy" control.
//!
//! The host markup is not a contract: headers and blocks are usually
//! siblings but not always, so the search walks an ordered chain of
//! heuristics and settles for "none" rather than failing.

use crate::config::HelperConfig;
use crate::dom::HostDom;

pub struct Locator<'a, D: HostDom> {
    dom: &'a D,
    config: &'a HelperConfig,
}

impl<'a, D: HostDom> Locator<'a, D> {
    pub fn new(dom: &'a D, config: &'a HelperConfig) -> Self {
        Self { dom, config }
    }

    /// The message bubble containing `node`, if any.
    pub fn bubble_of(&self, node: &D::Node) -> Option<D::Node> {
        self.dom.closest(node, &self.config.bubble_selector)
    }

    /// The action group a control sits in.
    pub fn header_of(&self, control: &D::Node) -> D::Node {
        self.dom
            .parent_element(control)
            .or_else(|| self.dom.closest(control, &self.config.header_fallback_selector))
            .unwrap_or_else(|| control.clone())
    }

    /// First block at or below one of the elements following `from`.
    fn forward_sibling_block(&self, from: &D::Node) -> Option<D::Node> {
        let block = &self.config.block_selector;
        let mut sib = self.dom.next_element_sibling(from);
        while let Some(s) = sib {
            if self.dom.matches(&s, block) {
                return Some(s);
            }
            if let Some(nested) = self.dom.query_selector(&s, block) {
                return Some(nested);
            }
            sib = self.dom.next_element_sibling(&s);
        }
        None
    }

    pub fn block_for_header(&self, header: &D::Node) -> Option<D::Node> {
        if let Some(found) = self.forward_sibling_block(header) {
            return Some(found);
        }

        if let Some(group) = self.dom.parent_element(header) {
            let blocks = self.dom.query_selector_all(&group, &self.config.block_selector);
            match blocks.len() {
                0 => {}
                1 => return blocks.into_iter().next(),
                _ => {
                    return self
                        .forward_sibling_block(header)
                        .or_else(|| blocks.into_iter().next())
                }
            }
        }

        self.bubble_of(header)
            .and_then(|bubble| self.dom.query_selector(&bubble, &self.config.block_selector))
    }

    pub fn block_for_control(&self, control: &D::Node) -> Option<D::Node> {
        self.block_for_header(&self.header_of(control))
    }

    /// Trimmed text of the block under `header`; prefers its `code` child.
    pub fn text_for_header(&self, header: &D::Node) -> String {
        let Some(block) = self.block_for_header(header) else {
            return String::new();
        };
        let source = self
            .dom
            .query_selector(&block, &self.config.code_selector)
            .unwrap_or(block);
        self.dom.text_content(&source).trim().to_string()
    }

    /// Lowercased language of the block next to `control`, or `""`.
    ///
    /// Signals are taken in a fixed order and the first non-empty one wins:
    /// `language-*` class on `code`, the header's badge text, then
    /// `data-language`/`data-lang` on `code` and `pre`.
    pub fn detect_language(&self, control: &D::Node) -> String {
        let block = self.block_for_control(control);
        let code = block
            .as_ref()
            .and_then(|b| self.dom.query_selector(b, &self.config.code_selector));

        if let Some(lang) = code
            .as_ref()
            .and_then(|c| self.dom.attribute(c, "class"))
            .and_then(|class| language_from_class(&class))
        {
            return lang;
        }

        if let Some(header) = self.dom.parent_element(control) {
            let badge = self
                .dom
                .query_selector(&header, &self.config.badge_selector)
                .map(|b| self.dom.text_content(&b).trim().to_lowercase())
                .unwrap_or_default();
            if !badge.is_empty() {
                return badge;
            }
        }

        let data_lang = |node: &Option<D::Node>| {
            node.as_ref().and_then(|n| {
                self.dom
                    .attribute(n, "data-language")
                    .or_else(|| self.dom.attribute(n, "data-lang"))
                    .filter(|v| !v.is_empty())
            })
        };
        data_lang(&code)
            .or_else(|| data_lang(&block))
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// `language-<name>` token of a class attribute, lowercased.
pub fn language_from_class(class: &str) -> Option<String> {
    let lower = class.to_lowercase();
    let start = lower.find("language-")? + "language-".len();
    let name: String = lower[start..]
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

pub fn is_plain_text_language(lang: &str) -> bool {
    matches!(lang, "text" | "plain" | "plaintext")
}
