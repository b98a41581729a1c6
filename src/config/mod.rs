use crate::selector::Selector;
use crate::storage::SettingsStore;
use std::str::FromStr;

pub(crate) const MODE_KEY: &str = "cgpt-note-mode";
pub(crate) const NOTES_KEY: &str = "cgpt-note-helper::notes";
pub(crate) const COLLAPSED_KEY: &str = "cgpt-note-helper::collapsed";
pub(crate) const POSITION_KEY: &str = "cgpt-note-helper::panel-position";
/// Keys kept in extension storage when it exists; the note mode stays a
/// page-level switch.
pub(crate) const EXTENSION_KEYS: [&str; 3] = [NOTES_KEY, COLLAPSED_KEY, POSITION_KEY];

pub(crate) const PANEL_ID: &str = "cgpt-note-panel";
pub(crate) const COMPANION_CLASS: &str = "cgpt-set-note-btn";
pub(crate) const PROCESSED_ATTR: &str = "data-cgpt-note-applied";

/// Which code blocks get a companion button.
///
/// `Strict` only offers it on plain-text blocks (raw paste); `Loose` on every
/// code block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NoteMode {
    Strict,
    #[default]
    Loose,
}

/// Selectors and timings shared by the engines.
#[derive(Clone, Debug)]
pub struct HelperConfig {
    pub mode: NoteMode,

    /// Host-page "copy" buttons.
    pub copy_button_selector: Selector,
    pub bubble_selector: Selector,
    /// Fallback when a control has no parent element.
    pub header_fallback_selector: Selector,
    pub block_selector: Selector,
    pub code_selector: Selector,
    pub badge_selector: Selector,
    pub companion_selector: Selector,

    /// Re-assert delays after a copy click, in ms.
    pub keep_alive_delays_ms: Vec<u32>,
    /// Attribute changes the host page watcher reacts to.
    pub observed_attributes: Vec<&'static str>,

    pub dnd: DndConfig,
}

#[derive(Clone, Debug)]
pub struct DndConfig {
    /// Candidate list containers, tried in order.
    pub list_selectors: Vec<Selector>,
    pub item_selector: Selector,
    pub dragging_class: &'static str,
    pub enabled_attr: &'static str,
    pub edge_threshold_px: f64,
    pub scroll_speed_px: f64,
    pub animation_ms: u32,
    pub easing: &'static str,
    /// Vertical distance under which the horizontal centre breaks ties.
    pub center_epsilon_px: f64,
    /// Moves at or below this are not animated.
    pub min_flip_delta_px: f64,
}

impl Default for DndConfig {
    fn default() -> Self {
        Self {
            list_selectors: [
                r#"[data-role="note-list"]"#,
                ".cgpt-note-list",
                ".cgpt-notes-list",
                ".cgpt-notes",
            ]
            .iter()
            .map(|s| Selector::new(s))
            .collect(),
            item_selector: Selector::any_of(&[".cgpt-note-item", ".cgpt-note"]),
            dragging_class: "dragging",
            enabled_attr: "data-dnd-enabled",
            edge_threshold_px: 32.0,
            scroll_speed_px: 18.0,
            animation_ms: 180,
            easing: "cubic-bezier(0.2, 0.0, 0.2, 1)",
            center_epsilon_px: 6.0,
            min_flip_delta_px: 0.5,
        }
    }
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            mode: NoteMode::default(),
            copy_button_selector: Selector::any_of(&[
                r#"button[data-testid="copy-button"]"#,
                r#"button[data-testid="copy-code-button"]"#,
                r#"button[aria-label*="Copy" i]"#,
                r#"button[aria-label*="Kopieren" i]"#,
            ]),
            bubble_selector: Selector::new(r#"[data-message-author-role="assistant"]"#),
            header_fallback_selector: Selector::any_of(&["header", "div", "section", "article"]),
            block_selector: Selector::new("pre"),
            code_selector: Selector::new("code"),
            badge_selector: Selector::any_of(&["span", "div", "strong", "em"]),
            companion_selector: Selector::new(&format!(".{COMPANION_CLASS}")),
            keep_alive_delays_ms: vec![0, 60, 180, 400, 800, 1200],
            observed_attributes: vec!["class", "aria-label", "data-state", "data-testid"],
            dnd: DndConfig::default(),
        }
    }
}

impl HelperConfig {
    /// Defaults plus the user's mode choice from settings.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let mode = store
            .get_raw(MODE_KEY)
            .ok()
            .flatten()
            .map(|raw| parse_mode(&raw))
            .unwrap_or_default();
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: NoteMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Unknown values fall back to `Loose`.
pub fn parse_mode(raw: &str) -> NoteMode {
    NoteMode::from_str(raw.trim()).unwrap_or_default()
}
