//! The note side panel: state controller, list rendering, placement and the
//! leptos view that ties them together.

pub mod list;
pub mod notebook;
pub mod platform;
pub mod position;
pub mod style;
pub mod view;

pub use notebook::{ActionTarget, NoteAction, Notebook};
pub use platform::{Platform, WebPlatform};
pub use view::{mount_panel, PanelDeps, WebPanelHost};
