mod app;
pub mod companion;
pub mod config;
pub mod dnd;
pub mod dom;
pub mod locator;
pub mod models;
pub mod panel;
pub mod schedule;
pub mod selector;
pub mod state;
pub mod storage;
pub mod tags;
mod util;
pub mod watcher;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;


// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    app::init();
}
