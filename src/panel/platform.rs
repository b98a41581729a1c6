//! Browser services the panel needs beyond the DOM.

use leptos::logging::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

pub trait Platform {
    fn copy_text(&self, text: &str);
    fn confirm(&self, message: &str) -> bool;
    fn alert(&self, message: &str);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WebPlatform;

impl Platform for WebPlatform {
    fn copy_text(&self, text: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let clipboard = js_sys::Reflect::get(&window.navigator(), &"clipboard".into())
            .ok()
            .filter(|c| !c.is_undefined() && !c.is_null())
            .and_then(|c| c.dyn_into::<web_sys::Clipboard>().ok());
        match clipboard {
            Some(clipboard) => {
                let promise = clipboard.write_text(text);
                leptos::task::spawn_local(async move {
                    if let Err(e) = JsFuture::from(promise).await {
                        warn!("[note-helper] copy failed: {e:?}");
                    }
                });
            }
            None => copy_with_textarea(text),
        }
    }

    fn confirm(&self, message: &str) -> bool {
        web_sys::window()
            .and_then(|w| w.confirm_with_message(message).ok())
            .unwrap_or(false)
    }

    fn alert(&self, message: &str) {
        if let Some(w) = web_sys::window() {
            let _ = w.alert_with_message(message);
        }
    }
}

/// Pre-clipboard-API path: select a throwaway textarea and `execCommand`.
fn copy_with_textarea(text: &str) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let Some(body) = document.body() else {
        return;
    };
    let Some(temp) = document
        .create_element("textarea")
        .ok()
        .and_then(|el| el.dyn_into::<web_sys::HtmlTextAreaElement>().ok())
    else {
        return;
    };
    temp.set_value(text);
    let _ = temp.style().set_property("position", "fixed");
    let _ = temp.style().set_property("opacity", "0");
    let _ = body.append_child(&temp);
    temp.select();
    if let Some(html) = document.dyn_ref::<web_sys::HtmlDocument>() {
        if !html.exec_command("copy").unwrap_or(false) {
            warn!("[note-helper] copy failed: execCommand refused");
        }
    }
    temp.remove();
}
