//! `chrome.storage.local`, reached through `js_sys::Reflect` so the crate does
//! not need extension bindings.
//!
//! The area is asynchronous while [`SettingsStore`] is not, so the owned keys
//! are read once into a cache by [`ChromeStorageStore::open`]. Reads come from
//! the cache; writes update it and are sent to the extension in the
//! background.

use super::{SettingsStore, StorageError, StorageResult};
use leptos::logging::warn;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

const AREA: &str = "chrome.storage.local";

pub struct ChromeStorageStore {
    /// Keys living in the extension area; everything else goes to `page`.
    owned: Vec<String>,
    cache: Mutex<HashMap<String, String>>,
    page: Arc<dyn SettingsStore>,
}

impl ChromeStorageStore {
    /// Loads `keys` from the extension area. Fails with `Unavailable` outside
    /// an extension.
    pub async fn open(keys: &[&str], page: Arc<dyn SettingsStore>) -> StorageResult<Self> {
        let area = local_area().ok_or_else(|| StorageError::unavailable(AREA))?;
        let wanted: js_sys::Array = keys.iter().map(|k| JsValue::from_str(k)).collect();
        let promise = call(&area, "get", &wanted).map_err(|e| StorageError::read(AREA, e))?;
        let items = JsFuture::from(promise)
            .await
            .map_err(|e| StorageError::read(AREA, e))?;

        let mut loaded = HashMap::new();
        for key in keys {
            let value = js_sys::Reflect::get(&items, &JsValue::from_str(key))
                .unwrap_or(JsValue::UNDEFINED);
            if let Some(text) = value_to_text(&value) {
                loaded.insert(key.to_string(), text);
            }
        }
        Ok(Self::with_items(keys, loaded, page))
    }

    pub(crate) fn with_items(
        keys: &[&str],
        items: HashMap<String, String>,
        page: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            owned: keys.iter().map(|k| k.to_string()).collect(),
            cache: Mutex::new(items),
            page,
        }
    }

    fn owns(&self, key: &str) -> bool {
        self.owned.iter().any(|k| k == key)
    }
}

impl SettingsStore for ChromeStorageStore {
    fn get_raw(&self, key: &str) -> StorageResult<Option<String>> {
        if !self.owns(key) {
            return self.page.get_raw(key);
        }
        let cache = self.cache.lock().map_err(|_| StorageError::unavailable(AREA))?;
        Ok(cache.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> StorageResult<()> {
        if !self.owns(key) {
            return self.page.set_raw(key, value);
        }
        self.cache
            .lock()
            .map_err(|_| StorageError::unavailable(AREA))?
            .insert(key.to_string(), value.to_string());
        write_through(key, value);
        Ok(())
    }
}

/// Strings are kept as they are; anything else (arrays, booleans, objects)
/// becomes its JSON text.
fn value_to_text(value: &JsValue) -> Option<String> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    if let Some(text) = value.as_string() {
        return Some(text);
    }
    js_sys::JSON::stringify(value).ok().and_then(|s| s.as_string())
}

#[cfg(target_arch = "wasm32")]
fn local_area() -> Option<JsValue> {
    let mut cur: JsValue = js_sys::global().into();
    for name in ["chrome", "storage", "local"] {
        cur = js_sys::Reflect::get(&cur, &JsValue::from_str(name)).ok()?;
        if cur.is_undefined() || cur.is_null() {
            return None;
        }
    }
    Some(cur)
}

#[cfg(not(target_arch = "wasm32"))]
fn local_area() -> Option<JsValue> {
    None
}

fn call(area: &JsValue, method: &str, arg: &JsValue) -> Result<js_sys::Promise, JsValue> {
    let func: js_sys::Function = js_sys::Reflect::get(area, &JsValue::from_str(method))?.dyn_into()?;
    func.call1(area, arg)?.dyn_into()
}

/// JSON text is stored as the value it encodes, the way the extension's
/// other scripts expect it; anything else as a plain string.
fn write_through(key: &str, value: &str) {
    let Some(area) = local_area() else {
        return;
    };
    let stored = js_sys::JSON::parse(value).unwrap_or_else(|_| JsValue::from_str(value));
    let items = js_sys::Object::new();
    if js_sys::Reflect::set(&items, &JsValue::from_str(key), &stored).is_err() {
        return;
    }
    match call(&area, "set", &items) {
        Ok(promise) => {
            let key = key.to_string();
            leptos::task::spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    warn!("[note-helper] {AREA} write failed for {key}: {e:?}");
                }
            });
        }
        Err(e) => warn!("[note-helper] {AREA} write failed for {key}: {e:?}"),
    }
}
