mod chrome;

pub use chrome::ChromeStorageStore;

use crate::config::EXTENSION_KEYS;
use leptos::logging::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageErrorKind {
    Unavailable,
    Serialize,
    Parse,
    Read,
    Write,
}

#[derive(Clone, Debug)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StorageError {}

impl StorageError {
    fn unavailable(what: &str) -> Self {
        Self {
            kind: StorageErrorKind::Unavailable,
            message: format!("{what} is not available"),
        }
    }

    fn serialize(e: impl std::fmt::Display) -> Self {
        Self {
            kind: StorageErrorKind::Serialize,
            message: e.to_string(),
        }
    }

    fn parse(key: &str, e: impl std::fmt::Display) -> Self {
        Self {
            kind: StorageErrorKind::Parse,
            message: format!("{key}: {e}"),
        }
    }

    fn read(what: &str, e: impl std::fmt::Debug) -> Self {
        Self {
            kind: StorageErrorKind::Read,
            message: format!("{what}: {e:?}"),
        }
    }

    fn write(key: &str, e: impl std::fmt::Debug) -> Self {
        Self {
            kind: StorageErrorKind::Write,
            message: format!("{key}: {e:?}"),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// String key-value settings.
pub trait SettingsStore: Send + Sync {
    fn get_raw(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_raw(&self, key: &str, value: &str) -> StorageResult<()>;
}

pub fn load_json<T: for<'de> Deserialize<'de>>(
    store: &dyn SettingsStore,
    key: &str,
) -> StorageResult<Option<T>> {
    let Some(json) = store.get_raw(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| StorageError::parse(key, e))
}

pub fn save_json<T: Serialize>(store: &dyn SettingsStore, key: &str, value: &T) -> StorageResult<()> {
    let json = serde_json::to_string(value).map_err(StorageError::serialize)?;
    store.set_raw(key, &json)
}

/// `window.localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorageStore;

impl LocalStorageStore {
    fn storage() -> StorageResult<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or_else(|| StorageError::unavailable("localStorage"))
    }
}

impl SettingsStore for LocalStorageStore {
    fn get_raw(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(Self::storage()?.get_item(key).ok().flatten())
    }

    fn set_raw(&self, key: &str, value: &str) -> StorageResult<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::write(key, e))
    }
}

/// In-process store; used by tests and as the last fallback when no browser
/// storage is reachable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl SettingsStore for MemoryStore {
    fn get_raw(&self, key: &str) -> StorageResult<Option<String>> {
        let items = self.items.lock().map_err(|_| StorageError::unavailable("memory store"))?;
        Ok(items.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut items = self.items.lock().map_err(|_| StorageError::unavailable("memory store"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// `chrome.storage.local` inside an extension, with localStorage holding the
/// keys it does not own. Pages without the extension API get localStorage,
/// and memory when that is blocked too.
pub async fn default_store() -> Arc<dyn SettingsStore> {
    let page: Arc<dyn SettingsStore> = if LocalStorageStore::storage().is_ok() {
        Arc::new(LocalStorageStore)
    } else {
        Arc::new(MemoryStore::default())
    };
    match ChromeStorageStore::open(&EXTENSION_KEYS, page.clone()).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            if e.kind != StorageErrorKind::Unavailable {
                warn!("[note-helper] extension storage unusable, using page storage: {e}");
            }
            page
        }
    }
}
