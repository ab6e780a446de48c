/// chrome.storage and chrome.runtime access for the content script
use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::config::{Configuration, InboundMessage, STORAGE_KEYS, apply_debug_mode};
use crate::remote::ConfigStore;

// Import JS bridge functions
#[wasm_bindgen(module = "/js/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(keys: JsValue) -> Result<JsValue, JsValue>;

    fn onRuntimeMessage(callback: &js_sys::Function);
}

/// Reads the settings page's values from chrome.storage.local on every load.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeConfigStore;

impl ConfigStore for ChromeConfigStore {
    fn load(&self) -> LocalBoxFuture<'_, Configuration> {
        async {
            match read_storage().await {
                Ok(stored) => Configuration::from_storage(&stored),
                Err(e) => {
                    log::warn!("Failed to read settings, using defaults: {}", e);
                    Configuration::default()
                }
            }
        }
        .boxed_local()
    }
}

async fn read_storage() -> Result<Value, String> {
    let keys = serde_wasm_bindgen::to_value(&STORAGE_KEYS)
        .map_err(|e| format!("Failed to serialize keys: {:?}", e))?;

    let stored = getStorage(keys)
        .await
        .map_err(|e| format!("Failed to get storage: {:?}", e))?;

    if stored.is_null() || stored.is_undefined() {
        return Ok(Value::Null);
    }
    serde_wasm_bindgen::from_value(stored).map_err(|e| format!("Failed to parse storage: {:?}", e))
}

/// Follow debug-mode changes broadcast by the settings page.
pub fn listen_for_settings() {
    let callback = Closure::wrap(Box::new(move |message: JsValue| {
        let Ok(value) = serde_wasm_bindgen::from_value::<Value>(message) else {
            return;
        };
        match InboundMessage::parse(value) {
            Some(InboundMessage::UpdateDebugMode { debug_mode }) => {
                apply_debug_mode(debug_mode);
                log::info!("Debug mode {}", if debug_mode { "enabled" } else { "disabled" });
            }
            None => log::debug!("Ignoring message not meant for the content script"),
        }
    }) as Box<dyn FnMut(JsValue)>);

    onRuntimeMessage(callback.as_ref().unchecked_ref());

    // Lives as long as the page
    callback.forget();
}
