/// Extension configuration as stored in chrome.storage.local
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://amazon-cleaner.onrender.com";

/// Storage keys read before every remote call
pub const STORAGE_KEYS: [&str; 2] = ["baseUrl", "debugMode"];

/// Settings written by the extension's settings page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub base_url: String,
    pub debug_mode: bool,
}

impl Configuration {
    pub fn new() -> Self {
        Configuration {
            base_url: DEFAULT_BASE_URL.to_string(),
            debug_mode: false,
        }
    }

    /// Build from whatever the storage area returned.
    ///
    /// A missing or empty `baseUrl` keeps the default; `debugMode` is only on
    /// when stored as literal `true`.
    pub fn from_storage(value: &Value) -> Self {
        let base_url = value
            .get("baseUrl")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string();

        let debug_mode = value.get("debugMode").and_then(Value::as_bool) == Some(true);

        Configuration {
            base_url,
            debug_mode,
        }
    }

    /// Base URL without a trailing slash, or the default if it does not parse.
    pub fn api_root(&self) -> String {
        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                self.base_url.trim_end_matches('/').to_string()
            }
            _ => {
                log::warn!("Ignoring invalid base URL '{}'", self.base_url);
                DEFAULT_BASE_URL.to_string()
            }
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

/// Messages broadcast from the settings page to content scripts
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action")]
pub enum InboundMessage {
    #[serde(rename = "updateDebugMode")]
    UpdateDebugMode {
        #[serde(rename = "debugMode")]
        debug_mode: bool,
    },
}

impl InboundMessage {
    /// `None` for messages meant for someone else.
    pub fn parse(value: Value) -> Option<InboundMessage> {
        serde_json::from_value(value).ok()
    }
}

/// Diagnostic output is only emitted in debug mode.
pub fn apply_debug_mode(enabled: bool) {
    let level = if enabled {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    log::set_max_level(level);
    log::debug!("Debug mode set to {}", enabled);
}
