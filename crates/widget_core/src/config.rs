use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Locale code attached to every outbound request.
pub const DEFAULT_LANGUAGE_TAG: &str = "en";

/// Name of the `window`-scoped configuration object a host page may set.
pub const GLOBAL_CONFIG_NAME: &str = "__KALIBRY_WIDGET_CONFIG__";

/// Data attribute on the embedding script tag that may carry the endpoint.
pub const SCRIPT_ENDPOINT_ATTRIBUTE: &str = "data-chat-api-url";

/// Session configuration owned by the gateway. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub endpoint_url: String,
    pub language_tag: String,
}

impl WidgetConfig {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            language_tag: DEFAULT_LANGUAGE_TAG.to_string(),
        }
    }
}

/// The host page's global configuration object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalWidgetConfig {
    #[serde(rename = "CHAT_API_URL", default)]
    pub chat_api_url: Option<String>,
    /// `false` disables self-initialization on page-ready.
    #[serde(rename = "AUTO_INIT", default)]
    pub auto_init: Option<bool>,
}

impl GlobalWidgetConfig {
    /// Read the object field by field so a mistyped entry does not hide the
    /// others. Non-object values yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            chat_api_url: object
                .get("CHAT_API_URL")
                .and_then(Value::as_str)
                .map(str::to_string),
            auto_init: object.get("AUTO_INIT").and_then(Value::as_bool),
        })
    }

    pub fn auto_init_enabled(&self) -> bool {
        self.auto_init.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn widget_config_uses_fixed_language() {
        let config = WidgetConfig::new("https://chat.example.com/api");
        assert_eq!(config.language_tag, "en");
    }

    #[test]
    fn global_config_reads_known_fields() {
        let config = GlobalWidgetConfig::from_value(&json!({
            "CHAT_API_URL": "https://from-global.example.com",
            "AUTO_INIT": false,
            "THEME": "dark"
        }))
        .unwrap();
        assert_eq!(
            config.chat_api_url.as_deref(),
            Some("https://from-global.example.com")
        );
        assert!(!config.auto_init_enabled());
    }

    #[test]
    fn global_config_tolerates_mistyped_fields() {
        let config =
            GlobalWidgetConfig::from_value(&json!({ "CHAT_API_URL": 42, "AUTO_INIT": "no" }))
                .unwrap();
        assert_eq!(config, GlobalWidgetConfig::default());
        assert!(config.auto_init_enabled());
    }

    #[test]
    fn global_config_rejects_non_objects() {
        assert!(GlobalWidgetConfig::from_value(&json!("https://x")).is_none());
        assert!(GlobalWidgetConfig::from_value(&Value::Null).is_none());
    }
}
