//! Endpoint resolution across the widget's configuration sources.
//!
//! Sources are consulted in a fixed order and the first non-blank value
//! wins: explicit argument, build-time environment, the host page's global
//! configuration object, then the embedding script tag's data attribute.

use std::fmt;

use widget_core::GlobalWidgetConfig;

/// Where a resolved endpoint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSource {
    Explicit,
    BuildEnvironment,
    GlobalConfig,
    ScriptAttribute,
}

impl fmt::Display for EndpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Explicit => "explicit argument",
            Self::BuildEnvironment => "build environment",
            Self::GlobalConfig => "global config",
            Self::ScriptAttribute => "script data attribute",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub url: String,
    pub source: EndpointSource,
}

#[derive(Debug, Clone)]
pub struct ConfigResolver {
    explicit_url: Option<String>,
    build_time_url: Option<String>,
    global_config: Option<GlobalWidgetConfig>,
    script_attribute: Option<String>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Resolver seeded with the endpoint baked in at compile time, if any.
    pub fn new() -> Self {
        Self {
            explicit_url: None,
            build_time_url: option_env!("CHAT_API_URL").map(str::to_string),
            global_config: None,
            script_attribute: None,
        }
    }

    pub fn with_explicit_url(mut self, url: Option<String>) -> Self {
        self.explicit_url = url;
        self
    }

    /// Override the compile-time value.
    pub fn with_build_time_url(mut self, url: Option<String>) -> Self {
        self.build_time_url = url;
        self
    }

    pub fn with_global_config(mut self, config: Option<GlobalWidgetConfig>) -> Self {
        self.global_config = config;
        self
    }

    pub fn with_script_attribute(mut self, url: Option<String>) -> Self {
        self.script_attribute = url;
        self
    }

    /// All sources in priority order.
    pub fn candidates(&self) -> [(EndpointSource, Option<&str>); 4] {
        [
            (EndpointSource::Explicit, self.explicit_url.as_deref()),
            (
                EndpointSource::BuildEnvironment,
                self.build_time_url.as_deref(),
            ),
            (
                EndpointSource::GlobalConfig,
                self.global_config
                    .as_ref()
                    .and_then(|config| config.chat_api_url.as_deref()),
            ),
            (
                EndpointSource::ScriptAttribute,
                self.script_attribute.as_deref(),
            ),
        ]
    }

    /// First non-blank source, trimmed.
    pub fn resolve(&self) -> Option<ResolvedEndpoint> {
        self.candidates()
            .into_iter()
            .find_map(|(source, value)| {
                let url = value?.trim();
                (!url.is_empty()).then(|| ResolvedEndpoint {
                    url: url.to_string(),
                    source,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare() -> ConfigResolver {
        ConfigResolver::new().with_build_time_url(None)
    }

    fn global(url: &str) -> Option<GlobalWidgetConfig> {
        Some(GlobalWidgetConfig {
            chat_api_url: Some(url.to_string()),
            auto_init: None,
        })
    }

    #[test]
    fn explicit_url_wins_over_everything() {
        let resolved = bare()
            .with_explicit_url(Some("https://explicit.example.com".into()))
            .with_build_time_url(Some("https://build.example.com".into()))
            .with_global_config(global("https://global.example.com"))
            .with_script_attribute(Some("https://script.example.com".into()))
            .resolve()
            .unwrap();
        assert_eq!(resolved.url, "https://explicit.example.com");
        assert_eq!(resolved.source, EndpointSource::Explicit);
    }

    #[test]
    fn global_config_wins_over_script_attribute() {
        let resolved = bare()
            .with_global_config(global("https://global.example.com"))
            .with_script_attribute(Some("https://script.example.com".into()))
            .resolve()
            .unwrap();
        assert_eq!(resolved.url, "https://global.example.com");
        assert_eq!(resolved.source, EndpointSource::GlobalConfig);
    }

    #[test]
    fn blank_sources_are_skipped() {
        let resolved = bare()
            .with_explicit_url(Some("   ".into()))
            .with_build_time_url(Some(String::new()))
            .with_global_config(Some(GlobalWidgetConfig::default()))
            .with_script_attribute(Some("  https://script.example.com/chat ".into()))
            .resolve()
            .unwrap();
        assert_eq!(resolved.url, "https://script.example.com/chat");
        assert_eq!(resolved.source, EndpointSource::ScriptAttribute);
    }

    #[test]
    fn nothing_configured_resolves_to_none() {
        assert!(bare().resolve().is_none());
    }

    #[test]
    fn build_time_precedes_global_config() {
        let resolved = bare()
            .with_build_time_url(Some("https://build.example.com".into()))
            .with_global_config(global("https://global.example.com"))
            .resolve()
            .unwrap();
        assert_eq!(resolved.source, EndpointSource::BuildEnvironment);
    }
}
