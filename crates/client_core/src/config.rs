use std::{collections::HashMap, fs, time::Duration};

use anyhow::{anyhow, Context};
use tracing::warn;
use url::Url;

pub const SETTINGS_FILE: &str = "catalog.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: String,
    pub api_key: String,
    pub collection: String,
    pub search_debounce_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8787".into(),
            api_key: String::new(),
            collection: "products".into(),
            search_debounce_ms: 700,
            request_timeout_secs: 15,
        }
    }
}

impl Settings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Command-line flags win over every other source.
    pub fn with_overrides(mut self, backend_url: Option<String>, api_key: Option<String>) -> Self {
        if let Some(v) = backend_url {
            self.backend_url = v;
        }
        if let Some(v) = api_key {
            self.api_key = v;
        }
        self
    }

    /// Layers `catalog.toml` contents (if any) and then environment
    /// variables over the defaults.
    pub fn from_sources(
        file_contents: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut settings = Settings::default();

        if let Some(raw) = file_contents {
            match toml::from_str::<HashMap<String, String>>(raw) {
                Ok(file_cfg) => {
                    if let Some(v) = file_cfg.get("backend_url") {
                        settings.backend_url = v.clone();
                    }
                    if let Some(v) = file_cfg.get("api_key") {
                        settings.api_key = v.clone();
                    }
                    if let Some(v) = file_cfg.get("collection") {
                        settings.collection = v.clone();
                    }
                    if let Some(v) = file_cfg.get("search_debounce_ms") {
                        set_parsed(&mut settings.search_debounce_ms, "search_debounce_ms", v);
                    }
                    if let Some(v) = file_cfg.get("request_timeout_secs") {
                        set_parsed(
                            &mut settings.request_timeout_secs,
                            "request_timeout_secs",
                            v,
                        );
                    }
                }
                Err(err) => warn!("config: ignoring unreadable {SETTINGS_FILE}: {err}"),
            }
        }

        if let Some(v) = env("CATALOG_BACKEND_URL") {
            settings.backend_url = v;
        }
        if let Some(v) = env("APP__BACKEND_URL") {
            settings.backend_url = v;
        }

        if let Some(v) = env("CATALOG_API_KEY") {
            settings.api_key = v;
        }
        if let Some(v) = env("APP__API_KEY") {
            settings.api_key = v;
        }

        if let Some(v) = env("APP__COLLECTION") {
            settings.collection = v;
        }

        if let Some(v) = env("APP__SEARCH_DEBOUNCE_MS") {
            set_parsed(&mut settings.search_debounce_ms, "APP__SEARCH_DEBOUNCE_MS", &v);
        }
        if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
            set_parsed(
                &mut settings.request_timeout_secs,
                "APP__REQUEST_TIMEOUT_SECS",
                &v,
            );
        }

        settings
    }
}

fn set_parsed(target: &mut u64, key: &str, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(parsed) => *target = parsed,
        Err(err) => warn!("config: invalid {key} value '{raw}': {err}"),
    }
}

pub fn load_settings() -> Settings {
    let file_contents = fs::read_to_string(SETTINGS_FILE).ok();
    Settings::from_sources(file_contents.as_deref(), |key| std::env::var(key).ok())
}

/// Trims trailing slashes and insists on an http(s) URL.
pub fn normalize_backend_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(anyhow!("backend url is empty"));
    }

    let parsed =
        Url::parse(trimmed).with_context(|| format!("invalid backend url '{trimmed}'"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(anyhow!(
            "backend url must use http:// or https://, got '{other}://'"
        )),
    }
}
