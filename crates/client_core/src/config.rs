use std::fs;

use serde::Deserialize;

/// Connection settings for the admin API. The session token and base URL are
/// explicit configuration handed to the data source, never ambient globals.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub bearer_token: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080/api/v1".into(),
            bearer_token: None,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    bearer_token: Option<String>,
    request_timeout_seconds: Option<u64>,
}

const SETTINGS_FILE: &str = "admin.toml";

/// Defaults, overlaid by `admin.toml` in the working directory, overlaid by
/// environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<FileSettings>(raw) else {
        tracing::warn!(file = SETTINGS_FILE, "ignoring unparseable settings file");
        return;
    };

    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.bearer_token {
        settings.bearer_token = Some(v);
    }
    if let Some(v) = file_cfg.request_timeout_seconds {
        settings.request_timeout_seconds = v;
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ADMIN_API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("ADMIN_BEARER_TOKEN") {
        settings.bearer_token = Some(v);
    }
    if let Some(v) = lookup("ADMIN_REQUEST_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_seconds = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
