use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::Path,
    time::Duration,
};

use anyhow::Context;
use remote_config::FlagStoreSettings;
use serde::Deserialize;
use url::Url;

pub const SETTINGS_FILE: &str = "recipe_viewer.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub remote_config_url: Option<String>,
    pub app_id: Option<String>,
    pub fetch_timeout_secs: u64,
    pub minimum_fetch_interval_secs: u64,
    pub refresh_wait_ms: u64,
    pub flag_defaults: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote_config_url: None,
            app_id: None,
            fetch_timeout_secs: 60,
            minimum_fetch_interval_secs: 0,
            refresh_wait_ms: 2000,
            flag_defaults: HashMap::new(),
        }
    }
}

impl Settings {
    pub fn flag_store_settings(&self) -> FlagStoreSettings {
        FlagStoreSettings {
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            minimum_fetch_interval: Duration::from_secs(self.minimum_fetch_interval_secs),
        }
    }

    pub fn remote_config_endpoint(&self) -> anyhow::Result<Option<Url>> {
        let Some(raw) = self.remote_config_url.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let url = Url::parse(raw).with_context(|| format!("invalid remote config url '{raw}'"))?;
        Ok(Some(url))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    remote_config_url: Option<String>,
    app_id: Option<String>,
    fetch_timeout_secs: Option<u64>,
    minimum_fetch_interval_secs: Option<u64>,
    refresh_wait_ms: Option<u64>,
    #[serde(default)]
    flag_defaults: HashMap<String, String>,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
    }

    apply_env(&mut settings, env);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.remote_config_url {
        settings.remote_config_url = Some(v);
    }
    if let Some(v) = file_cfg.app_id {
        settings.app_id = Some(v);
    }
    if let Some(v) = file_cfg.fetch_timeout_secs {
        settings.fetch_timeout_secs = v;
    }
    if let Some(v) = file_cfg.minimum_fetch_interval_secs {
        settings.minimum_fetch_interval_secs = v;
    }
    if let Some(v) = file_cfg.refresh_wait_ms {
        settings.refresh_wait_ms = v;
    }
    settings.flag_defaults.extend(file_cfg.flag_defaults);

    Ok(())
}

fn apply_env(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("REMOTE_CONFIG_URL") {
        settings.remote_config_url = Some(v);
    }
    if let Some(v) = env("APP__REMOTE_CONFIG_URL") {
        settings.remote_config_url = Some(v);
    }

    if let Some(v) = env("APP__APP_ID") {
        settings.app_id = Some(v);
    }

    if let Some(parsed) = env("APP__FETCH_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.fetch_timeout_secs = parsed;
    }
    if let Some(parsed) = env("APP__MINIMUM_FETCH_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
        settings.minimum_fetch_interval_secs = parsed;
    }
    if let Some(parsed) = env("APP__REFRESH_WAIT_MS").and_then(|v| v.parse().ok()) {
        settings.refresh_wait_ms = parsed;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
