use std::{collections::HashMap, fs, path::PathBuf};

use anyhow::{anyhow, Context};
use url::Url;

pub const SETTINGS_FILE: &str = "mediashare.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: String,
    pub project_id: String,
    pub platform: String,
    pub database_id: String,
    pub users_collection_id: String,
    pub videos_collection_id: String,
    pub storage_id: String,
    pub session_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: "https://cloud.appwrite.io/v1".into(),
            project_id: "6752583c00096f61a31d".into(),
            platform: "id.kirara.aora".into(),
            database_id: "67525a4d0006f24c20ed".into(),
            users_collection_id: "67525ae9001bdf334e60".into(),
            videos_collection_id: "67525b07002d31e1c239".into(),
            storage_id: "67525d7e000a0457f173".into(),
            session_file: PathBuf::from("./data/session.json"),
        }
    }
}

impl Settings {
    fn apply(&mut self, key: &str, value: String) {
        match key {
            "endpoint" => self.endpoint = value,
            "project_id" => self.project_id = value,
            "platform" => self.platform = value,
            "database_id" => self.database_id = value,
            "users_collection_id" => self.users_collection_id = value,
            "videos_collection_id" => self.videos_collection_id = value,
            "storage_id" => self.storage_id = value,
            "session_file" => self.session_file = PathBuf::from(value),
            _ => {}
        }
    }
}

const KEYS: &[&str] = &[
    "endpoint",
    "project_id",
    "platform",
    "database_id",
    "users_collection_id",
    "videos_collection_id",
    "storage_id",
    "session_file",
];

/// Defaults, then `mediashare.toml`, then `MEDIASHARE_*` / `APP__*` env vars.
pub fn load_settings() -> Settings {
    let raw = fs::read_to_string(SETTINGS_FILE).ok();
    load_settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    file_contents: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file_contents {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
            for (key, value) in file_cfg {
                settings.apply(&key, value);
            }
        }
    }

    for key in KEYS {
        let upper = key.to_ascii_uppercase();
        if let Some(v) = env(&format!("MEDIASHARE_{upper}")) {
            settings.apply(key, v);
        }
        if let Some(v) = env(&format!("APP__{upper}")) {
            settings.apply(key, v);
        }
    }

    settings.endpoint = normalize_endpoint(&settings.endpoint);
    settings
}

pub fn normalize_endpoint(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Settings::default().endpoint;
    }
    trimmed.to_string()
}

pub fn validate_endpoint(raw: &str) -> anyhow::Result<String> {
    let endpoint = normalize_endpoint(raw);
    let parsed =
        Url::parse(&endpoint).with_context(|| format!("invalid platform endpoint '{endpoint}'"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(endpoint),
        other => Err(anyhow!(
            "platform endpoint must use http or https, got '{other}'"
        )),
    }
}

/// Creates the parent directory of the session file if needed.
pub fn prepare_session_file(settings: &Settings) -> anyhow::Result<PathBuf> {
    let path = settings.session_file.clone();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create parent directory '{}' for session file",
                parent.display()
            )
        })?;
    }
    Ok(path)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
