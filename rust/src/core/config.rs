use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

const CONFIG_FILE: &str = "friendlychat_config.json";
const DEVELOPER_MODE_ENV: &str = "FRIENDLYCHAT_DEVELOPER_MODE";

const DEFAULT_MESSAGES_PATH: &str = "messages";
const DEFAULT_PHOTOS_PATH: &str = "chat-photos";
const DEFAULT_NOTICE_DURATION_MS: u64 = 3000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) developer_mode: Option<bool>,
    pub(crate) messages_path: Option<String>,
    pub(crate) photos_path: Option<String>,
    pub(crate) notice_duration_ms: Option<u64>,
}

impl AppConfig {
    pub(crate) fn developer_mode(&self) -> bool {
        if let Ok(v) = std::env::var(DEVELOPER_MODE_ENV) {
            let t = v.trim();
            if !t.is_empty() {
                return t == "1" || t.eq_ignore_ascii_case("true");
            }
        }
        self.developer_mode.unwrap_or(false)
    }

    pub(crate) fn messages_path(&self) -> String {
        non_empty(self.messages_path.as_deref())
            .unwrap_or(DEFAULT_MESSAGES_PATH)
            .to_string()
    }

    pub(crate) fn photos_path(&self) -> String {
        non_empty(self.photos_path.as_deref())
            .unwrap_or(DEFAULT_PHOTOS_PATH)
            .to_string()
    }

    pub(crate) fn notice_duration_ms(&self) -> u64 {
        self.notice_duration_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_NOTICE_DURATION_MS)
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn read_app_config(path: &Path) -> anyhow::Result<AppConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

pub(crate) fn load_app_config(data_dir: &str) -> AppConfig {
    let path = Path::new(data_dir).join(CONFIG_FILE);
    if !path.exists() {
        return AppConfig::default();
    }
    match read_app_config(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(err = %format!("{e:#}"), "config: falling back to defaults");
            AppConfig::default()
        }
    }
}
