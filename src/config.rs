use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::ColdstartError;
use crate::poll::PollOptions;
use crate::types::FailurePolicy;

const CONFIG_DIR_NAME: &str = "coldstart";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Tunables read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub poll_timeout_secs: u64,
    pub version_variable: String,
    pub on_error: FailurePolicy,
    pub region: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            max_poll_attempts: 240,
            poll_timeout_secs: 120,
            version_variable: "VERSION".to_string(),
            on_error: FailurePolicy::Abort,
            region: None,
        }
    }
}

impl Settings {
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: Some(self.max_poll_attempts).filter(|n| *n > 0),
            timeout: Some(Duration::from_secs(self.poll_timeout_secs)).filter(|d| !d.is_zero()),
        }
    }
}

/// `{config_dir}/coldstart/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load settings from an explicit path (must exist) or from the default
/// location (silently skipped when absent).
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ColdstartError> {
    match explicit {
        Some(path) => read_settings(path),
        None => match default_config_path() {
            Some(path) if path.is_file() => read_settings(&path),
            _ => Ok(Settings::default()),
        },
    }
}

pub fn read_settings(path: &Path) -> Result<Settings, ColdstartError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ColdstartError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&raw).map_err(|detail| ColdstartError::ConfigParse {
        path: path.to_path_buf(),
        detail,
    })
}

fn parse_settings(raw: &str) -> Result<Settings, String> {
    let settings: Settings = toml::from_str(raw).map_err(|e| e.message().to_string())?;
    if settings.poll_interval_ms == 0 {
        return Err("poll_interval_ms must be greater than zero".to_string());
    }
    if settings.version_variable.trim().is_empty() {
        return Err("version_variable must not be empty".to_string());
    }
    Ok(settings)
}
