//! Runtime configuration — backend endpoint, chat defaults, telemetry.
//!
//! User-level file: `~/.sidechat/config.yaml`.
//! Resolution: CLI flag → environment variable → config file → built-in default.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable overriding `api.base_url`.
pub const ENV_API_URL: &str = "SIDECHAT_API_URL";
/// Environment variable overriding `telemetry.connection_string`.
pub const ENV_TELEMETRY_CONNECTION: &str = "SIDECHAT_TELEMETRY_CONNECTION";
/// Environment variable overriding `telemetry.role_name`.
pub const ENV_ROLE_NAME: &str = "SIDECHAT_ROLE_NAME";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub chat: ChatConfig,
    pub telemetry: TelemetryConfig,
}

/// Where the chat backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
        }
    }
}

/// Request extras sent with every prompt. Unset fields are omitted from the
/// wire so the backend applies its own defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Telemetry wiring. Reporting stays off without a connection string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    pub role_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            role_name: crate::telemetry::DEFAULT_ROLE_NAME.into(),
        }
    }
}

/// Path to `~/.sidechat/`.
fn dirs_path() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|p| PathBuf::from(p).join(".sidechat"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME")
            .ok()
            .map(|p| PathBuf::from(p).join(".sidechat"))
    }
}

impl Config {
    /// Load config from disk, then apply environment overrides.
    /// A missing or unreadable file means built-in defaults.
    pub fn load() -> Self {
        let path = dirs_path().map(|dir| dir.join("config.yaml"));
        let mut config = match path {
            Some(path) => Self::load_file(&path),
            None => Self::default(),
        };
        config.apply_env();
        config
    }

    /// Load a specific config file, falling back to defaults on any error.
    pub fn load_file(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        if let Ok(connection) = std::env::var(ENV_TELEMETRY_CONNECTION) {
            if !connection.trim().is_empty() {
                self.telemetry.connection_string = Some(connection);
            }
        }
        if let Ok(role) = std::env::var(ENV_ROLE_NAME) {
            if !role.trim().is_empty() {
                self.telemetry.role_name = role;
            }
        }
    }
}
