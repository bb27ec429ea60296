use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Config directory not found")]
    ConfigDirNotFound,
}

/// Top-level client configuration, read from `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub editor: EditorConfig,
    pub socket: SocketConfig,
}

/// Connection settings for the content service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    /// REST base URL, including the API version prefix
    pub api_base_url: String,
    /// Bearer token for authenticated requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Whole-request timeout; a timed out save counts as a failed save
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api/v1".to_string(),
            token: None,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Period of the silent autosave tick
    pub autosave_interval_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_interval_ms: 30_000,
        }
    }
}

impl EditorConfig {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_interval_ms)
    }
}

/// Realtime channel settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SocketConfig {
    pub url: String,
    pub heartbeat_interval_ms: u64,
    pub reconnect_interval_ms: u64,
    pub max_reconnect_attempts: u32,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_string(),
            heartbeat_interval_ms: 30_000,
            reconnect_interval_ms: 5_000,
            max_reconnect_attempts: 5,
        }
    }
}

impl SocketConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

/// Shortest autosave period accepted from configuration
const MIN_AUTOSAVE_INTERVAL_MS: u64 = 1_000;

impl AppConfig {
    /// Default config file location (`~/.config/jugo/config.toml` on Linux)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("jugo").join("config.toml"))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Load from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("Config: {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&data)?;
        log::debug!("Config: loaded {}", path.display());
        Ok(config)
    }

    /// Load, apply environment overrides and validate
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        let mut config = Self::load(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `JUGO_API_URL`, `JUGO_WS_URL` and `JUGO_TOKEN` overrides
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("JUGO_API_URL") {
            self.remote.api_base_url = url;
        }
        if let Some(url) = lookup("JUGO_WS_URL") {
            self.socket.url = url;
        }
        if let Some(token) = lookup("JUGO_TOKEN").filter(|t| !t.is_empty()) {
            self.remote.token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let api = &self.remote.api_base_url;
        if !api.starts_with("http://") && !api.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "api_base_url must start with http:// or https:// (got '{}')",
                api
            )));
        }
        let ws = &self.socket.url;
        if !ws.starts_with("ws://") && !ws.starts_with("wss://") {
            return Err(ConfigError::Invalid(format!(
                "socket url must start with ws:// or wss:// (got '{}')",
                ws
            )));
        }
        if self.remote.request_timeout_secs == 0 || self.remote.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be greater than zero".to_string()));
        }
        if self.editor.autosave_interval_ms < MIN_AUTOSAVE_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "autosave_interval_ms must be at least {}",
                MIN_AUTOSAVE_INTERVAL_MS
            )));
        }
        if self.socket.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid("heartbeat_interval_ms must be greater than zero".to_string()));
        }
        Ok(())
    }
}
