//! Application configuration management.
//!
//! Handles loading, saving, and accessing the configuration for the notice
//! channel: where the admin server lives, the bearer credential, and the
//! reconnect/heartbeat tuning. Configuration is persisted as TOML on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{NoticeError, NoticeResult};
use crate::platform::Platform;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Admin server connection settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Real-time channel tuning.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Admin server connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Origin the console is served from (e.g., "https://admin.example.com").
    #[serde(default)]
    pub origin: String,

    /// Path of the notice socket endpoint.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Port override for the socket endpoint. In development the backend
    /// listens on its own port rather than the page's.
    #[serde(default)]
    pub ws_port: Option<u16>,

    /// REST API path prefix.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Bearer token issued at login. Empty means "not logged in".
    #[serde(default)]
    pub token: String,

    /// REST request timeout in milliseconds.
    #[serde(default = "default_api_timeout")]
    pub api_timeout_ms: u64,
}

/// Reconnect, heartbeat and bus settings for the notice channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Delay before the first reconnect, doubled on each further failure.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Cap on a single reconnect delay.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Consecutive reconnects allowed before the channel gives up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Keep-alive interval while the socket is open.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,

    /// Text frame sent on each heartbeat.
    #[serde(default = "default_ping_payload")]
    pub ping_payload: String,

    /// Text frame the server replies with; never dispatched.
    #[serde(default = "default_pong_payload")]
    pub pong_payload: String,

    /// Capacity of each notification bus topic.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Deadline for the socket handshake.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

// Default value functions for serde

fn default_ws_path() -> String {
    constants::NOTICE_WS_PATH.to_string()
}

fn default_api_prefix() -> String {
    constants::API_PREFIX.to_string()
}

fn default_api_timeout() -> u64 {
    constants::DEFAULT_API_TIMEOUT_MS
}

fn default_base_delay() -> u64 {
    constants::backoff::BASE_DELAY_MS
}

fn default_max_delay() -> u64 {
    constants::backoff::MAX_DELAY_MS
}

fn default_max_retries() -> u32 {
    constants::backoff::MAX_RETRIES
}

fn default_heartbeat_interval() -> u64 {
    constants::heartbeat::INTERVAL_MS
}

fn default_ping_payload() -> String {
    constants::heartbeat::PING.to_string()
}

fn default_pong_payload() -> String {
    constants::heartbeat::PONG.to_string()
}

fn default_bus_capacity() -> usize {
    constants::DEFAULT_BUS_CAPACITY
}

fn default_connect_timeout() -> u64 {
    constants::DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            origin: String::new(),
            ws_path: default_ws_path(),
            ws_port: None,
            api_prefix: default_api_prefix(),
            token: String::new(),
            api_timeout_ms: default_api_timeout(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            max_retries: default_max_retries(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            ping_payload: default_ping_payload(),
            pong_payload: default_pong_payload(),
            bus_capacity: default_bus_capacity(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl ServerConfig {
    /// The bearer token, if one is set.
    pub fn token(&self) -> Option<&str> {
        let t = self.token.trim();
        if t.is_empty() {
            None
        } else {
            Some(t)
        }
    }

    /// REST request timeout.
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }
}

impl ChannelConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Reject settings the channel cannot run with.
    pub fn validate(&self) -> NoticeResult<()> {
        if self.base_delay_ms == 0 {
            return Err(NoticeError::Config("channel.base_delay_ms must be > 0".into()));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(NoticeError::Config(
                "channel.max_delay_ms must be >= channel.base_delay_ms".into(),
            ));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(NoticeError::Config(
                "channel.heartbeat_interval_ms must be > 0".into(),
            ));
        }
        if self.bus_capacity == 0 {
            return Err(NoticeError::Config("channel.bus_capacity must be > 0".into()));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> NoticeResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> NoticeResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.channel.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> NoticeResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| NoticeError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> NoticeResult<PathBuf> {
        Ok(Platform::config_dir()?.join("config.toml"))
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> NoticeResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Ok(Platform::data_dir()?.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Check whether the server origin is configured.
    pub fn is_server_configured(&self) -> bool {
        !self.server.origin.is_empty()
    }

    /// Sanitize and normalize a console origin.
    ///
    /// Ensures the origin has a scheme and strips quotes and trailing slashes.
    pub fn sanitize_origin(origin: &str) -> String {
        let trimmed = origin.trim().trim_matches('"').trim();
        if trimmed.is_empty() {
            return String::new();
        }

        let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        with_scheme.trim_end_matches('/').to_string()
    }
}

/// Thread-safe configuration holder for shared access.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
}

impl ConfigHandle {
    /// Create a new configuration handle.
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().await
    }

    /// Save the current configuration to the given path.
    pub async fn save_to(&self, path: &Path) -> NoticeResult<()> {
        let config = self.inner.read().await;
        config.save_to_file(path)
    }
}
