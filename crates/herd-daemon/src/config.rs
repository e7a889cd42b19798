//! Configuration file management.
//!
//! `$HERD_DATA_DIR/config.toml`, with defaults for anything missing.

use std::path::PathBuf;
use std::time::Duration;

use herd_settlement::workflow::{
    WorkflowConfig, DEFAULT_BOOKKEEPING_RETRIES, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_RETRY_BACKOFF,
};
use herd_types::Identity;
use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Settlement workflow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Identity receiving the platform share.
    #[serde(default = "default_platform_identity")]
    pub platform_identity: String,
    /// Certificate/record retries after the first attempt.
    #[serde(default = "default_bookkeeping_retries")]
    pub bookkeeping_retries: u32,
    /// Base delay between retries; retry `n` waits `n * retry_backoff_ms`.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// How long to wait for payment confirmation before reconciling.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

/// Admin authorization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Identities allowed to call mutating methods. Merged with
    /// `HERD_ADMIN_WHITELIST`.
    #[serde(default)]
    pub authorized_identities: Vec<String>,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_platform_identity() -> String {
    "PLATFORM".to_string()
}

fn default_bookkeeping_retries() -> u32 {
    DEFAULT_BOOKKEEPING_RETRIES
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF.as_millis() as u64
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT.as_secs()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            platform_identity: default_platform_identity(),
            bookkeeping_retries: default_bookkeeping_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl SettlementConfig {
    pub fn workflow(&self) -> WorkflowConfig {
        WorkflowConfig {
            platform: Identity::new(self.platform_identity.clone()),
            bookkeeping_retries: self.bookkeeping_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        if config.settlement.platform_identity.trim().is_empty() {
            anyhow::bail!("settlement.platform_identity must not be empty");
        }
        Ok(config)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Default `tracing` directive for the `herd` crates.
    pub fn log_directive(&self) -> String {
        format!("herd={}", self.advanced.log_level)
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("HERD_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Herd")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".herd")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/herd"))
}
