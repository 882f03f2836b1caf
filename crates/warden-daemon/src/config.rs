//! Configuration file management.
//!
//! Loaded once at startup and passed to the components that need it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_types::SECS_PER_DAY;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "WARDEN_DATA_DIR";

/// Environment variable overriding `api.token`.
pub const TOKEN_ENV: &str = "WARDEN_API_TOKEN";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Remote network API settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Maintenance schedule.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    /// Game-list discovery binary.
    #[serde(default)]
    pub gamelist: GameListConfig,
    /// Player name moderation.
    #[serde(default)]
    pub moderation: ModerationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Remote network API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API credential. Empty = reconciliation disabled.
    #[serde(default)]
    pub token: String,
    /// Network to reconcile. Empty = reconciliation disabled.
    #[serde(default)]
    pub network_id: String,
    /// Per-request timeout in seconds. Must be nonzero.
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

/// Maintenance schedule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    /// 0 = no periodic game-list scan.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    /// Sighting retention in days.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

/// Game-list discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameListConfig {
    /// Path to the discovery binary.
    #[serde(default = "default_gamelist_binary")]
    pub binary: String,
    /// How long to wait for the side file, in seconds. Must be nonzero.
    #[serde(default = "default_gamelist_timeout")]
    pub timeout_secs: u64,
}

/// Moderation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// File of banned words, one per line. Empty = none.
    #[serde(default)]
    pub banlist_file: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions

fn default_base_url() -> String {
    warden_ztapi::DEFAULT_BASE_URL.to_string()
}

fn default_api_timeout() -> u64 {
    10
}

fn default_reconcile_interval() -> u64 {
    300
}

fn default_cleanup_interval() -> u64 {
    3600
}

fn default_scan_interval() -> u64 {
    60
}

fn default_retention_days() -> u64 {
    14
}

fn default_gamelist_binary() -> String {
    "./build/devilutionx-gamelist".to_string()
}

fn default_gamelist_timeout() -> u64 {
    25
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            network_id: String::new(),
            timeout_secs: default_api_timeout(),
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: default_reconcile_interval(),
            cleanup_interval_secs: default_cleanup_interval(),
            scan_interval_secs: default_scan_interval(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for GameListConfig {
    fn default() -> Self {
        Self {
            binary: default_gamelist_binary(),
            timeout_secs: default_gamelist_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ApiConfig {
    /// Whether enough is configured to talk to the API.
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.network_id.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MaintenanceConfig {
    pub fn retention_secs(&self) -> u64 {
        self.retention_days.saturating_mul(SECS_PER_DAY)
    }
}

impl GameListConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DaemonConfig {
    /// Load configuration from `path`, or the default location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        let config = config.with_token_override(std::env::var(TOKEN_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every request or scan fail at once.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.api.timeout_secs > 0, "api.timeout_secs must be at least 1");
        anyhow::ensure!(
            self.gamelist.timeout_secs > 0,
            "gamelist.timeout_secs must be at least 1"
        );
        Ok(())
    }

    /// Replace the API token when an override is present and non-empty.
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.api.token = token;
        }
        self
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Database file inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("warden.db")
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Default data directory: `$WARDEN_DATA_DIR`, else `~/.warden`.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".warden"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/warden"))
    }
}
