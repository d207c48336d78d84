//! Kasir API configuration module.
//!
//! Configuration is layered, later sources winning:
//!
//! ```text
//!   built-in defaults
//!        ▼
//!   kasir.toml  (or the file named by KASIR_CONFIG)
//!        ▼
//!   KASIR__SECTION__KEY environment variables
//!        e.g. KASIR__SERVER__PORT=9000
//!             KASIR__BACKEND__REDIS_URL=redis://127.0.0.1:6379/0
//!             KASIR__STORE__CUTOFF_POLICY=carry_forward
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use kasir_core::{BusinessCalendar, CutoffPolicy};
use kasir_db::BackendConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "KASIR_CONFIG";

/// Config file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "kasir.toml";

/// Kasir API configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub backend: BackendConfig,
}

/// HTTP listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Business rules shared by every store served by this process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Minutes east of UTC. 420 = WIB.
    pub utc_offset_minutes: i32,

    pub cutoff_policy: CutoffPolicy,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            utc_offset_minutes: kasir_core::calendar::DEFAULT_UTC_OFFSET_MINUTES,
            cutoff_policy: CutoffPolicy::default(),
        }
    }
}

impl StoreSettings {
    pub fn calendar(&self) -> Result<BusinessCalendar, ConfigError> {
        BusinessCalendar::from_offset_minutes(self.utc_offset_minutes).map_err(|e| {
            ConfigError::InvalidValue {
                key: "store.utc_offset_minutes".to_string(),
                reason: e.to_string(),
            }
        })
    }
}

impl AppConfig {
    /// Loads from the config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_from(path, None)
    }

    /// Loads from an optional explicit file and an environment map.
    ///
    /// `env: None` reads the process environment.
    pub fn load_from(
        path: Option<PathBuf>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match &path {
            Some(path) => File::from(path.clone()).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: AppConfig = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("KASIR")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::MissingRequired("server.host".to_string()));
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.port".to_string(),
                reason: "must be between 1 and 65535".to_string(),
            });
        }

        self.store.calendar()?;
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

// =============================================================================
// Unit Tests
// =============================================================================
