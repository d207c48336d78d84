//! # Backend Selection
//!
//! Picks one [`PosStore`] implementation at startup from configuration.
//!
//! ```text
//!   BackendConfig.kind
//!        │
//!        ├── sqlite ──► sqlite_path set?  ──► Database (SQLite)
//!        ├── redis  ──► redis_url set?    ──► RedisStore
//!        ├── local  ──► local_path / data dir ──► LocalStore
//!        └── auto   ──► redis_url ? redis : sqlite_path ? sqlite : local
//!
//!   Missing setting or failed connection ──► NotConfiguredStore
//!   (reads empty, writes fail with NotConfigured)
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{DbError, DbResult};
use crate::local::LocalStore;
use crate::not_configured::NotConfiguredStore;
use crate::pool::{Database, DbConfig};
use crate::redis_store::RedisStore;
use crate::store::PosStore;

/// File name of the local store snapshot.
pub const LOCAL_STORE_FILE: &str = "kasir-store.json";

/// Requested backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// First configured of redis, sqlite, local.
    #[default]
    Auto,
    Sqlite,
    Redis,
    Local,
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendChoice::Auto => "auto",
            BackendChoice::Sqlite => "sqlite",
            BackendChoice::Redis => "redis",
            BackendChoice::Local => "local",
        })
    }
}

impl FromStr for BackendChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(BackendChoice::Auto),
            "sqlite" => Ok(BackendChoice::Sqlite),
            "redis" => Ok(BackendChoice::Redis),
            "local" => Ok(BackendChoice::Local),
            other => Err(format!(
                "unknown backend '{}' (expected auto, sqlite, redis, local)",
                other
            )),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendChoice,

    /// SQLite database file.
    pub sqlite_path: Option<PathBuf>,

    /// e.g. `redis://127.0.0.1:6379/0`
    pub redis_url: Option<String>,

    /// Local store snapshot file. Defaults to the platform data dir.
    pub local_path: Option<PathBuf>,

    /// Keep the local store in memory only.
    pub local_in_memory: bool,
}

impl BackendConfig {
    /// The backend `auto` resolves to.
    pub fn resolved_choice(&self) -> BackendChoice {
        match self.kind {
            BackendChoice::Auto if has_value(self.redis_url.as_deref()) => BackendChoice::Redis,
            BackendChoice::Auto if self.sqlite_path.is_some() => BackendChoice::Sqlite,
            BackendChoice::Auto => BackendChoice::Local,
            explicit => explicit,
        }
    }
}

fn has_value(s: Option<&str>) -> bool {
    s.map_or(false, |s| !s.trim().is_empty())
}

/// Default local snapshot path under the platform data directory.
///
/// `None` when the platform has no home directory.
pub fn default_local_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("id", "Kasir", "kasir-pos")
        .map(|dirs| dirs.data_dir().join(LOCAL_STORE_FILE))
}

/// Connects the configured backend.
///
/// Never fails: misconfiguration and connection errors are logged and
/// yield a [`NotConfiguredStore`].
pub async fn connect(config: &BackendConfig) -> Arc<dyn PosStore> {
    let choice = config.resolved_choice();

    match try_connect(config, choice).await {
        Ok(store) => {
            info!(backend = %store.backend(), "Data store ready");
            store
        }
        Err(DbError::NotConfigured) => {
            warn!(backend = %choice, "Backend selected but not configured");
            Arc::new(NotConfiguredStore::new(format!("{} backend is not configured", choice)))
        }
        Err(e) => {
            error!(backend = %choice, error = %e, "Failed to connect data store");
            Arc::new(NotConfiguredStore::new(format!("{} backend unavailable: {}", choice, e)))
        }
    }
}

/// Connects `choice`, surfacing every failure.
pub async fn try_connect(
    config: &BackendConfig,
    choice: BackendChoice,
) -> DbResult<Arc<dyn PosStore>> {
    let choice = match choice {
        BackendChoice::Auto => config.resolved_choice(),
        explicit => explicit,
    };

    match choice {
        BackendChoice::Sqlite => {
            let path = config.sqlite_path.clone().ok_or(DbError::NotConfigured)?;
            let db = Database::new(DbConfig::new(path)).await?;
            Ok(Arc::new(db))
        }
        BackendChoice::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .ok_or(DbError::NotConfigured)?;
            Ok(Arc::new(RedisStore::connect(url).await?))
        }
        BackendChoice::Local if config.local_in_memory => Ok(Arc::new(LocalStore::in_memory())),
        BackendChoice::Local => {
            let path = config
                .local_path
                .clone()
                .or_else(default_local_path)
                .ok_or(DbError::NotConfigured)?;
            Ok(Arc::new(LocalStore::open(path).await?))
        }
        // resolved_choice never yields Auto
        BackendChoice::Auto => Err(DbError::NotConfigured),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BackendKind;

    #[test]
    fn test_auto_resolution_order() {
        let mut config = BackendConfig::default();
        assert_eq!(config.resolved_choice(), BackendChoice::Local);

        config.sqlite_path = Some(PathBuf::from("/tmp/kasir.db"));
        assert_eq!(config.resolved_choice(), BackendChoice::Sqlite);

        config.redis_url = Some("redis://127.0.0.1".to_string());
        assert_eq!(config.resolved_choice(), BackendChoice::Redis);

        config.redis_url = Some("  ".to_string());
        assert_eq!(config.resolved_choice(), BackendChoice::Sqlite);

        config.kind = BackendChoice::Local;
        assert_eq!(config.resolved_choice(), BackendChoice::Local);
    }

    #[test]
    fn test_choice_parsing() {
        assert_eq!("Redis".parse::<BackendChoice>().unwrap(), BackendChoice::Redis);
        assert!("mongo".parse::<BackendChoice>().is_err());
    }

    #[tokio::test]
    async fn test_missing_setting_yields_not_configured() {
        let config = BackendConfig {
            kind: BackendChoice::Sqlite,
            ..Default::default()
        };
        let store = connect(&config).await;
        assert_eq!(store.backend(), BackendKind::NotConfigured);
    }

    #[tokio::test]
    async fn test_local_in_memory() {
        let config = BackendConfig {
            kind: BackendChoice::Local,
            local_in_memory: true,
            ..Default::default()
        };
        let store = connect(&config).await;
        assert_eq!(store.backend(), BackendKind::Local);
        assert!(store.health_check().await);
    }
}
