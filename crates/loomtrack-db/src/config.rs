//! # Engine Configuration
//!
//! Settings for the database and the overproduction policy.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     LOOMTRACK_DB_PATH=/var/lib/loomtrack/loomtrack.db                  │
//! │     LOOMTRACK_DB_MAX_CONNECTIONS=8                                     │
//! │     OVERPRODUCTION_TOLERANCE_PERCENT=2                                 │
//! │     AUTO_ACCEPT_OVERPRODUCTION=true                                    │
//! │                                                                         │
//! │  2. TOML Config File (path given by the caller)                        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     tolerance 2%, auto-accept off, ./loomtrack.db                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/loomtrack/loomtrack.db"
//! max_connections = 8
//! busy_timeout_secs = 10
//!
//! [overproduction]
//! tolerance_percent = 2.0
//! auto_accept_within_tolerance = false
//! ```

use loomtrack_core::OverproductionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

fn default_db_path() -> PathBuf {
    PathBuf::from("loomtrack.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_secs() -> u64 {
    10
}

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for a beam lock before the operation fails.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub overproduction: OverproductionPolicy,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file, when given and present
    /// 3. Environment variables
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) if path.exists() => {
                info!(?path, "Loading engine config from file");
                Self::from_toml(&std::fs::read_to_string(path)?)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; missing sections take their defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies overrides from a key lookup (the process environment in
    /// [`EngineConfig::load`]).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("LOOMTRACK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("LOOMTRACK_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring non-numeric LOOMTRACK_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(pct) = lookup("OVERPRODUCTION_TOLERANCE_PERCENT") {
            match pct.parse::<f64>() {
                Ok(p) => self.overproduction.tolerance_percent = p,
                Err(_) => warn!(value = %pct, "Ignoring non-numeric OVERPRODUCTION_TOLERANCE_PERCENT"),
            }
        }

        // Only the exact string "true" enables auto-accept.
        if let Some(flag) = lookup("AUTO_ACCEPT_OVERPRODUCTION") {
            self.overproduction.auto_accept_within_tolerance = flag == "true";
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let pct = self.overproduction.tolerance_percent;
        if !pct.is_finite() || pct < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tolerance_percent must be a non-negative number, got {}",
                pct
            )));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Database pool settings derived from the `[database]` section.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
    }

    pub fn policy(&self) -> OverproductionPolicy {
        self.overproduction
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.overproduction.tolerance_percent, 2.0);
        assert!(!config.overproduction.auto_accept_within_tolerance);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml(
            r#"
            [overproduction]
            auto_accept_within_tolerance = true
            "#,
        )
        .unwrap();
        assert!(config.overproduction.auto_accept_within_tolerance);
        assert_eq!(config.overproduction.tolerance_percent, 2.0);
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::default();
        config.apply_overrides(env(&[
            ("OVERPRODUCTION_TOLERANCE_PERCENT", "5"),
            ("AUTO_ACCEPT_OVERPRODUCTION", "true"),
            ("LOOMTRACK_DB_PATH", "/tmp/x.db"),
            ("LOOMTRACK_DB_MAX_CONNECTIONS", "9"),
        ]));
        assert_eq!(config.overproduction.tolerance_percent, 5.0);
        assert!(config.overproduction.auto_accept_within_tolerance);
        assert_eq!(config.database.path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.database.max_connections, 9);
    }

    #[test]
    fn test_auto_accept_needs_exact_true() {
        let mut config = EngineConfig::default();
        config.apply_overrides(env(&[("AUTO_ACCEPT_OVERPRODUCTION", "TRUE")]));
        assert!(!config.overproduction.auto_accept_within_tolerance);

        config.apply_overrides(env(&[("OVERPRODUCTION_TOLERANCE_PERCENT", "abc")]));
        assert_eq!(config.overproduction.tolerance_percent, 2.0);
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let mut config = EngineConfig::default();
        config.overproduction.tolerance_percent = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = EngineConfig::load(Some(Path::new("/nonexistent/loomtrack.toml")));
        assert!(config.is_ok());
    }
}
