//! Configuration management for safestep.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::trip::{DEFAULT_TOTAL_STEPS, MAX_TOTAL_STEPS};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "safestep";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "trips.db";

/// Default socket file name.
const SOCKET_FILE_NAME: &str = "safestep.sock";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SAFESTEP_`, `__` between levels)
/// 2. TOML config file at `~/.config/safestep/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Trip defaults and view limits.
    pub trips: TripConfig,
    /// Daemon configuration.
    pub daemon: DaemonConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/safestep/trips.db`
    pub database_path: Option<PathBuf>,
    /// Keep everything in memory; nothing survives the process.
    pub in_memory: bool,
    /// Seed sample contacts, destinations and a finished trip into an empty
    /// database.
    pub seed_sample_data: bool,
}

/// Trip-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripConfig {
    /// Step count for trips started without one.
    pub default_total_steps: u32,
    /// Largest step count a trip may be started with.
    pub max_total_steps: u32,
    /// History length when the caller gives no limit.
    pub history_limit: usize,
    /// Recent-destination count when the caller gives no limit.
    pub recent_destinations_limit: usize,
}

/// Daemon-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Path to the Unix socket for IPC.
    /// Defaults to `~/.local/share/safestep/safestep.sock`
    pub socket_path: Option<PathBuf>,
    /// Longest request line the daemon accepts, in bytes.
    pub max_request_bytes: usize,
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            default_total_steps: DEFAULT_TOTAL_STEPS,
            max_total_steps: MAX_TOTAL_STEPS,
            history_limit: 10,
            recent_destinations_limit: 4,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: None, // Will be resolved to default at runtime
            max_request_bytes: 64 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SAFESTEP_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.trips.default_total_steps == 0 {
            return Err(Error::ConfigValidation {
                message: "default_total_steps must be greater than 0".to_string(),
            });
        }

        if self.trips.default_total_steps > self.trips.max_total_steps {
            return Err(Error::ConfigValidation {
                message: format!(
                    "default_total_steps ({}) must not exceed max_total_steps ({})",
                    self.trips.default_total_steps, self.trips.max_total_steps
                ),
            });
        }

        if self.daemon.max_request_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "max_request_bytes must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the socket path, resolving defaults if not set.
    #[must_use]
    pub fn socket_path(&self) -> PathBuf {
        self.daemon
            .socket_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SOCKET_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(!config.storage.in_memory);
        assert!(!config.storage.seed_sample_data);
        assert_eq!(config.trips.default_total_steps, 5);
        assert_eq!(config.trips.max_total_steps, 100);
        assert_eq!(config.trips.history_limit, 10);
        assert_eq!(config.trips.recent_destinations_limit, 4);
    }

    #[test]
    fn test_default_daemon_config() {
        let daemon = DaemonConfig::default();

        assert!(daemon.socket_path.is_none());
        assert_eq!(daemon.max_request_bytes, 65_536);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_total_steps() {
        let mut config = Config::default();
        config.trips.default_total_steps = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("default_total_steps"));
    }

    #[test]
    fn test_validate_default_steps_above_max() {
        let mut config = Config::default();
        config.trips.max_total_steps = 4;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_total_steps"));
    }

    #[test]
    fn test_validate_zero_request_size() {
        let mut config = Config::default();
        config.daemon.max_request_bytes = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_request_bytes"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("trips.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_socket_path_default() {
        let config = Config::default();
        let path = config.socket_path();

        assert!(path.to_string_lossy().contains("safestep.sock"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("safestep"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "safestep_config_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "[trips]\ndefault_total_steps = 8\nmax_total_steps = 20\n\n\
             [storage]\nin_memory = true\n\n\
             [daemon]\nmax_request_bytes = 1024\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.trips.default_total_steps, 8);
        assert_eq!(config.trips.max_total_steps, 20);
        assert!(config.storage.in_memory);
        assert_eq!(config.daemon.max_request_bytes, 1024);
        assert_eq!(config.trips.history_limit, 10);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "safestep_config_invalid_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[trips]\ndefault_total_steps = 0\n").unwrap();

        let err = Config::load_from(Some(path.clone())).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_trip_config_deserialize() {
        let json = r#"{"history_limit": 25}"#;
        let trips: TripConfig = serde_json::from_str(json).unwrap();
        assert_eq!(trips.history_limit, 25);
        assert_eq!(trips.default_total_steps, 5);
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        let cloned = config.clone();
        assert_eq!(config, cloned);
    }
}
