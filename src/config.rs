//! Production configuration system
//!
//! Provides centralized configuration management with:
//! - Environment variable support
//! - Config file loading (optional)
//! - Runtime defaults
//! - Validation and type safety
//!
//! The matching thresholds live here rather than as constants: they encode a
//! judgment call with no derivable correctness criterion, so operators can
//! tune them per deployment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Candidate matching thresholds
    pub matching: MatchingConfig,

    /// Paths configuration
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Max admissible distance between a run timestamp and a sizing record.
    pub max_age_hours: i64,
    /// Rank gap below which two same-tier candidates are indistinguishable.
    pub ambiguity_window_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the global canonical measurements store.
    pub sizing_home: PathBuf,
    pub log_directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "ERROR".to_string(),
                format: "pretty".to_string(),
                output: "console".to_string(),
            },
            matching: MatchingConfig {
                max_age_hours: 72,
                ambiguity_window_secs: 300,
            },
            paths: PathsConfig {
                sizing_home: dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".claude")
                    .join("sizing-data"),
                log_directory: PathBuf::from("logs"),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment, file, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file if it exists
        let config_paths = [
            PathBuf::from("ralph-backfill.toml"),
            PathBuf::from(".ralph-backfill.toml"),
            dirs::config_dir()
                .map(|d| d.join("ralph-backfill").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                info!(config_file = %path.display(), "Loading configuration from file");
                config = Self::load_from_file(path)?;
                break;
            }
        }

        // Override with environment variables
        config.apply_env_overrides()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Matching overrides
        if let Ok(val) = env::var("RALPH_BACKFILL_MAX_AGE_HOURS") {
            self.matching.max_age_hours =
                val.parse().context("Invalid RALPH_BACKFILL_MAX_AGE_HOURS")?;
        }
        if let Ok(val) = env::var("RALPH_BACKFILL_AMBIGUITY_WINDOW_SECS") {
            self.matching.ambiguity_window_secs = val
                .parse()
                .context("Invalid RALPH_BACKFILL_AMBIGUITY_WINDOW_SECS")?;
        }

        // Path overrides
        if let Ok(val) = env::var("RALPH_SIZING_DIR") {
            self.paths.sizing_home = PathBuf::from(val);
        }
        if let Ok(val) = env::var("RALPH_BACKFILL_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.matching.max_age_hours <= 0 {
            return Err(anyhow::anyhow!(
                "Max age hours must be greater than 0, got {}",
                self.matching.max_age_hours
            ));
        }

        if self.matching.ambiguity_window_secs < 0 {
            return Err(anyhow::anyhow!(
                "Ambiguity window cannot be negative, got {}",
                self.matching.ambiguity_window_secs
            ));
        }

        // The log directory only matters when file output is requested
        if self.logging.output != "console" && !self.paths.log_directory.exists() {
            fs::create_dir_all(&self.paths.log_directory)
                .context("Failed to create log directory")?;
        }

        Ok(())
    }
}

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration instance
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| Config::load().expect("Failed to load configuration"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "ERROR");
        assert_eq!(config.matching.max_age_hours, 72);
        assert_eq!(config.matching.ambiguity_window_secs, 300);
    }

    #[test]
    fn test_env_override() {
        env::set_var("RALPH_BACKFILL_MAX_AGE_HOURS", "48");
        let mut config = Config::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.matching.max_age_hours, 48);
        env::remove_var("RALPH_BACKFILL_MAX_AGE_HOURS");
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.matching.max_age_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[logging]
level = "DEBUG"
format = "json"
output = "console"

[matching]
max_age_hours = 24
ambiguity_window_secs = 120

[paths]
sizing_home = "/tmp/sizing"
log_directory = "/tmp/logs"
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.matching.max_age_hours, 24);
        assert_eq!(config.matching.ambiguity_window_secs, 120);
        assert_eq!(config.paths.sizing_home, PathBuf::from("/tmp/sizing"));
    }
}
