//! Configuration handling for minictf
//!
//! Settings come from an optional TOML file. Every section falls back to its
//! defaults, and command-line flags override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::GameError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database location and seeding
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Submission rules
    #[serde(default)]
    pub game: GameConfig,

    /// Account rules
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Insert the starter challenges into an empty catalogue on `init`
    #[serde(default = "default_true")]
    pub seed_sample_challenges: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            seed_sample_challenges: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// How long a challenge stays locked after the last allowed wrong attempt
    #[serde(default = "default_lockout_minutes")]
    pub lockout_minutes: i64,

    /// Compare flags case-sensitively
    #[serde(default = "default_true")]
    pub case_sensitive_flags: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            lockout_minutes: default_lockout_minutes(),
            case_sensitive_flags: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_length: default_min_password_length(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter used when neither -v nor RUST_LOG is given
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One year
pub const MAX_LOCKOUT_MINUTES: i64 = 365 * 24 * 60;

fn default_true() -> bool {
    true
}

fn default_lockout_minutes() -> i64 {
    15
}

fn default_min_password_length() -> usize {
    6
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, GameError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, GameError> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(GameError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    /// Reject values that would make the game unplayable
    pub fn validate(&self) -> Result<(), GameError> {
        if !(0..=MAX_LOCKOUT_MINUTES).contains(&self.game.lockout_minutes) {
            return Err(GameError::Config(format!(
                "game.lockout_minutes must be between 0 and {}",
                MAX_LOCKOUT_MINUTES
            )));
        }
        if self.auth.min_password_length == 0 {
            return Err(GameError::Config(
                "auth.min_password_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Database path from the config, falling back to the platform default
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(crate::db::default_db_path)
    }
}

/// `<config_dir>/minictf/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("minictf").join("config.toml"))
}
