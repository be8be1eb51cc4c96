//! Mini CTF - offline Capture The Flag game
//!
//! This library provides the engine behind the `minictf` binary.
//! It handles:
//! - SQLite storage for users, challenges, submissions and progress
//! - Account registration and password verification
//! - Flag submission with attempt limits and temporary lockouts
//! - Leaderboard, statistics and CSV/JSON export

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod export;
pub mod game;
pub mod models;
pub mod ui;

/// Error type for game operations
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Password must be at least {0} characters long")]
    WeakPassword(usize),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Challenge not found: {0}")]
    ChallengeNotFound(i64),

    #[error("Challenge already solved")]
    AlreadySolved,

    #[error("Too many incorrect attempts, locked until {until}")]
    Locked { until: String },

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for GameError {
    fn from(err: rusqlite::Error) -> Self {
        GameError::Database(db::DbError::Sqlite(err))
    }
}

impl GameError {
    /// Errors caused by player input rather than the environment.
    ///
    /// The interactive game reports these and keeps running.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            GameError::Database(_)
                | GameError::Io(_)
                | GameError::Json(_)
                | GameError::Csv(_)
                | GameError::Toml(_)
                | GameError::Config(_)
        )
    }
}

// JSON output mode reports errors as plain strings
impl serde::Serialize for GameError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
