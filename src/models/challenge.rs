//! Challenge data types
//!
//! Types representing challenges in the catalogue, plus the validated
//! input used to author new ones.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::GameError;

/// Challenge category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Web,
    Crypto,
    Forensics,
    Reverse,
    Pwn,
    Osint,
    Misc,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Web,
        Category::Crypto,
        Category::Forensics,
        Category::Reverse,
        Category::Pwn,
        Category::Osint,
        Category::Misc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Web => "web",
            Category::Crypto => "crypto",
            Category::Forensics => "forensics",
            Category::Reverse => "reverse",
            Category::Pwn => "pwn",
            Category::Osint => "osint",
            Category::Misc => "misc",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                GameError::Validation(format!(
                    "Invalid category: {}. Use one of: web, crypto, forensics, reverse, pwn, osint, misc",
                    s
                ))
            })
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

// Databases written by older tools may hold free-form categories
impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Ok(raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown challenge category {:?}, treating as misc", raw);
            Category::Misc
        }))
    }
}

/// Full challenge record, including the flag
#[derive(Debug, Clone, Serialize)]
pub struct Challenge {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(skip_serializing)]
    pub flag: String,
    pub points: i64,
    /// -1 means unlimited
    pub max_attempts: i64,
    pub is_active: bool,
    pub created_at: String,
}

impl Challenge {
    pub fn has_attempt_limit(&self) -> bool {
        self.max_attempts > 0
    }
}

/// Player-facing challenge view with the caller's solve state
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeSummary {
    pub id: i64,
    pub title: String,
    pub category: Category,
    pub points: i64,
    pub max_attempts: i64,
    pub solves: i64,
    pub solved_by_me: bool,
}

/// Challenge pack entry and organizer input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChallenge {
    pub title: String,
    pub description: String,
    pub category: String,
    pub flag: String,
    pub points: i64,
    #[serde(default = "unlimited_attempts")]
    pub max_attempts: i64,
}

fn unlimited_attempts() -> i64 {
    -1
}

/// A `NewChallenge` that passed validation
#[derive(Debug, Clone)]
pub struct ValidChallenge {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub flag: String,
    pub points: i64,
    pub max_attempts: i64,
}

impl NewChallenge {
    /// Check every field and normalize whitespace
    pub fn validate(&self) -> Result<ValidChallenge, GameError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(GameError::Validation("Challenge title is required".to_string()));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(GameError::Validation(format!(
                "Challenge '{}' needs a description",
                title
            )));
        }
        let flag = self.flag.trim();
        if flag.is_empty() {
            return Err(GameError::Validation(format!("Challenge '{}' needs a flag", title)));
        }
        if self.points <= 0 {
            return Err(GameError::Validation(format!(
                "Challenge '{}' must be worth a positive number of points",
                title
            )));
        }
        if self.max_attempts != -1 && self.max_attempts < 1 {
            return Err(GameError::Validation(format!(
                "Challenge '{}': max_attempts must be -1 (unlimited) or at least 1",
                title
            )));
        }

        Ok(ValidChallenge {
            title: title.to_string(),
            description: description.to_string(),
            category: self.category.parse()?,
            flag: flag.to_string(),
            points: self.points,
            max_attempts: self.max_attempts,
        })
    }
}

/// Builder for creating challenge input
pub struct ChallengeBuilder {
    challenge: NewChallenge,
}

impl ChallengeBuilder {
    /// Create a new challenge builder
    pub fn new(title: &str, flag: &str, points: i64) -> Self {
        Self {
            challenge: NewChallenge {
                title: title.to_string(),
                description: title.to_string(),
                category: Category::Misc.as_str().to_string(),
                flag: flag.to_string(),
                points,
                max_attempts: unlimited_attempts(),
            },
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.challenge.description = description.to_string();
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.challenge.category = category.as_str().to_string();
        self
    }

    pub fn max_attempts(mut self, max_attempts: i64) -> Self {
        self.challenge.max_attempts = max_attempts;
        self
    }

    pub fn build(self) -> NewChallenge {
        self.challenge
    }
}
