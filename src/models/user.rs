//! User data types

use serde::{Deserialize, Serialize};

/// Full user record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub score: i64,
    pub is_organizer: bool,
    pub created_at: String,
}

impl User {
    /// Role label for display
    pub fn role(&self) -> &'static str {
        if self.is_organizer {
            "organizer"
        } else {
            "player"
        }
    }
}

/// Account view shown to players: no credentials
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub score: i64,
    pub role: &'static str,
    pub created_at: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            score: user.score,
            role: user.role(),
            created_at: user.created_at.clone(),
        }
    }
}
