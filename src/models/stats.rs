//! Leaderboard and statistics types

use serde::Serialize;

use super::challenge::Category;

/// One leaderboard row
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub username: String,
    pub score: i64,
    pub solves: i64,
    pub created_at: String,
}

/// Per-challenge statistics
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeStats {
    pub challenge_id: i64,
    pub title: String,
    pub category: Category,
    pub points: i64,
    pub solves: i64,
    pub submissions: i64,
    pub attempting_users: i64,
    /// solvers / attempting users; None when nobody tried
    pub solve_rate: Option<f64>,
    pub first_solver: Option<String>,
}

/// Game-wide summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct GameSummary {
    pub players: i64,
    pub active_challenges: i64,
    pub total_points_available: i64,
    pub submissions: i64,
    pub correct_submissions: i64,
}

impl GameSummary {
    /// Share of submissions that were correct
    pub fn accuracy(&self) -> Option<f64> {
        if self.submissions > 0 {
            Some(self.correct_submissions as f64 / self.submissions as f64)
        } else {
            None
        }
    }
}
