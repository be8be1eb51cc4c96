//! Submission and progress data types

use serde::Serialize;

/// A recorded flag attempt, joined with user and challenge names
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub challenge_id: i64,
    pub challenge_title: String,
    pub submitted_flag: String,
    pub is_correct: bool,
    pub submitted_at: String,
}

/// Raw `user_challenge_progress` row
#[derive(Debug, Clone, Default)]
pub struct ProgressRow {
    pub is_solved: bool,
    pub attempts_count: i64,
    pub solved_at: Option<String>,
    pub locked_until: Option<String>,
}

/// Result of a flag submission that was evaluated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Correct {
        points: i64,
    },
    Incorrect {
        /// None when the challenge allows unlimited attempts
        attempts_left: Option<i64>,
    },
    /// This attempt was wrong and used up the last allowed try
    LockedOut {
        until: String,
    },
}

impl SubmitOutcome {
    pub fn is_correct(&self) -> bool {
        matches!(self, SubmitOutcome::Correct { .. })
    }

    /// Player-facing message
    pub fn message(&self) -> String {
        match self {
            SubmitOutcome::Correct { points } => {
                format!("Correct! You earned {} points!", points)
            }
            SubmitOutcome::Incorrect { attempts_left: None } => {
                "Incorrect flag. Try again!".to_string()
            }
            SubmitOutcome::Incorrect {
                attempts_left: Some(left),
            } => format!("Incorrect flag. {} attempt(s) left.", left),
            SubmitOutcome::LockedOut { until } => {
                format!("Incorrect flag. Out of attempts, locked until {}.", until)
            }
        }
    }
}

/// A solved challenge in a player's progress report
#[derive(Debug, Clone, Serialize)]
pub struct SolvedChallenge {
    pub challenge_id: i64,
    pub title: String,
    pub points: i64,
    pub solved_at: Option<String>,
}

/// An attempted but unsolved challenge
#[derive(Debug, Clone, Serialize)]
pub struct AttemptedChallenge {
    pub challenge_id: i64,
    pub title: String,
    pub attempts: i64,
    pub max_attempts: i64,
    pub locked_until: Option<String>,
}

/// Player progress report
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub username: String,
    pub score: i64,
    pub solved: Vec<SolvedChallenge>,
    pub attempted: Vec<AttemptedChallenge>,
}

impl Progress {
    pub fn solved_count(&self) -> usize {
        self.solved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_messages() {
        assert_eq!(
            SubmitOutcome::Correct { points: 50 }.message(),
            "Correct! You earned 50 points!"
        );
        assert_eq!(
            SubmitOutcome::Incorrect { attempts_left: None }.message(),
            "Incorrect flag. Try again!"
        );
        assert!(SubmitOutcome::Incorrect { attempts_left: Some(2) }
            .message()
            .contains("2 attempt(s) left"));
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let json = serde_json::to_string(&SubmitOutcome::Correct { points: 10 }).unwrap();
        assert_eq!(json, r#"{"result":"correct","points":10}"#);

        let json = serde_json::to_string(&SubmitOutcome::LockedOut {
            until: "2026-02-05T10:15:00+00:00".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"result\":\"locked_out\""));
    }
}
