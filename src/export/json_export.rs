//! JSON export functionality
//!
//! Provides JSON serialization for the leaderboard and submission log
//! with export metadata and a summary block.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use super::{ExportableLeaderboardEntry, ExportableSubmission};
use crate::GameError;

/// Leaderboard export structure
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardExportJson {
    pub export_date: String,
    pub export_version: &'static str,
    pub total_players: usize,
    pub entries: Vec<ExportableLeaderboardEntry>,
    pub summary: LeaderboardSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardSummary {
    pub top_score: i64,
    pub total_points_awarded: i64,
    pub avg_score: f64,
}

/// Submission log export structure
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionsExportJson {
    pub export_date: String,
    pub export_version: &'static str,
    pub total_submissions: usize,
    pub submissions: Vec<ExportableSubmission>,
    pub summary: SubmissionsSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionsSummary {
    pub correct: usize,
    pub incorrect: usize,
    pub distinct_users: usize,
    /// First and last submission timestamps
    pub date_range: Option<(String, String)>,
}

const EXPORT_VERSION: &str = "1.0.0";

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), GameError> {
    let json = serde_json::to_string_pretty(value)?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Write the leaderboard to JSON format
pub fn write_leaderboard_json(
    entries: &[ExportableLeaderboardEntry],
    path: &Path,
) -> Result<(), GameError> {
    let total_points_awarded: i64 = entries.iter().map(|e| e.score).sum();
    let summary = LeaderboardSummary {
        top_score: entries.iter().map(|e| e.score).max().unwrap_or(0),
        total_points_awarded,
        avg_score: if entries.is_empty() {
            0.0
        } else {
            total_points_awarded as f64 / entries.len() as f64
        },
    };

    let export = LeaderboardExportJson {
        export_date: chrono::Utc::now().to_rfc3339(),
        export_version: EXPORT_VERSION,
        total_players: entries.len(),
        entries: entries.to_vec(),
        summary,
    };

    write_json(&export, path)
}

/// Write submissions to JSON format
pub fn write_submissions_json(
    submissions: &[ExportableSubmission],
    path: &Path,
) -> Result<(), GameError> {
    let correct = submissions.iter().filter(|s| s.is_correct).count();

    let mut users: Vec<&str> = submissions.iter().map(|s| s.username.as_str()).collect();
    users.sort_unstable();
    users.dedup();

    let first = submissions.iter().map(|s| s.submitted_at.as_str()).min();
    let last = submissions.iter().map(|s| s.submitted_at.as_str()).max();
    let date_range = match (first, last) {
        (Some(first), Some(last)) => Some((first.to_string(), last.to_string())),
        _ => None,
    };

    let export = SubmissionsExportJson {
        export_date: chrono::Utc::now().to_rfc3339(),
        export_version: EXPORT_VERSION,
        total_submissions: submissions.len(),
        submissions: submissions.to_vec(),
        summary: SubmissionsSummary {
            correct,
            incorrect: submissions.len() - correct,
            distinct_users: users.len(),
            date_range,
        },
    };

    write_json(&export, path)
}
