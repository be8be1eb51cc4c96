//! Export module for CSV and JSON export functionality
//!
//! Exports the leaderboard and the submission log in CSV and JSON formats.

pub mod csv_export;
pub mod json_export;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::stats::LeaderboardEntry;
use crate::models::submission::Submission;
use crate::GameError;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(GameError::Validation(format!(
                "Invalid export format: {}. Use 'csv' or 'json'",
                s
            ))),
        }
    }
}

impl ExportFormat {
    /// Get file extension for format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Exportable leaderboard row for CSV/JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportableLeaderboardEntry {
    pub rank: u32,
    pub username: String,
    pub score: i64,
    pub solves: i64,
    pub registered_at: String,
}

impl From<&LeaderboardEntry> for ExportableLeaderboardEntry {
    fn from(entry: &LeaderboardEntry) -> Self {
        Self {
            rank: entry.rank,
            username: entry.username.clone(),
            score: entry.score,
            solves: entry.solves,
            registered_at: entry.created_at.clone(),
        }
    }
}

/// Exportable submission record for CSV/JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportableSubmission {
    pub submission_id: i64,
    pub submitted_at: String,
    pub username: String,
    pub challenge_id: i64,
    pub challenge_title: String,
    pub submitted_flag: String,
    pub is_correct: bool,
}

impl From<&Submission> for ExportableSubmission {
    fn from(submission: &Submission) -> Self {
        Self {
            submission_id: submission.id,
            submitted_at: submission.submitted_at.clone(),
            username: submission.username.clone(),
            challenge_id: submission.challenge_id,
            challenge_title: submission.challenge_title.clone(),
            submitted_flag: crate::ui::truncate_text(&submission.submitted_flag, 100),
            is_correct: submission.is_correct,
        }
    }
}

/// Get the default export directory (Downloads folder or temp dir)
pub fn get_export_directory() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::document_dir)
        .unwrap_or_else(std::env::temp_dir)
}

/// Generate a timestamped filename for exports
pub fn generate_export_filename(prefix: &str, extension: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.{}", prefix, timestamp, extension)
}

/// Resolve where an export goes: the requested path or a fresh timestamped file
pub fn resolve_export_path(output: Option<&Path>, prefix: &str, format: ExportFormat) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => get_export_directory().join(generate_export_filename(prefix, format.extension())),
    }
}

/// Write the leaderboard in the requested format
pub fn export_leaderboard(
    entries: &[LeaderboardEntry],
    format: ExportFormat,
    path: &Path,
) -> Result<(), GameError> {
    let rows: Vec<ExportableLeaderboardEntry> = entries.iter().map(Into::into).collect();
    match format {
        ExportFormat::Csv => csv_export::write_leaderboard_csv(&rows, path),
        ExportFormat::Json => json_export::write_leaderboard_json(&rows, path),
    }
}

/// Write the submission log in the requested format
pub fn export_submissions(
    submissions: &[Submission],
    format: ExportFormat,
    path: &Path,
) -> Result<(), GameError> {
    let rows: Vec<ExportableSubmission> = submissions.iter().map(Into::into).collect();
    match format {
        ExportFormat::Csv => csv_export::write_submissions_csv(&rows, path),
        ExportFormat::Json => json_export::write_submissions_json(&rows, path),
    }
}
