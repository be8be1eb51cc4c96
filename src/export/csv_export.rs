//! CSV export functionality
//!
//! Provides CSV serialization for the leaderboard and submission log.

use std::path::Path;

use csv::Writer;
use serde::Serialize;

use super::{ExportableLeaderboardEntry, ExportableSubmission};
use crate::GameError;

fn write_records<T: Serialize>(records: &[T], path: &Path) -> Result<(), GameError> {
    let file = std::fs::File::create(path)?;
    let mut writer = Writer::from_writer(file);

    // Write headers and data
    for record in records {
        writer.serialize(record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the leaderboard to CSV format
pub fn write_leaderboard_csv(
    entries: &[ExportableLeaderboardEntry],
    path: &Path,
) -> Result<(), GameError> {
    write_records(entries, path)?;
    tracing::info!("Wrote {} leaderboard rows to {}", entries.len(), path.display());
    Ok(())
}

/// Write submissions to CSV format
pub fn write_submissions_csv(
    submissions: &[ExportableSubmission],
    path: &Path,
) -> Result<(), GameError> {
    write_records(submissions, path)?;
    tracing::info!("Wrote {} submissions to {}", submissions.len(), path.display());
    Ok(())
}
