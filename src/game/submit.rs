//! Flag submission
//!
//! A submission is evaluated and recorded in a single transaction: the
//! submission row, the progress upsert, the score update and any lockout
//! either all land or none do.

use chrono::{DateTime, Duration, Utc};

use crate::auth::constant_time_eq;
use crate::config::GameConfig;
use crate::db::{begin_write, queries, Database};
use crate::models::submission::SubmitOutcome;
use crate::models::{format_timestamp, parse_timestamp};
use crate::GameError;

/// Compare a submitted flag with the expected one.
///
/// Surrounding whitespace is ignored on both sides.
pub fn flags_match(submitted: &str, expected: &str, case_sensitive: bool) -> bool {
    let submitted = submitted.trim();
    let expected = expected.trim();
    if case_sensitive {
        constant_time_eq(submitted.as_bytes(), expected.as_bytes())
    } else {
        constant_time_eq(
            submitted.to_lowercase().as_bytes(),
            expected.to_lowercase().as_bytes(),
        )
    }
}

/// When a lockout starting at `now` ends
fn lockout_end(now: DateTime<Utc>, lockout_minutes: i64) -> Result<DateTime<Utc>, GameError> {
    Duration::try_minutes(lockout_minutes)
        .and_then(|length| now.checked_add_signed(length))
        .ok_or_else(|| {
            GameError::Config(format!(
                "game.lockout_minutes = {} is out of range",
                lockout_minutes
            ))
        })
}

/// Submit a flag for a challenge on behalf of a user
pub fn submit_flag(
    db: &Database,
    rules: &GameConfig,
    user_id: i64,
    challenge_id: i64,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<SubmitOutcome, GameError> {
    db.with_connection(|conn| {
        let tx = begin_write(conn)?;

        if queries::get_user_by_id(&tx, user_id)?.is_none() {
            return Err(GameError::UserNotFound(user_id.to_string()));
        }

        let challenge = queries::get_challenge(&tx, challenge_id, false)?
            .ok_or(GameError::ChallengeNotFound(challenge_id))?;

        if let Some(progress) = queries::get_progress(&tx, user_id, challenge_id)? {
            if progress.is_solved {
                return Err(GameError::AlreadySolved);
            }

            if let Some(raw) = progress.locked_until.as_deref() {
                match parse_timestamp(raw) {
                    Some(until) if until > now => {
                        return Err(GameError::Locked {
                            until: format_timestamp(until),
                        });
                    }
                    Some(_) => {
                        tracing::debug!(user_id, challenge_id, "Lockout expired, resetting attempts");
                        queries::reset_attempts(&tx, user_id, challenge_id)?;
                    }
                    None => {
                        tracing::warn!(user_id, challenge_id, raw, "Ignoring unparseable lockout timestamp");
                        queries::reset_attempts(&tx, user_id, challenge_id)?;
                    }
                }
            }
        }

        let correct = flags_match(submitted, &challenge.flag, rules.case_sensitive_flags);
        let now_text = format_timestamp(now);

        queries::insert_submission(&tx, user_id, challenge_id, submitted, correct, &now_text)?;
        let attempts = queries::record_attempt(
            &tx,
            user_id,
            challenge_id,
            correct.then_some(now_text.as_str()),
        )?;

        let outcome = if correct {
            queries::add_score(&tx, user_id, challenge.points)?;
            SubmitOutcome::Correct {
                points: challenge.points,
            }
        } else if challenge.has_attempt_limit() {
            if attempts >= challenge.max_attempts {
                let until = format_timestamp(lockout_end(now, rules.lockout_minutes)?);
                queries::set_locked_until(&tx, user_id, challenge_id, Some(&until))?;
                SubmitOutcome::LockedOut { until }
            } else {
                SubmitOutcome::Incorrect {
                    attempts_left: Some(challenge.max_attempts - attempts),
                }
            }
        } else {
            SubmitOutcome::Incorrect { attempts_left: None }
        };

        tx.commit()?;

        tracing::info!(
            user_id,
            challenge_id,
            correct,
            attempts,
            "Flag submitted"
        );

        Ok(outcome)
    })
}
