//! Database query implementations
//!
//! Contains functions for querying users, challenges, submissions,
//! progress, the leaderboard and per-challenge statistics.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DbError;
use crate::models::challenge::{Challenge, ChallengeSummary, ValidChallenge};
use crate::models::stats::{GameSummary, LeaderboardEntry};
use crate::models::submission::{AttemptedChallenge, ProgressRow, SolvedChallenge, Submission};
use crate::models::user::User;

/// Raw per-challenge counters; the solve rate is derived in `game::stats`
#[derive(Debug, Clone)]
pub struct ChallengeCounters {
    pub challenge: Challenge,
    pub solves: i64,
    pub submissions: i64,
    pub attempting_users: i64,
    pub first_solver: Option<String>,
}

// ============================================================================
// Users
// ============================================================================

const USER_COLUMNS: &str = "id, username, password_hash, score, is_organizer, created_at";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        score: row.get(3)?,
        is_organizer: row.get::<_, i32>(4)? == 1,
        created_at: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
    })
}

/// Insert a user, returning the new id
pub fn insert_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    is_organizer: bool,
    created_at: &str,
) -> Result<i64, DbError> {
    conn.execute(
        r#"
        INSERT INTO users (username, password_hash, is_organizer, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![username, password_hash, if is_organizer { 1 } else { 0 }, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get a user by exact username
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>, DbError> {
    let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
    let user = conn
        .query_row(&sql, params![username], row_to_user)
        .optional()?;
    Ok(user)
}

/// Get a user by id
pub fn get_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>, DbError> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    let user = conn.query_row(&sql, params![user_id], row_to_user).optional()?;
    Ok(user)
}

/// Replace a user's stored password hash
pub fn update_password_hash(conn: &Connection, user_id: i64, password_hash: &str) -> Result<(), DbError> {
    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, user_id],
    )?;
    Ok(())
}

/// Grant or revoke the organizer role. Returns false for unknown users.
pub fn set_organizer(conn: &Connection, username: &str, is_organizer: bool) -> Result<bool, DbError> {
    let changed = conn.execute(
        "UPDATE users SET is_organizer = ?1 WHERE username = ?2",
        params![if is_organizer { 1 } else { 0 }, username],
    )?;
    Ok(changed > 0)
}

/// Number of accounts holding the organizer role
pub fn count_organizers(conn: &Connection) -> Result<i64, DbError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE is_organizer = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Add points to a user's score
pub fn add_score(conn: &Connection, user_id: i64, points: i64) -> Result<(), DbError> {
    conn.execute(
        "UPDATE users SET score = score + ?1 WHERE id = ?2",
        params![points, user_id],
    )?;
    Ok(())
}

// ============================================================================
// Challenges
// ============================================================================

const CHALLENGE_COLUMNS: &str =
    "id, title, description, category, flag, points, max_attempts, is_active, created_at";

fn row_to_challenge(row: &Row<'_>) -> rusqlite::Result<Challenge> {
    Ok(Challenge {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        flag: row.get(4)?,
        points: row.get(5)?,
        max_attempts: row.get::<_, Option<i64>>(6)?.unwrap_or(-1),
        is_active: row.get::<_, i32>(7)? == 1,
        created_at: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
    })
}

/// Insert a validated challenge, returning the new id
pub fn insert_challenge(
    conn: &Connection,
    challenge: &ValidChallenge,
    created_at: &str,
) -> Result<i64, DbError> {
    conn.execute(
        r#"
        INSERT INTO challenges (title, description, category, flag, points, max_attempts, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            challenge.title,
            challenge.description,
            challenge.category,
            challenge.flag,
            challenge.points,
            challenge.max_attempts,
            created_at
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get a challenge by id.
///
/// Inactive challenges are only returned when `include_inactive` is set.
pub fn get_challenge(
    conn: &Connection,
    challenge_id: i64,
    include_inactive: bool,
) -> Result<Option<Challenge>, DbError> {
    let sql = if include_inactive {
        format!("SELECT {} FROM challenges WHERE id = ?1", CHALLENGE_COLUMNS)
    } else {
        format!(
            "SELECT {} FROM challenges WHERE id = ?1 AND is_active = 1",
            CHALLENGE_COLUMNS
        )
    };
    let challenge = conn
        .query_row(&sql, params![challenge_id], row_to_challenge)
        .optional()?;
    Ok(challenge)
}

/// List active challenges ordered by points, with solve counts.
///
/// `viewer` marks which challenges that user has already solved.
pub fn list_challenges(
    conn: &Connection,
    viewer: Option<i64>,
) -> Result<Vec<ChallengeSummary>, DbError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT
            c.id,
            c.title,
            c.category,
            c.points,
            COALESCE(c.max_attempts, -1),
            (SELECT COUNT(*) FROM user_challenge_progress p
                WHERE p.challenge_id = c.id AND p.is_solved = 1) AS solves,
            EXISTS(SELECT 1 FROM user_challenge_progress p
                WHERE p.challenge_id = c.id AND p.user_id = ?1 AND p.is_solved = 1) AS mine
        FROM challenges c
        WHERE c.is_active = 1
        ORDER BY c.points ASC, c.id ASC
        "#,
    )?;

    let challenges = stmt
        .query_map(params![viewer], |row| {
            Ok(ChallengeSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                category: row.get(2)?,
                points: row.get(3)?,
                max_attempts: row.get(4)?,
                solves: row.get(5)?,
                solved_by_me: row.get::<_, i32>(6)? == 1,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(challenges)
}

/// Activate or retire a challenge. Returns false for unknown ids.
pub fn set_challenge_active(conn: &Connection, challenge_id: i64, active: bool) -> Result<bool, DbError> {
    let changed = conn.execute(
        "UPDATE challenges SET is_active = ?1 WHERE id = ?2",
        params![if active { 1 } else { 0 }, challenge_id],
    )?;
    Ok(changed > 0)
}

// ============================================================================
// Submissions and progress
// ============================================================================

/// Get the progress row for a user/challenge pair
pub fn get_progress(
    conn: &Connection,
    user_id: i64,
    challenge_id: i64,
) -> Result<Option<ProgressRow>, DbError> {
    let progress = conn
        .query_row(
            r#"
            SELECT is_solved, attempts_count, solved_at, locked_until
            FROM user_challenge_progress
            WHERE user_id = ?1 AND challenge_id = ?2
            "#,
            params![user_id, challenge_id],
            |row| {
                Ok(ProgressRow {
                    is_solved: row.get::<_, Option<i32>>(0)?.unwrap_or(0) == 1,
                    attempts_count: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    solved_at: row.get(2)?,
                    locked_until: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(progress)
}

/// Record a flag attempt
pub fn insert_submission(
    conn: &Connection,
    user_id: i64,
    challenge_id: i64,
    submitted_flag: &str,
    is_correct: bool,
    submitted_at: &str,
) -> Result<i64, DbError> {
    conn.execute(
        r#"
        INSERT INTO submissions (user_id, challenge_id, submitted_flag, is_correct, submitted_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![user_id, challenge_id, submitted_flag, if is_correct { 1 } else { 0 }, submitted_at],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Count one more attempt, marking the challenge solved when `solved_at` is set.
///
/// Returns the attempt count after the update.
pub fn record_attempt(
    conn: &Connection,
    user_id: i64,
    challenge_id: i64,
    solved_at: Option<&str>,
) -> Result<i64, DbError> {
    let attempts = conn.query_row(
        r#"
        INSERT INTO user_challenge_progress (user_id, challenge_id, attempts_count, is_solved, solved_at)
        VALUES (?1, ?2, 1, ?3, ?4)
        ON CONFLICT(user_id, challenge_id) DO UPDATE SET
            attempts_count = COALESCE(attempts_count, 0) + 1,
            is_solved = excluded.is_solved,
            solved_at = excluded.solved_at
        RETURNING attempts_count
        "#,
        params![user_id, challenge_id, if solved_at.is_some() { 1 } else { 0 }, solved_at],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(attempts)
}

/// Set or clear the lockout for a user/challenge pair
pub fn set_locked_until(
    conn: &Connection,
    user_id: i64,
    challenge_id: i64,
    locked_until: Option<&str>,
) -> Result<(), DbError> {
    conn.execute(
        r#"
        UPDATE user_challenge_progress SET locked_until = ?1
        WHERE user_id = ?2 AND challenge_id = ?3
        "#,
        params![locked_until, user_id, challenge_id],
    )?;
    Ok(())
}

/// Clear an expired lockout and start the attempt counter over
pub fn reset_attempts(conn: &Connection, user_id: i64, challenge_id: i64) -> Result<(), DbError> {
    conn.execute(
        r#"
        UPDATE user_challenge_progress SET attempts_count = 0, locked_until = NULL
        WHERE user_id = ?1 AND challenge_id = ?2
        "#,
        params![user_id, challenge_id],
    )?;
    Ok(())
}

/// Challenges a user has solved, oldest solve first
pub fn get_solved_challenges(conn: &Connection, user_id: i64) -> Result<Vec<SolvedChallenge>, DbError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT c.id, c.title, c.points, p.solved_at
        FROM challenges c
        JOIN user_challenge_progress p ON c.id = p.challenge_id
        WHERE p.user_id = ?1 AND p.is_solved = 1
        ORDER BY p.solved_at ASC, p.id ASC
        "#,
    )?;

    let solved = stmt
        .query_map(params![user_id], |row| {
            Ok(SolvedChallenge {
                challenge_id: row.get(0)?,
                title: row.get(1)?,
                points: row.get(2)?,
                solved_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(solved)
}

/// Active challenges a user has tried but not solved
pub fn get_attempted_challenges(
    conn: &Connection,
    user_id: i64,
) -> Result<Vec<AttemptedChallenge>, DbError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT c.id, c.title, COALESCE(p.attempts_count, 0), COALESCE(c.max_attempts, -1), p.locked_until
        FROM challenges c
        JOIN user_challenge_progress p ON c.id = p.challenge_id
        WHERE p.user_id = ?1 AND COALESCE(p.is_solved, 0) = 0 AND c.is_active = 1
        ORDER BY c.points ASC, c.id ASC
        "#,
    )?;

    let attempted = stmt
        .query_map(params![user_id], |row| {
            Ok(AttemptedChallenge {
                challenge_id: row.get(0)?,
                title: row.get(1)?,
                attempts: row.get(2)?,
                max_attempts: row.get(3)?,
                locked_until: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(attempted)
}

/// All submissions, oldest first
pub fn get_submissions(conn: &Connection, limit: Option<u32>) -> Result<Vec<Submission>, DbError> {
    let limit = limit.map(i64::from).unwrap_or(-1);

    let mut stmt = conn.prepare(
        r#"
        SELECT
            s.id,
            s.user_id,
            COALESCE(u.username, ''),
            s.challenge_id,
            COALESCE(c.title, ''),
            s.submitted_flag,
            COALESCE(s.is_correct, 0),
            COALESCE(s.submitted_at, '')
        FROM submissions s
        LEFT JOIN users u ON u.id = s.user_id
        LEFT JOIN challenges c ON c.id = s.challenge_id
        ORDER BY s.submitted_at ASC, s.id ASC
        LIMIT ?1
        "#,
    )?;

    let submissions = stmt
        .query_map(params![limit], |row| {
            Ok(Submission {
                id: row.get(0)?,
                user_id: row.get(1)?,
                username: row.get(2)?,
                challenge_id: row.get(3)?,
                challenge_title: row.get(4)?,
                submitted_flag: row.get(5)?,
                is_correct: row.get::<_, i32>(6)? == 1,
                submitted_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(submissions)
}

// ============================================================================
// Leaderboard and statistics
// ============================================================================

/// Players with a positive score, best first, earlier registration wins ties
pub fn get_leaderboard(conn: &Connection, limit: Option<u32>) -> Result<Vec<LeaderboardEntry>, DbError> {
    let limit = limit.map(i64::from).unwrap_or(-1);

    let mut stmt = conn.prepare(
        r#"
        SELECT
            u.username,
            u.score,
            COALESCE(u.created_at, ''),
            (SELECT COUNT(*) FROM user_challenge_progress p
                WHERE p.user_id = u.id AND p.is_solved = 1) AS solves
        FROM users u
        WHERE u.score > 0
        ORDER BY u.score DESC, u.created_at ASC, u.id ASC
        LIMIT ?1
        "#,
    )?;

    let rows = stmt
        .query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let entries = rows
        .into_iter()
        .enumerate()
        .map(|(i, (username, score, created_at, solves))| LeaderboardEntry {
            rank: (i + 1) as u32,
            username,
            score,
            solves,
            created_at,
        })
        .collect();

    Ok(entries)
}

/// Per-challenge counters for every active challenge
pub fn get_challenge_counters(conn: &Connection) -> Result<Vec<ChallengeCounters>, DbError> {
    let sql = format!(
        r#"
        SELECT
            {},
            (SELECT COUNT(*) FROM user_challenge_progress p
                WHERE p.challenge_id = challenges.id AND p.is_solved = 1),
            (SELECT COUNT(*) FROM submissions s
                WHERE s.challenge_id = challenges.id),
            (SELECT COUNT(DISTINCT s.user_id) FROM submissions s
                WHERE s.challenge_id = challenges.id),
            (SELECT u.username FROM user_challenge_progress p
                JOIN users u ON u.id = p.user_id
                WHERE p.challenge_id = challenges.id AND p.is_solved = 1
                ORDER BY p.solved_at ASC, p.id ASC
                LIMIT 1)
        FROM challenges
        WHERE is_active = 1
        ORDER BY points ASC, id ASC
        "#,
        CHALLENGE_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let counters = stmt
        .query_map([], |row| {
            Ok(ChallengeCounters {
                challenge: row_to_challenge(row)?,
                solves: row.get(9)?,
                submissions: row.get(10)?,
                attempting_users: row.get(11)?,
                first_solver: row.get(12)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(counters)
}

/// Game-wide totals
pub fn get_game_summary(conn: &Connection) -> Result<GameSummary, DbError> {
    let summary = conn.query_row(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users WHERE is_organizer = 0),
            (SELECT COUNT(*) FROM challenges WHERE is_active = 1),
            (SELECT COALESCE(SUM(points), 0) FROM challenges WHERE is_active = 1),
            (SELECT COUNT(*) FROM submissions),
            (SELECT COUNT(*) FROM submissions WHERE is_correct = 1)
        "#,
        [],
        |row| {
            Ok(GameSummary {
                players: row.get(0)?,
                active_challenges: row.get(1)?,
                total_points_available: row.get(2)?,
                submissions: row.get(3)?,
                correct_submissions: row.get(4)?,
            })
        },
    )?;
    Ok(summary)
}
