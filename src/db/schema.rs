//! Database schema definitions
//!
//! Contains SQL for creating all tables and indexes, the migration ladder
//! and the built-in starter challenges.

use rusqlite::{params, Connection};
use super::DbError;

/// Current schema version stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 2;

/// SQL schema for all tables
const SCHEMA: &str = r#"
-- Players and organizers
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    score INTEGER DEFAULT 0,
    is_organizer INTEGER DEFAULT 0,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

-- Challenge catalogue
CREATE TABLE IF NOT EXISTS challenges (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    flag TEXT NOT NULL,
    points INTEGER NOT NULL,
    max_attempts INTEGER DEFAULT -1,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

-- Every flag attempt, correct or not
CREATE TABLE IF NOT EXISTS submissions (
    id INTEGER PRIMARY KEY,
    user_id INTEGER REFERENCES users(id),
    challenge_id INTEGER REFERENCES challenges(id),
    submitted_flag TEXT NOT NULL,
    is_correct INTEGER,
    submitted_at TEXT DEFAULT CURRENT_TIMESTAMP
);

-- Per-user state for each attempted challenge
CREATE TABLE IF NOT EXISTS user_challenge_progress (
    id INTEGER PRIMARY KEY,
    user_id INTEGER REFERENCES users(id),
    challenge_id INTEGER REFERENCES challenges(id),
    is_solved INTEGER DEFAULT 0,
    attempts_count INTEGER DEFAULT 0,
    solved_at TEXT,
    locked_until TEXT,
    UNIQUE(user_id, challenge_id)
);
"#;

/// Indexes added in schema version 2
const INDEXES_V2: &str = r#"
CREATE INDEX IF NOT EXISTS idx_submissions_user ON submissions(user_id);
CREATE INDEX IF NOT EXISTS idx_submissions_challenge ON submissions(challenge_id);
CREATE INDEX IF NOT EXISTS idx_users_score ON users(score DESC);
CREATE INDEX IF NOT EXISTS idx_progress_challenge ON user_challenge_progress(challenge_id, is_solved);
"#;

/// Starter challenges: (title, description, category, flag, points, max_attempts)
const SAMPLE_CHALLENGES: &[(&str, &str, &str, &str, i64, i64)] = &[
    (
        "Welcome Aboard",
        "Every CTF starts somewhere. The flag is CTF{welcome_to_minictf}",
        "misc",
        "CTF{welcome_to_minictf}",
        10,
        -1,
    ),
    (
        "Caesar's Salad",
        "Decrypt this ROT13 message: PGS{ebg13_vf_abg_rapelcgvba}",
        "crypto",
        "CTF{rot13_is_not_encryption}",
        50,
        -1,
    ),
    (
        "Base Jumping",
        "Decode: Q1RGe2Jhc2U2NF9pc19qdXN0X2FuX2VuY29kaW5nfQ==",
        "crypto",
        "CTF{base64_is_just_an_encoding}",
        75,
        -1,
    ),
    (
        "View Source",
        "A developer left a comment in the page: <!-- CTF{always_check_the_source} -->. What is it?",
        "web",
        "CTF{always_check_the_source}",
        100,
        5,
    ),
    (
        "Magic Bytes",
        "A file starts with the bytes 89 50 4E 47. Name its format in the flag: CTF{<format in lowercase>}",
        "forensics",
        "CTF{png}",
        150,
        3,
    ),
];

/// Create all database tables
pub fn create_tables(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Bring the schema up to `SCHEMA_VERSION`
pub fn migrate(conn: &Connection) -> Result<(), DbError> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, SCHEMA_VERSION
        )));
    }

    if current < 2 {
        tracing::info!("Migrating schema from version {} to 2", current);
        conn.execute_batch(INDEXES_V2)?;
    }

    if current != SCHEMA_VERSION {
        conn.execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION))?;
    }

    Ok(())
}

/// Insert the starter challenges when the catalogue is empty.
///
/// Returns the number of challenges inserted.
pub fn seed_sample_challenges(conn: &Connection) -> Result<usize, DbError> {
    let tx = super::begin_write(conn)?;
    let existing: i64 = tx.query_row("SELECT COUNT(*) FROM challenges", [], |row| row.get(0))?;
    if existing > 0 {
        return Ok(0);
    }

    let now = crate::models::format_timestamp(chrono::Utc::now());
    for (title, description, category, flag, points, max_attempts) in SAMPLE_CHALLENGES {
        tx.execute(
            r#"
            INSERT INTO challenges (title, description, category, flag, points, max_attempts, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![title, description, category, flag, points, max_attempts, now],
        )?;
    }
    tx.commit()?;

    Ok(SAMPLE_CHALLENGES.len())
}
