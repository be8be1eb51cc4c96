//! Game storage
//!
//! One SQLite file holds accounts, the challenge catalogue, every flag
//! submission and per-player progress. `schema` owns table layout and
//! migrations; `queries` holds the SQL the game rules run.

pub mod schema;
pub mod queries;

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

impl DbError {
    /// True when the underlying SQLite error is a UNIQUE/FOREIGN KEY violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

/// How long a writer waits for another process to release the database
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Start a transaction holding the write lock from its first statement.
///
/// Read-then-write transactions must use this: two deferred transactions
/// upgrading from shared locks fail with SQLITE_BUSY instead of waiting.
pub fn begin_write(conn: &Connection) -> Result<Transaction<'_>, DbError> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

/// Database connection wrapper
pub struct Database {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database file at `path`
    pub fn new(path: PathBuf) -> Result<Self, DbError> {
        let conn = Connection::open(&path)?;
        Self::from_connection(conn, path)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, path: PathBuf) -> Result<Self, DbError> {
        // Enable foreign keys
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Initialize the database schema and run pending migrations
    pub fn initialize(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        schema::create_tables(&conn)?;
        schema::migrate(&conn)?;
        Ok(())
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute a query with the database connection
    pub fn with_connection<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        f(&conn)
    }
}

/// Get the default database path
pub fn default_db_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join("minictf").join("ctf_game.db"),
        None => PathBuf::from("ctf_game.db"),
    }
}

/// Open the database at `path`, creating parent directories and the schema
pub fn open(path: &Path) -> Result<Database, DbError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Failed to create database directory {:?}: {}", parent, e);
            }
        }
    }

    let database = Database::new(path.to_path_buf())?;
    database.initialize()?;
    tracing::debug!("Database ready at {:?}", path);
    Ok(database)
}
