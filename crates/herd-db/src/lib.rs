//! # herd-db
//!
//! Database access layer for the herd daemon.
//! Manages the single SQLite database at `$HERD_DATA_DIR/herd.db`.
//!
//! ## Schema
//!
//! - WAL mode mandatory
//! - Foreign keys enforced
//! - All timestamps are Unix epoch seconds (u64)
//! - Amounts are micro-units (u64) in INTEGER columns; values above `i64::MAX`
//!   are refused on write and rejected on read
//! - Schema version stored in `PRAGMA user_version`

pub mod book;
pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::{Connection, Row};
use std::path::Path;

pub use book::SqliteBook;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Optimistic version check failed.
    #[error("asset {asset_id} changed concurrently (expected version {expected})")]
    Conflict { asset_id: String, expected: u64 },
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the herd database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Map a unique/foreign-key violation to [`DbError::Constraint`].
pub(crate) fn constraint(e: rusqlite::Error, what: impl Into<String>) -> DbError {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DbError::Constraint(what.into())
        }
        other => DbError::Sqlite(other),
    }
}

/// Convert an unsigned amount or timestamp to SQLite's signed INTEGER.
pub(crate) fn sql_int(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| DbError::Constraint(format!("{what} {value} exceeds the storable range")))
}

/// Read a column that holds a non-negative INTEGER.
pub(crate) fn get_u64(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}
