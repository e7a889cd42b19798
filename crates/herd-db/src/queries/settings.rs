//! Settings query functions.

use rusqlite::Connection;

use crate::{DbError, Result};

/// Hex-encoded Argon2id salt of the master sealing key.
pub const MASTER_KEY_SALT: &str = "master_key_salt";

/// Hex-encoded check value of the master sealing key.
pub const MASTER_KEY_CHECK: &str = "master_key_check";

/// Get a setting value by key.
pub fn get(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::NotFound(format!("setting '{key}'"))
        }
        other => DbError::Sqlite(other),
    })
}

/// Get a setting value, `None` if unset.
pub fn get_optional(conn: &Connection, key: &str) -> Result<Option<String>> {
    match get(conn, key) {
        Ok(v) => Ok(Some(v)),
        Err(DbError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Set a setting value.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_set_and_get() {
        let conn = test_db();
        set(&conn, MASTER_KEY_SALT, "00ff").expect("set");
        assert_eq!(get(&conn, MASTER_KEY_SALT).expect("get"), "00ff");
        set(&conn, MASTER_KEY_SALT, "11ee").expect("overwrite");
        assert_eq!(get(&conn, MASTER_KEY_SALT).expect("get"), "11ee");
    }

    #[test]
    fn test_get_nonexistent() {
        let conn = test_db();
        assert!(matches!(get(&conn, "nonexistent"), Err(DbError::NotFound(_))));
        assert_eq!(get_optional(&conn, "nonexistent").expect("optional"), None);
    }
}
