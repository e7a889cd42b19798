//! Revenue split configuration queries.

use herd_types::split::SplitConfig;
use rusqlite::{Connection, Row};

use crate::{DbError, Result};

const COLUMNS: &str = "id, category, farmer_share, platform_share, description, active";

fn from_row(row: &Row<'_>) -> rusqlite::Result<SplitConfig> {
    Ok(SplitConfig {
        id: row.get(0)?,
        category: row.get(1)?,
        farmer_share: row.get(2)?,
        platform_share: row.get(3)?,
        description: row.get(4)?,
        active: row.get(5)?,
    })
}

/// Insert or replace a config by id. A new id is appended after all
/// existing configs; an existing id keeps its position.
pub fn upsert(conn: &Connection, config: &SplitConfig) -> Result<()> {
    conn.execute(
        "INSERT INTO split_configs (id, category, farmer_share, platform_share, description, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
             category = excluded.category,
             farmer_share = excluded.farmer_share,
             platform_share = excluded.platform_share,
             description = excluded.description,
             active = excluded.active",
        rusqlite::params![
            config.id,
            config.category,
            config.farmer_share,
            config.platform_share,
            config.description,
            config.active,
        ],
    )?;
    Ok(())
}

/// Get one config by id.
pub fn get(conn: &Connection, id: &str) -> Result<SplitConfig> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM split_configs WHERE id = ?1"),
        [id],
        from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("split config '{id}'")),
        other => DbError::Sqlite(other),
    })
}

/// All configs in insertion order.
pub fn list(conn: &Connection) -> Result<Vec<SplitConfig>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM split_configs ORDER BY position"
    ))?;
    let rows = stmt
        .query_map([], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Active configs in insertion order.
pub fn list_active(conn: &Connection) -> Result<Vec<SplitConfig>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM split_configs WHERE active = 1 ORDER BY position"
    ))?;
    let rows = stmt
        .query_map([], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Activate or deactivate a config.
pub fn set_active(conn: &Connection, id: &str, active: bool) -> Result<()> {
    let updated = conn.execute(
        "UPDATE split_configs SET active = ?1 WHERE id = ?2",
        rusqlite::params![active, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("split config '{id}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_upsert_and_get() {
        let conn = test_db();
        let mut config = SplitConfig::new("premium", "premium", 80, 20);
        config.description = Some("Premium breeds".into());
        upsert(&conn, &config).expect("upsert");
        assert_eq!(get(&conn, "premium").expect("get"), config);
    }

    #[test]
    fn test_get_missing() {
        let conn = test_db();
        assert!(matches!(get(&conn, "nope"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_update_keeps_position() {
        let conn = test_db();
        upsert(&conn, &SplitConfig::new("a", "standard", 70, 30)).expect("a");
        upsert(&conn, &SplitConfig::new("b", "standard", 60, 40)).expect("b");
        upsert(&conn, &SplitConfig::new("a", "standard", 65, 35)).expect("update a");

        let ids: Vec<String> = list(&conn).expect("list").into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(get(&conn, "a").expect("get").farmer_share, 65);
    }

    #[test]
    fn test_list_active_filters() {
        let conn = test_db();
        upsert(&conn, &SplitConfig::new("a", "standard", 70, 30)).expect("a");
        upsert(&conn, &SplitConfig::new("b", "premium", 80, 20)).expect("b");
        set_active(&conn, "a", false).expect("deactivate");

        let active = list_active(&conn).expect("list active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "b");
        assert_eq!(list(&conn).expect("list").len(), 2);
    }

    #[test]
    fn test_set_active_missing() {
        let conn = test_db();
        assert!(matches!(
            set_active(&conn, "ghost", true),
            Err(DbError::NotFound(_))
        ));
    }
}
