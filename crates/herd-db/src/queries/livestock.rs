//! Livestock registry queries.
//!
//! Every mutation goes through [`update`], which bumps `version` and refuses
//! to write if the row changed since it was read.

use herd_types::events::SupplyChainEvent;
use herd_types::livestock::{LifecycleStatus, LivestockAsset};
use herd_types::Identity;
use rusqlite::{Connection, Row};

use crate::queries::events;
use crate::{constraint, DbError, Result};

const COLUMNS: &str = "id, name, breed, category, owner_identity, current_weight_kg, \
                       health_score, lifecycle_status, version, registered_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<LivestockAsset> {
    let status: String = row.get(7)?;
    let lifecycle_status = LifecycleStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("unknown lifecycle status '{status}'").into(),
        )
    })?;
    Ok(LivestockAsset {
        id: row.get(0)?,
        name: row.get(1)?,
        breed: row.get(2)?,
        category: row.get(3)?,
        owner_identity: row.get::<_, Option<String>>(4)?.map(Identity),
        current_weight_kg: row.get(5)?,
        health_score: row.get(6)?,
        lifecycle_status,
        version: row.get::<_, i64>(8)? as u64,
        registered_at: row.get::<_, i64>(9)? as u64,
        updated_at: row.get::<_, i64>(10)? as u64,
    })
}

/// Insert a new asset.
pub fn insert(conn: &Connection, asset: &LivestockAsset) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO livestock ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
        rusqlite::params![
            asset.id,
            asset.name,
            asset.breed,
            asset.category,
            asset.owner_identity.as_ref().map(Identity::as_str),
            asset.current_weight_kg,
            asset.health_score,
            asset.lifecycle_status.as_str(),
            asset.version as i64,
            asset.registered_at as i64,
            asset.updated_at as i64,
        ],
    )
    .map_err(|e| constraint(e, format!("asset '{}' already registered", asset.id)))?;
    Ok(())
}

/// Register an asset together with its birth event.
pub fn register(conn: &mut Connection, asset: &LivestockAsset, birth: &SupplyChainEvent) -> Result<()> {
    let tx = conn.transaction()?;
    insert(&tx, asset)?;
    events::append(&tx, birth)?;
    tx.commit()?;
    Ok(())
}

/// Get an asset by id.
pub fn get(conn: &Connection, id: &str) -> Result<LivestockAsset> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM livestock WHERE id = ?1"),
        [id],
        from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("asset '{id}'")),
        other => DbError::Sqlite(other),
    })
}

/// List assets, optionally filtered by lifecycle status.
pub fn list(conn: &Connection, status: Option<LifecycleStatus>) -> Result<Vec<LivestockAsset>> {
    let rows = match status {
        Some(status) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM livestock WHERE lifecycle_status = ?1 ORDER BY registered_at, id"
            ))?;
            let rows = stmt
                .query_map([status.as_str()], from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM livestock ORDER BY registered_at, id"
            ))?;
            let rows = stmt
                .query_map([], from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

/// Write the mutable fields of `asset` if the stored version still equals
/// `expected_version`. Returns the new version.
pub fn update(conn: &Connection, asset: &LivestockAsset, expected_version: u64) -> Result<u64> {
    let updated = conn.execute(
        "UPDATE livestock SET
             owner_identity = ?1,
             current_weight_kg = ?2,
             health_score = ?3,
             lifecycle_status = ?4,
             updated_at = ?5,
             version = version + 1
         WHERE id = ?6 AND version = ?7",
        rusqlite::params![
            asset.owner_identity.as_ref().map(Identity::as_str),
            asset.current_weight_kg,
            asset.health_score,
            asset.lifecycle_status.as_str(),
            asset.updated_at as i64,
            asset.id,
            expected_version as i64,
        ],
    )?;
    if updated == 0 {
        // Distinguish a missing row from a stale read.
        get(conn, &asset.id)?;
        return Err(DbError::Conflict {
            asset_id: asset.id.clone(),
            expected: expected_version,
        });
    }
    Ok(expected_version + 1)
}

/// Apply a mutation and append its history event atomically.
pub fn update_with_event(
    conn: &mut Connection,
    asset: &LivestockAsset,
    expected_version: u64,
    event: &SupplyChainEvent,
) -> Result<u64> {
    let tx = conn.transaction()?;
    let version = update(&tx, asset, expected_version)?;
    events::append(&tx, event)?;
    tx.commit()?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use herd_types::events::SupplyChainEventKind;

    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn cow(id: &str) -> LivestockAsset {
        LivestockAsset::register(id, "Bessie", "Angus", "standard", 100)
    }

    #[test]
    fn test_insert_and_get() {
        let conn = test_db();
        let mut asset = cow("cow-1");
        asset.owner_identity = Some(Identity::from("OWNER"));
        asset.current_weight_kg = Some(420.5);
        asset.health_score = Some(92);
        insert(&conn, &asset).expect("insert");
        assert_eq!(get(&conn, "cow-1").expect("get"), asset);
    }

    #[test]
    fn test_duplicate_registration() {
        let conn = test_db();
        insert(&conn, &cow("cow-1")).expect("insert");
        assert!(matches!(
            insert(&conn, &cow("cow-1")),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_register_writes_birth_event() {
        let mut conn = test_db();
        let asset = cow("cow-1");
        let birth = SupplyChainEvent::new("cow-1", SupplyChainEventKind::Birth, "farm", 100, serde_json::json!({}));
        register(&mut conn, &asset, &birth).expect("register");
        assert_eq!(events::history(&conn, "cow-1").expect("history").len(), 1);
    }

    #[test]
    fn test_update_bumps_version() {
        let conn = test_db();
        let mut asset = cow("cow-1");
        insert(&conn, &asset).expect("insert");

        asset.current_weight_kg = Some(500.0);
        asset.lifecycle_status = LifecycleStatus::Ready;
        assert_eq!(update(&conn, &asset, 0).expect("update"), 1);

        let stored = get(&conn, "cow-1").expect("get");
        assert_eq!(stored.version, 1);
        assert_eq!(stored.lifecycle_status, LifecycleStatus::Ready);
        assert_eq!(stored.current_weight_kg, Some(500.0));
    }

    #[test]
    fn test_stale_update_conflicts() {
        let conn = test_db();
        let asset = cow("cow-1");
        insert(&conn, &asset).expect("insert");
        update(&conn, &asset, 0).expect("first writer");

        let err = update(&conn, &asset, 0).expect_err("second writer is stale");
        assert!(matches!(err, DbError::Conflict { expected: 0, .. }));
    }

    #[test]
    fn test_update_missing() {
        let conn = test_db();
        assert!(matches!(
            update(&conn, &cow("ghost"), 0),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_by_status() {
        let conn = test_db();
        insert(&conn, &cow("cow-1")).expect("insert");
        let mut ready = cow("cow-2");
        ready.lifecycle_status = LifecycleStatus::Ready;
        insert(&conn, &ready).expect("insert");

        assert_eq!(list(&conn, None).expect("all").len(), 2);
        let only_ready = list(&conn, Some(LifecycleStatus::Ready)).expect("ready");
        assert_eq!(only_ready.len(), 1);
        assert_eq!(only_ready[0].id, "cow-2");
    }
}
