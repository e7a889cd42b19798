//! Supply-chain history queries. Append-only.

use herd_types::events::{SupplyChainEvent, SupplyChainEventKind};
use herd_types::settlement::ContentRef;
use rusqlite::Connection;

use crate::{constraint, DbError, Result};

/// Append one event. Returns its sequence number.
pub fn append(conn: &Connection, event: &SupplyChainEvent) -> Result<i64> {
    let data = serde_json::to_string(&event.data)?;
    conn.execute(
        "INSERT INTO supply_chain_events (asset_id, kind, actor, timestamp, data, content_ref)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            event.asset_id,
            event.kind.as_str(),
            event.actor,
            event.timestamp as i64,
            data,
            event.content_ref.as_ref().map(|r| r.0.as_str()),
        ],
    )
    .map_err(|e| constraint(e, format!("unknown asset '{}'", event.asset_id)))?;
    Ok(conn.last_insert_rowid())
}

/// Full history of an asset, oldest first.
pub fn history(conn: &Connection, asset_id: &str) -> Result<Vec<SupplyChainEvent>> {
    let mut stmt = conn.prepare(
        "SELECT asset_id, kind, actor, timestamp, data, content_ref
         FROM supply_chain_events WHERE asset_id = ?1 ORDER BY seq",
    )?;

    let rows = stmt
        .query_map([asset_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)? as u64,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(asset_id, kind, actor, timestamp, data, content_ref)| -> Result<SupplyChainEvent> {
            let kind = SupplyChainEventKind::parse(&kind).ok_or_else(|| {
                DbError::Serialization(format!("unknown event kind '{kind}'"))
            })?;
            Ok(SupplyChainEvent {
                asset_id,
                kind,
                actor,
                timestamp,
                data: serde_json::from_str(&data)?,
                content_ref: content_ref.map(ContentRef),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use herd_types::livestock::LivestockAsset;

    use super::*;
    use crate::queries::livestock;

    fn test_db() -> Connection {
        let conn = crate::open_memory().expect("open test db");
        livestock::insert(&conn, &LivestockAsset::register("cow-1", "Bessie", "Angus", "standard", 1))
            .expect("insert asset");
        conn
    }

    #[test]
    fn test_append_and_history_in_order() {
        let conn = test_db();
        let weigh = SupplyChainEvent::new(
            "cow-1",
            SupplyChainEventKind::WeightUpdate,
            "farmer",
            10,
            serde_json::json!({ "weight_kg": 410.0 }),
        );
        let mut vax = SupplyChainEvent::new(
            "cow-1",
            SupplyChainEventKind::Vaccination,
            "vet",
            20,
            serde_json::json!({ "vaccine": "FMD" }),
        );
        vax.content_ref = Some(ContentRef("b3:abc".into()));

        let first = append(&conn, &weigh).expect("append");
        let second = append(&conn, &vax).expect("append");
        assert!(second > first);

        assert_eq!(history(&conn, "cow-1").expect("history"), vec![weigh, vax]);
    }

    #[test]
    fn test_unknown_asset_rejected() {
        let conn = test_db();
        let event = SupplyChainEvent::new(
            "ghost",
            SupplyChainEventKind::HealthCheck,
            "vet",
            1,
            serde_json::Value::Null,
        );
        assert!(matches!(append(&conn, &event), Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_empty_history() {
        let conn = test_db();
        assert!(history(&conn, "cow-1").expect("history").is_empty());
    }
}
