//! Settlement record queries.

use herd_settlement::collaborators::SettlementCommit;
use herd_types::settlement::{ContentRef, SettlementRecord, SettlementResult, SlaughterInfo};
use herd_types::Identity;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::queries::{events, livestock};
use crate::{constraint, get_u64, sql_int, Result};

const COLUMNS: &str = "asset_id, split_id, farmer_share, platform_share, gross_amount, expenses, \
                       net_amount, farmer_amount, platform_amount, farmer, platform, payment_token, \
                       certificate, facility, slaughtered_at, final_weight_kg, settled_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<SettlementRecord> {
    Ok(SettlementRecord {
        asset_id: row.get(0)?,
        split_id: row.get(1)?,
        farmer_share: row.get(2)?,
        platform_share: row.get(3)?,
        gross_amount: get_u64(row, 4)?,
        expenses: get_u64(row, 5)?,
        result: SettlementResult {
            net_amount: get_u64(row, 6)?,
            farmer_amount: get_u64(row, 7)?,
            platform_amount: get_u64(row, 8)?,
        },
        farmer: Identity(row.get(9)?),
        platform: Identity(row.get(10)?),
        payment_token: row.get(11)?,
        certificate: ContentRef(row.get(12)?),
        slaughter: SlaughterInfo {
            facility: row.get(13)?,
            slaughtered_at: get_u64(row, 14)?,
            final_weight_kg: row.get(15)?,
        },
        settled_at: get_u64(row, 16)?,
    })
}

/// Insert a settlement record. An asset settles at most once.
pub fn insert(conn: &Connection, record: &SettlementRecord) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO settlements ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        rusqlite::params![
            record.asset_id,
            record.split_id,
            record.farmer_share,
            record.platform_share,
            sql_int(record.gross_amount, "gross amount")?,
            sql_int(record.expenses, "expenses")?,
            sql_int(record.result.net_amount, "net amount")?,
            sql_int(record.result.farmer_amount, "farmer amount")?,
            sql_int(record.result.platform_amount, "platform amount")?,
            record.farmer.as_str(),
            record.platform.as_str(),
            record.payment_token,
            record.certificate.0,
            record.slaughter.facility,
            sql_int(record.slaughter.slaughtered_at, "slaughter date")?,
            record.slaughter.final_weight_kg,
            sql_int(record.settled_at, "settled-at")?,
        ],
    )
    .map_err(|e| constraint(e, format!("asset '{}' already settled", record.asset_id)))?;
    Ok(())
}

/// Persist the record, the settled asset row and the slaughter event in one
/// transaction, guarded by the asset's version.
pub fn commit(conn: &mut Connection, commit: &SettlementCommit, expected_version: u64) -> Result<()> {
    let tx = conn.transaction()?;
    livestock::update(&tx, &commit.asset, expected_version)?;
    insert(&tx, &commit.record)?;
    events::append(&tx, &commit.event)?;
    tx.commit()?;
    Ok(())
}

/// Settlement of one asset, if any.
pub fn get(conn: &Connection, asset_id: &str) -> Result<Option<SettlementRecord>> {
    let record = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM settlements WHERE asset_id = ?1"),
            [asset_id],
            from_row,
        )
        .optional()?;
    Ok(record)
}

/// Most recent settlements first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<SettlementRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM settlements ORDER BY settled_at DESC, asset_id LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map([limit], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
