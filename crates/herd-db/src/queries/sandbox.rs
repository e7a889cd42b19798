//! Sandbox ledger and certificate store queries.
//!
//! Receipts live in the same database as the settlements they pay for, so a
//! payment that landed before a restart is still found by reconciliation
//! afterwards.

use herd_types::settlement::PaymentReceipt;
use rusqlite::{Connection, OptionalExtension};

use crate::{constraint, get_u64, sql_int, Result};

/// Sequence number the next payment will receive.
pub fn next_sequence(conn: &Connection) -> Result<u64> {
    let last: i64 = conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM sandbox_payments", [], |row| {
        row.get(0)
    })?;
    Ok(u64::try_from(last).unwrap_or(0) + 1)
}

/// Record a confirmed payment. A reference is paid at most once.
pub fn insert_payment(conn: &Connection, receipt: &PaymentReceipt) -> Result<()> {
    let disbursements = serde_json::to_string(&receipt.disbursements)?;
    conn.execute(
        "INSERT INTO sandbox_payments (reference, token, disbursements, confirmed_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            receipt.reference,
            receipt.token,
            disbursements,
            sql_int(receipt.confirmed_at, "confirmation time")?,
        ],
    )
    .map_err(|e| constraint(e, format!("reference '{}' already paid", receipt.reference)))?;
    Ok(())
}

/// Payment made under a reference, if any.
pub fn find_payment(conn: &Connection, reference: &str) -> Result<Option<PaymentReceipt>> {
    let row = conn
        .query_row(
            "SELECT token, disbursements, confirmed_at FROM sandbox_payments WHERE reference = ?1",
            [reference],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    get_u64(row, 2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((token, disbursements, confirmed_at)) => Ok(Some(PaymentReceipt {
            token,
            reference: reference.to_string(),
            disbursements: serde_json::from_str(&disbursements)?,
            confirmed_at,
        })),
        None => Ok(None),
    }
}

pub fn count_payments(conn: &Connection) -> Result<u64> {
    let count = conn.query_row("SELECT COUNT(*) FROM sandbox_payments", [], |row| get_u64(row, 0))?;
    Ok(count)
}

/// Store a certificate document. Content-addressed, so re-storing is a no-op.
pub fn insert_certificate(conn: &Connection, content_ref: &str, document: &[u8]) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO sandbox_certificates (content_ref, document) VALUES (?1, ?2)",
        rusqlite::params![content_ref, document],
    )?;
    Ok(())
}

pub fn get_certificate(conn: &Connection, content_ref: &str) -> Result<Option<Vec<u8>>> {
    let document = conn
        .query_row(
            "SELECT document FROM sandbox_certificates WHERE content_ref = ?1",
            [content_ref],
            |row| row.get(0),
        )
        .optional()?;
    Ok(document)
}
