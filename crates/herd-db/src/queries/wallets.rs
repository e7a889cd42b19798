//! Custodial wallet queries.
//!
//! Only sealed key material is stored. Sealing and opening happen in the
//! daemon, which holds the master key.

use herd_types::wallet::CustodialWallet;
use herd_types::Identity;
use rusqlite::{Connection, Row};

use crate::{constraint, DbError, Result};

/// A raw wallet row, including the sealed signing key.
#[derive(Debug)]
pub struct WalletRow {
    pub identity: String,
    pub owner_email: String,
    pub sealed_key: Vec<u8>,
    pub nonce: Vec<u8>,
    pub created_at: u64,
}

impl WalletRow {
    /// Public view without key material.
    pub fn public(&self) -> CustodialWallet {
        CustodialWallet {
            identity: Identity::new(self.identity.clone()),
            owner_email: self.owner_email.clone(),
            created_at: self.created_at,
        }
    }
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<WalletRow> {
    Ok(WalletRow {
        identity: row.get(0)?,
        owner_email: row.get(1)?,
        sealed_key: row.get(2)?,
        nonce: row.get(3)?,
        created_at: row.get::<_, i64>(4)? as u64,
    })
}

/// Insert a wallet. Identity and email are both unique.
pub fn insert(conn: &Connection, row: &WalletRow) -> Result<()> {
    conn.execute(
        "INSERT INTO custodial_wallets (identity, owner_email, sealed_key, nonce, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            row.identity,
            row.owner_email,
            row.sealed_key,
            row.nonce,
            row.created_at as i64,
        ],
    )
    .map_err(|e| constraint(e, format!("wallet for '{}' already exists", row.owner_email)))?;
    Ok(())
}

/// Get a wallet by identity.
pub fn get(conn: &Connection, identity: &str) -> Result<WalletRow> {
    conn.query_row(
        "SELECT identity, owner_email, sealed_key, nonce, created_at
         FROM custodial_wallets WHERE identity = ?1",
        [identity],
        from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("wallet '{identity}'")),
        other => DbError::Sqlite(other),
    })
}

/// List wallets (public view), oldest first.
pub fn list(conn: &Connection) -> Result<Vec<CustodialWallet>> {
    let mut stmt = conn.prepare(
        "SELECT identity, owner_email, sealed_key, nonce, created_at
         FROM custodial_wallets ORDER BY created_at, identity",
    )?;
    let rows = stmt
        .query_map([], from_row)?
        .map(|row| row.map(|r| r.public()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete a wallet.
pub fn delete(conn: &Connection, identity: &str) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM custodial_wallets WHERE identity = ?1",
        [identity],
    )?;
    if deleted == 0 {
        return Err(DbError::NotFound(format!("wallet '{identity}'")));
    }
    Ok(())
}
