//! SQLite-backed asset book and split config store for the settlement
//! workflow.

use std::sync::Arc;

use herd_settlement::collaborators::{AssetBook, CollaboratorError, ConfigStore, SettlementCommit};
use herd_types::livestock::LivestockAsset;
use herd_types::split::SplitConfig;
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::queries::{livestock, settlements, splits};
use crate::DbError;

/// Shared handle to the daemon's database connection.
#[derive(Clone, Debug)]
pub struct SqliteBook {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBook {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

impl From<DbError> for CollaboratorError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => CollaboratorError::NotFound(what),
            DbError::Conflict { asset_id, expected } => CollaboratorError::Conflict { asset_id, expected },
            DbError::Constraint(msg) | DbError::Serialization(msg) | DbError::Migration(msg) => {
                CollaboratorError::Rejected(msg)
            }
            DbError::Sqlite(e) => CollaboratorError::Unavailable(e.to_string()),
        }
    }
}

impl AssetBook for SqliteBook {
    async fn load_asset(&self, asset_id: &str) -> Result<LivestockAsset, CollaboratorError> {
        let conn = self.conn.lock().await;
        Ok(livestock::get(&conn, asset_id)?)
    }

    async fn commit_settlement(
        &self,
        commit: &SettlementCommit,
        expected_version: u64,
    ) -> Result<(), CollaboratorError> {
        let mut conn = self.conn.lock().await;
        settlements::commit(&mut conn, commit, expected_version)?;
        Ok(())
    }
}

impl ConfigStore for SqliteBook {
    async fn list_active_configs(&self) -> Result<Vec<SplitConfig>, CollaboratorError> {
        let conn = self.conn.lock().await;
        Ok(splits::list_active(&conn)?)
    }

    async fn save(&self, config: &SplitConfig) -> Result<(), CollaboratorError> {
        let conn = self.conn.lock().await;
        splits::upsert(&conn, config)?;
        Ok(())
    }
}
