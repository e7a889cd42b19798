//! herd-daemon: the livestock settlement service.
//!
//! Single OS process running a Tokio async runtime. Operators and tools talk
//! to it via JSON-RPC over a Unix socket.

pub mod auth;
pub mod commands;
pub mod config;
pub mod events;
pub mod rpc;
pub mod sandbox;
pub mod secrets;

use std::sync::Arc;

use herd_db::SqliteBook;
use herd_settlement::workflow::SettlementWorkflow;
use rusqlite::Connection;
use tokio::sync::{broadcast, Mutex};

use crate::auth::AdminWhitelist;
use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::sandbox::{SandboxIssuer, SandboxLedger};
use crate::secrets::SecretStore;

/// Settlement workflow as wired in the daemon.
pub type DaemonWorkflow = SettlementWorkflow<SandboxLedger, SandboxIssuer, SqliteBook, SqliteBook>;

/// Daemon-wide shared state.
pub struct DaemonState {
    pub db: Arc<Mutex<Connection>>,
    pub config: DaemonConfig,
    pub event_bus: EventBus,
    pub whitelist: AdminWhitelist,
    /// `None` when no master passphrase was supplied; wallet commands are
    /// then unavailable.
    pub secrets: Option<Box<dyn SecretStore>>,
    pub workflow: DaemonWorkflow,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    pub fn new(
        conn: Connection,
        config: DaemonConfig,
        whitelist: AdminWhitelist,
        secrets: Option<Box<dyn SecretStore>>,
    ) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let book = SqliteBook::new(db.clone());
        let workflow = SettlementWorkflow::new(
            SandboxLedger::new(db.clone()),
            SandboxIssuer::new(db.clone()),
            book.clone(),
            book,
            config.settlement.workflow(),
        );
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            db,
            config,
            event_bus: EventBus::new(1000),
            whitelist,
            secrets,
            workflow,
            shutdown_tx,
        }
    }
}

/// Current Unix time in seconds.
pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
