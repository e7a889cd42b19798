//! Diagnostics command handlers.

use std::sync::Arc;

use herd_db::queries::livestock;
use herd_types::livestock::LifecycleStatus;
use serde_json::Value;
use tracing::info;

use crate::rpc::{require_admin, RpcError};
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Version, herd counts and bus sequence.
pub async fn get_daemon_status(state: &Arc<DaemonState>) -> Result {
    let assets = {
        let db = state.db.lock().await;
        livestock::list(&db, None)?
    };
    let sandbox_payments = state.workflow.payments().count().await?;
    let count = |status: LifecycleStatus| assets.iter().filter(|a| a.lifecycle_status == status).count();

    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "livestock": {
            "total": assets.len(),
            "active": count(LifecycleStatus::Active),
            "ready": count(LifecycleStatus::Ready),
            "sold": count(LifecycleStatus::Sold),
            "settled": count(LifecycleStatus::Settled),
        },
        "sandbox_payments": sandbox_payments,
        "event_sequence": state.event_bus.sequence(),
        "secret_store_unlocked": state.secrets.is_some(),
        "admin_count": state.whitelist.len(),
    }))
}

/// Masked admin whitelist.
pub async fn list_admins(state: &Arc<DaemonState>, params: &Value) -> Result {
    require_admin(state, params)?;
    Ok(serde_json::json!(state.whitelist.masked()))
}

/// Request a graceful shutdown.
pub async fn shutdown(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = require_admin(state, params)?;
    info!(caller = %herd_types::Identity::new(caller).masked(), "shutdown requested");
    let _ = state.shutdown_tx.send(());
    Ok(serde_json::json!({"shutting_down": true}))
}
