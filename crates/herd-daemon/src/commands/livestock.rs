//! Livestock registry command handlers.
//!
//! Every mutation reads the asset, applies one lifecycle operation and
//! writes the row and its history event in one transaction guarded by the
//! row version. Lifecycle exits and payee changes are refused while a
//! settlement payment for the asset sits on the ledger unrecorded.

use std::sync::Arc;

use herd_db::queries::{events, livestock};
use herd_settlement::{lifecycle, SettlementError};
use herd_types::events::{SupplyChainEvent, SupplyChainEventKind};
use herd_types::livestock::{LifecycleStatus, LivestockAsset};
use herd_types::{Identity, STANDARD_CATEGORY};
use serde_json::Value;
use tracing::{error, info, warn};

use super::{opt_str_param, str_param, to_json};
use crate::events::{Event, LIVESTOCK_REGISTERED, LIVESTOCK_UPDATED};
use crate::rpc::{require_admin, RpcError};
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn rejected(asset_id: &str, e: SettlementError) -> RpcError {
    if e.is_workflow_bug() {
        error!(asset_id, kind = e.kind(), "lifecycle refused: {e}");
    } else {
        warn!(asset_id, kind = e.kind(), "lifecycle rejected: {e}");
    }
    e.into()
}

fn weight_param(params: &Value, name: &str) -> std::result::Result<Option<f64>, RpcError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let kg = v
                .as_f64()
                .ok_or_else(|| RpcError::invalid_params(&format!("{name} must be a number")))?;
            if !kg.is_finite() || kg <= 0.0 {
                return Err(SettlementError::InvalidWeight(kg).into());
            }
            Ok(Some(kg))
        }
    }
}

fn health_param(params: &Value, name: &str) -> std::result::Result<Option<u8>, RpcError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let score = v
                .as_u64()
                .and_then(|s| u8::try_from(s).ok())
                .ok_or_else(|| RpcError::invalid_params(&format!("{name} must be 0-100")))?;
            if score > herd_types::MAX_HEALTH_SCORE {
                return Err(SettlementError::InvalidHealthScore(score).into());
            }
            Ok(Some(score))
        }
    }
}

/// Whether an operation can strand a landed settlement payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Payout {
    Unaffected,
    /// Changes the lifecycle path or the payee.
    Affected,
}

/// Apply one lifecycle operation under the asset lock and the database lock.
async fn mutate<F>(state: &Arc<DaemonState>, asset_id: &str, payout: Payout, op: F) -> Result
where
    F: FnOnce(&mut LivestockAsset) -> std::result::Result<SupplyChainEvent, SettlementError>,
{
    let _guard = state.workflow.locks().acquire(asset_id).await;
    if payout == Payout::Affected {
        state
            .workflow
            .ensure_no_landed_payment(asset_id)
            .await
            .map_err(|e| rejected(asset_id, e))?;
    }
    let (asset, kind) = {
        let mut db = state.db.lock().await;
        let mut asset = livestock::get(&db, asset_id)?;
        let expected = asset.version;
        let event = op(&mut asset).map_err(|e| rejected(asset_id, e))?;
        asset.version = livestock::update_with_event(&mut db, &asset, expected, &event)?;
        (asset, event.kind)
    };

    info!(asset_id, kind = kind.as_str(), version = asset.version, "livestock updated");
    state.event_bus.emit(Event::new(
        LIVESTOCK_UPDATED,
        crate::now(),
        serde_json::json!({
            "asset_id": asset.id,
            "kind": kind,
            "status": asset.lifecycle_status,
            "version": asset.version,
        }),
    ));
    to_json(&asset)
}

/// Register a new animal.
pub async fn register_livestock(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = require_admin(state, params)?;
    let asset_id = str_param(params, "asset_id")?;
    let name = str_param(params, "name")?;
    let breed = str_param(params, "breed")?;
    let category = opt_str_param(params, "category").unwrap_or(STANDARD_CATEGORY);

    let now = crate::now();
    let mut asset = LivestockAsset::register(asset_id, name, breed, category, now);
    asset.owner_identity = opt_str_param(params, "owner_identity").map(Identity::from);
    asset.current_weight_kg = weight_param(params, "weight_kg")?;
    asset.health_score = health_param(params, "health_score")?;

    let birth = SupplyChainEvent::new(
        asset_id,
        SupplyChainEventKind::Birth,
        caller,
        now,
        serde_json::json!({
            "name": asset.name,
            "breed": asset.breed,
            "category": asset.category,
            "owner_identity": asset.owner_identity,
            "weight_kg": asset.current_weight_kg,
            "health_score": asset.health_score,
        }),
    );

    {
        let mut db = state.db.lock().await;
        livestock::register(&mut db, &asset, &birth)?;
    }

    info!(asset_id, category = %asset.category, "livestock registered");
    state.event_bus.emit(Event::new(
        LIVESTOCK_REGISTERED,
        now,
        serde_json::json!({"asset_id": asset_id, "category": asset.category}),
    ));
    to_json(&asset)
}

pub async fn get_livestock(state: &Arc<DaemonState>, params: &Value) -> Result {
    let asset_id = str_param(params, "asset_id")?;
    let db = state.db.lock().await;
    to_json(&livestock::get(&db, asset_id)?)
}

/// List animals, optionally by lifecycle status.
pub async fn list_livestock(state: &Arc<DaemonState>, params: &Value) -> Result {
    let status = match opt_str_param(params, "status") {
        Some(s) => Some(
            LifecycleStatus::parse(s)
                .ok_or_else(|| RpcError::invalid_params("status must be active/ready/sold/settled"))?,
        ),
        None => None,
    };
    let db = state.db.lock().await;
    to_json(&livestock::list(&db, status)?)
}

/// Supply-chain history, oldest first. Readable in every state.
pub async fn get_livestock_history(state: &Arc<DaemonState>, params: &Value) -> Result {
    let asset_id = str_param(params, "asset_id")?;
    let db = state.db.lock().await;
    // Unknown ids are an error, not an empty history.
    livestock::get(&db, asset_id)?;
    to_json(&events::history(&db, asset_id)?)
}

pub async fn assign_owner(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = require_admin(state, params)?;
    let asset_id = str_param(params, "asset_id")?;
    let owner = Identity::from(str_param(params, "owner_identity")?);
    mutate(state, asset_id, Payout::Affected, |asset| {
        lifecycle::assign_owner(asset, owner, &caller, crate::now())
    })
    .await
}

pub async fn update_weight(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = require_admin(state, params)?;
    let asset_id = str_param(params, "asset_id")?;
    let weight = params
        .get("weight_kg")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| RpcError::invalid_params("weight_kg required"))?;
    let note = opt_str_param(params, "notes").unwrap_or_default();
    mutate(state, asset_id, Payout::Unaffected, |asset| {
        lifecycle::update_weight(asset, weight, note, &caller, crate::now())
    })
    .await
}

pub async fn record_health_check(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = require_admin(state, params)?;
    let asset_id = str_param(params, "asset_id")?;
    let score = health_param(params, "health_score")?
        .ok_or_else(|| RpcError::invalid_params("health_score required"))?;
    let findings = opt_str_param(params, "findings").unwrap_or_default();
    let veterinarian = opt_str_param(params, "veterinarian").unwrap_or(caller.as_str()).to_string();
    mutate(state, asset_id, Payout::Unaffected, |asset| {
        lifecycle::record_health_check(asset, score, findings, &veterinarian, crate::now())
    })
    .await
}

pub async fn record_vaccination(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = require_admin(state, params)?;
    let asset_id = str_param(params, "asset_id")?;
    let vaccine = str_param(params, "vaccine")?;
    let batch = opt_str_param(params, "batch").unwrap_or_default();
    let veterinarian = opt_str_param(params, "veterinarian").unwrap_or(caller.as_str()).to_string();
    mutate(state, asset_id, Payout::Unaffected, |asset| {
        lifecycle::record_vaccination(asset, vaccine, batch, &veterinarian, crate::now())
    })
    .await
}

pub async fn mark_ready(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = require_admin(state, params)?;
    let asset_id = str_param(params, "asset_id")?;
    mutate(state, asset_id, Payout::Affected, |asset| {
        lifecycle::mark_ready(asset, &caller, crate::now())
    })
    .await
}

/// Retail sale of a ready animal.
pub async fn mark_sold(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = require_admin(state, params)?;
    let asset_id = str_param(params, "asset_id")?;
    let buyer = opt_str_param(params, "buyer_identity").map(Identity::from);
    mutate(state, asset_id, Payout::Affected, |asset| {
        lifecycle::mark_sold(asset, buyer.as_ref(), &caller, crate::now())
    })
    .await
}
