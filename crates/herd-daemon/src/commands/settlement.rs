//! Slaughter settlement command handlers.
//!
//! Amounts on the wire are integer micro-units.

use std::sync::Arc;

use herd_db::queries::settlements;
use herd_settlement::workflow::SettlementRequest;
use herd_settlement::SettlementError;
use herd_types::settlement::SlaughterInfo;
use herd_types::Identity;
use serde_json::Value;

use super::{opt_str_param, str_param, to_json, u64_param};
use crate::events::{Event, BOOKKEEPING_PENDING, SETTLEMENT_COMMITTED, SETTLEMENT_REJECTED};
use crate::rpc::{require_admin, RpcError};
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

const DEFAULT_LIST_LIMIT: u64 = 100;

/// Compute what a settlement would pay without paying or changing anything.
pub async fn preview_settlement(state: &Arc<DaemonState>, params: &Value) -> Result {
    let asset_id = str_param(params, "asset_id")?;
    let gross = u64_param(params, "gross_amount")?;
    let expenses = u64_param(params, "expenses")?;

    let preview = state.workflow.preview(asset_id, gross, expenses).await?;
    Ok(serde_json::json!({
        "asset_id": asset_id,
        "split": preview.split,
        "result": preview.result,
        "remainder": preview.result.remainder(),
    }))
}

/// Settle a slaughtered animal: pay farmer and platform, then record.
pub async fn settle_livestock(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = require_admin(state, params)?;
    let final_weight_kg = params
        .get("final_weight_kg")
        .and_then(|v| v.as_f64())
        .filter(|kg| kg.is_finite() && *kg > 0.0)
        .ok_or_else(|| RpcError::invalid_params("final_weight_kg must be a positive number"))?;

    let now = crate::now();
    let request = SettlementRequest {
        asset_id: str_param(params, "asset_id")?.to_string(),
        gross_amount: u64_param(params, "gross_amount")?,
        expenses: u64_param(params, "expenses")?,
        farmer: opt_str_param(params, "farmer_identity").map(Identity::from),
        slaughter: SlaughterInfo {
            facility: str_param(params, "facility")?.to_string(),
            slaughtered_at: params
                .get("slaughtered_at")
                .and_then(|v| v.as_u64())
                .unwrap_or(now),
            final_weight_kg,
        },
        actor: caller,
    };

    match state.workflow.settle(&request, now).await {
        Ok(record) => {
            state.event_bus.emit(Event::new(
                SETTLEMENT_COMMITTED,
                now,
                serde_json::json!({
                    "asset_id": record.asset_id,
                    "payment_token": record.payment_token,
                    "certificate": record.certificate,
                    "farmer_amount": record.result.farmer_amount,
                    "platform_amount": record.result.platform_amount,
                }),
            ));
            to_json(&record)
        }
        Err(e) => {
            let event = match &e {
                SettlementError::BookkeepingPending { token, .. } => Event::new(
                    BOOKKEEPING_PENDING,
                    now,
                    serde_json::json!({"asset_id": request.asset_id, "payment_token": token}),
                ),
                _ => Event::new(
                    SETTLEMENT_REJECTED,
                    now,
                    serde_json::json!({"asset_id": request.asset_id, "kind": e.kind()}),
                ),
            };
            state.event_bus.emit(event);
            Err(e.into())
        }
    }
}

pub async fn get_settlement(state: &Arc<DaemonState>, params: &Value) -> Result {
    let asset_id = str_param(params, "asset_id")?;
    let db = state.db.lock().await;
    match settlements::get(&db, asset_id)? {
        Some(record) => to_json(&record),
        None => Err(RpcError::not_found(&format!("settlement for '{asset_id}'"))),
    }
}

/// Most recent settlements first.
pub async fn list_settlements(state: &Arc<DaemonState>, params: &Value) -> Result {
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(u64::from(u32::MAX)) as u32;
    let db = state.db.lock().await;
    to_json(&settlements::recent(&db, limit)?)
}

/// Certificate document by content reference.
pub async fn get_certificate(state: &Arc<DaemonState>, params: &Value) -> Result {
    let content_ref = str_param(params, "content_ref")?;
    state
        .workflow
        .certificates()
        .get(content_ref)
        .await?
        .ok_or_else(|| RpcError::not_found(&format!("certificate '{content_ref}'")))
}
