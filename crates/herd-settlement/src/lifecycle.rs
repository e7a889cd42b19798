//! Asset lifecycle state machine.
//!
//! ```text
//! active ──mark ready──▶ ready ──sell──▶ sold      (terminal)
//!   │                      │
//!   └──────settle──────────┴──────────▶ settled   (terminal)
//! ```
//!
//! Every mutating operation returns the [`SupplyChainEvent`] describing it so
//! the caller can persist the new asset state and the history entry together.
//! None of these functions touch `version`; the store bumps it on write.

use herd_types::events::{SupplyChainEvent, SupplyChainEventKind};
use herd_types::livestock::{LifecycleStatus, LivestockAsset};
use herd_types::settlement::SettlementRecord;
use herd_types::{Identity, Timestamp, MAX_HEALTH_SCORE};

use crate::{Result, SettlementError};

/// Check that `from -> to` is a permitted transition.
///
/// # Errors
///
/// - [`SettlementError::TerminalState`] if `from` is terminal
/// - [`SettlementError::InvalidTransition`] for any other disallowed edge
pub fn check_transition(from: LifecycleStatus, to: LifecycleStatus) -> Result<()> {
    use LifecycleStatus::*;

    if from.is_terminal() {
        return Err(SettlementError::TerminalState {
            status: from,
            attempted: to,
        });
    }

    match (from, to) {
        (Active, Ready) | (Ready, Sold) | (Active, Settled) | (Ready, Settled) => Ok(()),
        _ => Err(SettlementError::InvalidTransition { from, to }),
    }
}

/// Refuse any mutation of a terminal asset.
pub fn ensure_mutable(asset: &LivestockAsset) -> Result<()> {
    if asset.is_terminal() {
        return Err(SettlementError::TerminalState {
            status: asset.lifecycle_status,
            attempted: asset.lifecycle_status,
        });
    }
    Ok(())
}

/// Move an active asset to `ready`. Weight and health score must be known.
pub fn mark_ready(asset: &mut LivestockAsset, actor: &str, now: Timestamp) -> Result<SupplyChainEvent> {
    check_transition(asset.lifecycle_status, LifecycleStatus::Ready)?;

    let weight = asset.current_weight_kg.ok_or_else(|| SettlementError::NotReady {
        asset_id: asset.id.clone(),
        field: "current weight",
    })?;
    let health = asset.health_score.ok_or_else(|| SettlementError::NotReady {
        asset_id: asset.id.clone(),
        field: "health score",
    })?;

    asset.lifecycle_status = LifecycleStatus::Ready;
    asset.updated_at = now;

    Ok(SupplyChainEvent::new(
        asset.id.clone(),
        SupplyChainEventKind::StatusChange,
        actor,
        now,
        serde_json::json!({
            "status": LifecycleStatus::Ready,
            "weight_kg": weight,
            "health_score": health,
            "note": "marked ready for sale",
        }),
    ))
}

/// Retail exit: `ready -> sold`.
pub fn mark_sold(
    asset: &mut LivestockAsset,
    buyer: Option<&Identity>,
    actor: &str,
    now: Timestamp,
) -> Result<SupplyChainEvent> {
    check_transition(asset.lifecycle_status, LifecycleStatus::Sold)?;

    asset.lifecycle_status = LifecycleStatus::Sold;
    asset.updated_at = now;

    Ok(SupplyChainEvent::new(
        asset.id.clone(),
        SupplyChainEventKind::Sale,
        actor,
        now,
        serde_json::json!({ "buyer": buyer }),
    ))
}

/// Slaughter exit. Only called once payment and certificate both succeeded.
pub fn apply_settlement(
    asset: &mut LivestockAsset,
    record: &SettlementRecord,
    actor: &str,
) -> Result<SupplyChainEvent> {
    check_transition(asset.lifecycle_status, LifecycleStatus::Settled)?;

    asset.lifecycle_status = LifecycleStatus::Settled;
    asset.current_weight_kg = Some(record.slaughter.final_weight_kg);
    asset.updated_at = record.settled_at;

    let mut event = SupplyChainEvent::new(
        asset.id.clone(),
        SupplyChainEventKind::Slaughter,
        actor,
        record.slaughter.slaughtered_at,
        serde_json::json!({
            "facility": record.slaughter.facility,
            "final_weight_kg": record.slaughter.final_weight_kg,
            "payment_token": record.payment_token,
            "farmer_amount": record.result.farmer_amount,
            "platform_amount": record.result.platform_amount,
        }),
    );
    event.content_ref = Some(record.certificate.clone());
    Ok(event)
}

/// Record a new weight measurement.
pub fn update_weight(
    asset: &mut LivestockAsset,
    weight_kg: f64,
    note: &str,
    actor: &str,
    now: Timestamp,
) -> Result<SupplyChainEvent> {
    ensure_mutable(asset)?;
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(SettlementError::InvalidWeight(weight_kg));
    }

    let previous = asset.current_weight_kg;
    asset.current_weight_kg = Some(weight_kg);
    asset.updated_at = now;

    Ok(SupplyChainEvent::new(
        asset.id.clone(),
        SupplyChainEventKind::WeightUpdate,
        actor,
        now,
        serde_json::json!({
            "current_weight_kg": weight_kg,
            "previous_weight_kg": previous,
            "weight_gain_kg": previous.map(|p| weight_kg - p),
            "notes": note,
        }),
    ))
}

/// Record a veterinary health check.
pub fn record_health_check(
    asset: &mut LivestockAsset,
    score: u8,
    findings: &str,
    veterinarian: &str,
    now: Timestamp,
) -> Result<SupplyChainEvent> {
    ensure_mutable(asset)?;
    if score > MAX_HEALTH_SCORE {
        return Err(SettlementError::InvalidHealthScore(score));
    }

    asset.health_score = Some(score);
    asset.updated_at = now;

    Ok(SupplyChainEvent::new(
        asset.id.clone(),
        SupplyChainEventKind::HealthCheck,
        veterinarian,
        now,
        serde_json::json!({
            "health_score": score,
            "findings": findings,
            "checked_by": veterinarian,
        }),
    ))
}

/// Record a vaccination. Does not change the asset beyond `updated_at`.
pub fn record_vaccination(
    asset: &mut LivestockAsset,
    vaccine: &str,
    batch: &str,
    veterinarian: &str,
    now: Timestamp,
) -> Result<SupplyChainEvent> {
    ensure_mutable(asset)?;
    asset.updated_at = now;

    Ok(SupplyChainEvent::new(
        asset.id.clone(),
        SupplyChainEventKind::Vaccination,
        veterinarian,
        now,
        serde_json::json!({
            "vaccine": vaccine,
            "batch": batch,
            "administered_by": veterinarian,
        }),
    ))
}

/// Assign the asset to an investor wallet.
pub fn assign_owner(
    asset: &mut LivestockAsset,
    owner: Identity,
    actor: &str,
    now: Timestamp,
) -> Result<SupplyChainEvent> {
    ensure_mutable(asset)?;

    let previous = asset.owner_identity.replace(owner.clone());
    asset.updated_at = now;

    Ok(SupplyChainEvent::new(
        asset.id.clone(),
        SupplyChainEventKind::Transfer,
        actor,
        now,
        serde_json::json!({ "from": previous, "to": owner }),
    ))
}
