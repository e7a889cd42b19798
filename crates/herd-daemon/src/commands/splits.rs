//! Revenue split configuration command handlers.

use std::sync::Arc;

use herd_db::queries::splits;
use herd_settlement::calculator::validate_split;
use herd_types::split::SplitConfig;
use herd_types::STANDARD_CATEGORY;
use serde_json::Value;
use tracing::{info, warn};

use super::{opt_str_param, str_param, to_json, u64_param};
use crate::events::{Event, SPLIT_CONFIG_SAVED};
use crate::rpc::{require_admin, RpcError};
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn share_param(params: &Value, name: &str) -> std::result::Result<u8, RpcError> {
    u8::try_from(u64_param(params, name)?)
        .map_err(|_| RpcError::invalid_params(&format!("{name} must be 0-100")))
}

/// All configs in resolution order. `active_only` restricts to active ones.
pub async fn list_split_configs(state: &Arc<DaemonState>, params: &Value) -> Result {
    let active_only = params
        .get("active_only")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let db = state.db.lock().await;
    let configs = if active_only {
        splits::list_active(&db)?
    } else {
        splits::list(&db)?
    };
    to_json(&configs)
}

/// Create or replace a config. Shares must sum to 100.
pub async fn save_split_config(state: &Arc<DaemonState>, params: &Value) -> Result {
    require_admin(state, params)?;

    let mut config = SplitConfig::new(
        str_param(params, "id")?,
        opt_str_param(params, "category").unwrap_or(STANDARD_CATEGORY),
        share_param(params, "farmer_share")?,
        share_param(params, "platform_share")?,
    );
    config.description = opt_str_param(params, "description").map(str::to_string);
    config.active = params.get("active").and_then(|v| v.as_bool()).unwrap_or(true);

    if let Err(e) = validate_split(&config) {
        warn!(split_id = %config.id, "split config rejected: {e}");
        return Err(e.into());
    }

    {
        let db = state.db.lock().await;
        splits::upsert(&db, &config)?;
    }

    info!(
        split_id = %config.id,
        category = %config.category,
        farmer = config.farmer_share,
        platform = config.platform_share,
        "split config saved"
    );
    state.event_bus.emit(Event::new(
        SPLIT_CONFIG_SAVED,
        crate::now(),
        serde_json::json!({"split_id": config.id, "category": config.category, "active": config.active}),
    ));
    to_json(&config)
}

pub async fn set_split_config_active(state: &Arc<DaemonState>, params: &Value) -> Result {
    require_admin(state, params)?;
    let id = str_param(params, "id")?;
    let active = params
        .get("active")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| RpcError::invalid_params("active required"))?;

    let config = {
        let db = state.db.lock().await;
        splits::set_active(&db, id, active)?;
        splits::get(&db, id)?
    };
    info!(split_id = id, active, "split config activation changed");
    to_json(&config)
}
