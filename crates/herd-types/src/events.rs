//! Supply-chain history events.
//!
//! Every mutation of a livestock asset appends one event. History stays
//! readable after the asset reaches a terminal state.

use serde::{Deserialize, Serialize};

use crate::settlement::ContentRef;
use crate::{AssetId, Timestamp};

/// Kind of supply-chain event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum SupplyChainEventKind {
    Birth,
    Transfer,
    WeightUpdate,
    HealthCheck,
    Vaccination,
    StatusChange,
    Sale,
    Slaughter,
}

impl SupplyChainEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Birth => "birth",
            Self::Transfer => "transfer",
            Self::WeightUpdate => "weight_update",
            Self::HealthCheck => "health_check",
            Self::Vaccination => "vaccination",
            Self::StatusChange => "status_change",
            Self::Sale => "sale",
            Self::Slaughter => "slaughter",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "birth" => Some(Self::Birth),
            "transfer" => Some(Self::Transfer),
            "weight_update" => Some(Self::WeightUpdate),
            "health_check" => Some(Self::HealthCheck),
            "vaccination" => Some(Self::Vaccination),
            "status_change" => Some(Self::StatusChange),
            "sale" => Some(Self::Sale),
            "slaughter" => Some(Self::Slaughter),
            _ => None,
        }
    }
}

/// One entry of an asset's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplyChainEvent {
    pub asset_id: AssetId,
    pub kind: SupplyChainEventKind,
    /// Identity or name of whoever performed the action.
    pub actor: String,
    pub timestamp: Timestamp,
    /// Kind-specific payload.
    pub data: serde_json::Value,
    pub content_ref: Option<ContentRef>,
}

impl SupplyChainEvent {
    pub fn new(
        asset_id: impl Into<AssetId>,
        kind: SupplyChainEventKind,
        actor: impl Into<String>,
        timestamp: Timestamp,
        data: serde_json::Value,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            kind,
            actor: actor.into(),
            timestamp,
            data,
            content_ref: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_storage_form() {
        for kind in [
            SupplyChainEventKind::Birth,
            SupplyChainEventKind::Transfer,
            SupplyChainEventKind::WeightUpdate,
            SupplyChainEventKind::HealthCheck,
            SupplyChainEventKind::Vaccination,
            SupplyChainEventKind::StatusChange,
            SupplyChainEventKind::Sale,
            SupplyChainEventKind::Slaughter,
        ] {
            assert_eq!(SupplyChainEventKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_kind_serde_matches_storage_form() {
        let json = serde_json::to_string(&SupplyChainEventKind::WeightUpdate).expect("serialize");
        assert_eq!(json, "\"weight_update\"");
    }
}
