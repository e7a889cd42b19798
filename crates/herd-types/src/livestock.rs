//! Livestock asset structures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AssetId, Identity, Timestamp};

/// Lifecycle status of a tokenized animal.
///
/// `Sold` and `Settled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Fattening on the ranch.
    Active,
    /// Marked ready for sale or slaughter.
    Ready,
    /// Retail exit.
    Sold,
    /// Slaughter exit: payment split and certificate issued.
    Settled,
}

impl LifecycleStatus {
    /// Whether no further transition is permitted from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sold | Self::Settled)
    }

    /// Stable string form used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ready => "ready",
            Self::Sold => "sold",
            Self::Settled => "settled",
        }
    }

    /// Parse the storage form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "ready" => Some(Self::Ready),
            "sold" => Some(Self::Sold),
            "settled" => Some(Self::Settled),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tokenized animal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
pub struct LivestockAsset {
    pub id: AssetId,
    pub name: String,
    pub breed: String,
    /// Split-config category key, e.g. "standard" or "premium".
    pub category: String,
    /// Current investor wallet, if assigned.
    pub owner_identity: Option<Identity>,
    pub current_weight_kg: Option<f64>,
    /// 0-100.
    pub health_score: Option<u8>,
    pub lifecycle_status: LifecycleStatus,
    /// Optimistic concurrency version, bumped on every persisted mutation.
    pub version: u64,
    pub registered_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LivestockAsset {
    /// A freshly registered asset in the `Active` state.
    pub fn register(
        id: impl Into<AssetId>,
        name: impl Into<String>,
        breed: impl Into<String>,
        category: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            breed: breed.into(),
            category: category.into(),
            owner_identity: None,
            current_weight_kg: None,
            health_score: None,
            lifecycle_status: LifecycleStatus::Active,
            version: 0,
            registered_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.lifecycle_status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!LifecycleStatus::Active.is_terminal());
        assert!(!LifecycleStatus::Ready.is_terminal());
        assert!(LifecycleStatus::Sold.is_terminal());
        assert!(LifecycleStatus::Settled.is_terminal());
    }

    #[test]
    fn test_status_storage_form() {
        for status in [
            LifecycleStatus::Active,
            LifecycleStatus::Ready,
            LifecycleStatus::Sold,
            LifecycleStatus::Settled,
        ] {
            assert_eq!(LifecycleStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LifecycleStatus::parse("slaughtered"), None);
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&LifecycleStatus::Settled).expect("serialize");
        assert_eq!(json, "\"settled\"");
    }

    #[test]
    fn test_register_starts_active() {
        let asset = LivestockAsset::register("cow-1", "Bessie", "Angus", "premium", 1_700_000_000);
        assert_eq!(asset.lifecycle_status, LifecycleStatus::Active);
        assert_eq!(asset.version, 0);
        assert!(asset.owner_identity.is_none());
        assert!(!asset.is_terminal());
    }
}
