//! # herd-types
//!
//! Shared domain types used across the herd workspace: livestock assets,
//! split configurations, settlement inputs/results and supply-chain events.
//!
//! All monetary amounts are integer micro-units (see [`MICRO_UNITS_PER_UNIT`]).

pub mod events;
pub mod livestock;
pub mod settlement;
pub mod split;
pub mod wallet;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monetary amount in micro-units.
pub type Amount = u64;

/// Opaque asset identifier.
pub type AssetId = String;

/// Opaque split configuration identifier.
pub type SplitId = String;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Micro-units per whole unit (1 unit = 1,000,000 micro-units).
pub const MICRO_UNITS_PER_UNIT: u64 = 1_000_000;

/// Category used as the fallback when no config matches an asset's category.
pub const STANDARD_CATEGORY: &str = "standard";

/// Upper bound of the health score scale.
pub const MAX_HEALTH_SCORE: u8 = 100;

/// A wallet identity (ledger address) of a farmer, investor, platform or admin.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ts_rs::TS)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masked form for display: first six and last four characters.
    ///
    /// Identities too short to mask are returned unchanged.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 10 {
            return self.0.clone();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}
