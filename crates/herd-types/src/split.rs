//! Revenue split configuration.

use serde::{Deserialize, Serialize};

use crate::{SplitId, STANDARD_CATEGORY};

/// Default farmer share percentage when no config applies.
pub const DEFAULT_FARMER_SHARE: u8 = 70;

/// Default platform share percentage when no config applies.
pub const DEFAULT_PLATFORM_SHARE: u8 = 30;

/// Identifier of the hard-coded fallback split.
pub const DEFAULT_SPLIT_ID: &str = "default";

/// A named rule mapping a livestock category to a farmer/platform split.
///
/// `farmer_share + platform_share` must equal 100. The invariant is checked
/// when a config is saved and again before every settlement, since persisted
/// rows can be corrupted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct SplitConfig {
    pub id: SplitId,
    pub category: String,
    pub farmer_share: u8,
    pub platform_share: u8,
    pub description: Option<String>,
    pub active: bool,
}

impl SplitConfig {
    pub fn new(
        id: impl Into<SplitId>,
        category: impl Into<String>,
        farmer_share: u8,
        platform_share: u8,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            farmer_share,
            platform_share,
            description: None,
            active: true,
        }
    }

    /// The hard-coded 70/30 fallback.
    pub fn fallback() -> Self {
        Self {
            id: DEFAULT_SPLIT_ID.to_string(),
            category: STANDARD_CATEGORY.to_string(),
            farmer_share: DEFAULT_FARMER_SHARE,
            platform_share: DEFAULT_PLATFORM_SHARE,
            description: Some("built-in default split".to_string()),
            active: true,
        }
    }

    /// Sum of both shares, widened so corrupt values cannot overflow.
    pub fn total_share(&self) -> u16 {
        u16::from(self.farmer_share) + u16::from(self.platform_share)
    }
}
