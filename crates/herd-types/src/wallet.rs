//! Custodial wallet view.

use serde::{Deserialize, Serialize};

use crate::{Identity, Timestamp};

/// Public view of a custodial wallet. Sealed key material never leaves the
/// database layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct CustodialWallet {
    pub identity: Identity,
    /// Account holder contact, e.g. an email address.
    pub owner_email: String,
    pub created_at: Timestamp,
}
