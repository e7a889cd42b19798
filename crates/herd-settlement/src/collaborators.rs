//! Interfaces to the systems a settlement drives.
//!
//! Implementors provide the actual ledger, certificate storage and asset
//! persistence. The workflow only sees these traits, so it can be tested
//! against in-memory doubles.

use std::future::Future;

use herd_types::events::SupplyChainEvent;
use herd_types::livestock::LivestockAsset;
use herd_types::settlement::{
    ContentRef, Disbursement, PaymentReceipt, SettlementCertificate, SettlementRecord,
};
use herd_types::split::SplitConfig;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// No confirmation within the allotted time. The operation may still land.
    #[error("timed out waiting for confirmation")]
    Timeout,

    /// Temporary failure; the same call may succeed later.
    #[error("temporarily unavailable: {0}")]
    Unavailable(String),

    /// Permanent refusal.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The stored asset changed since it was read.
    #[error("version conflict on asset {asset_id}: expected version {expected}")]
    Conflict { asset_id: String, expected: u64 },

    #[error("not found: {0}")]
    NotFound(String),
}

impl CollaboratorError {
    /// Whether retrying the same call can help.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable(_))
    }
}

/// Ledger access for grouped payments.
///
/// `submit_group` must execute all legs or none. `reference` is an
/// idempotency key: `find_payment` returns the receipt of a group submitted
/// under it, which is how a caller learns whether a timed-out submission
/// actually landed.
pub trait PaymentGateway: Send + Sync {
    fn submit_group(
        &self,
        reference: &str,
        disbursements: &[Disbursement],
    ) -> impl Future<Output = Result<PaymentReceipt, CollaboratorError>> + Send;

    fn find_payment(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<Option<PaymentReceipt>, CollaboratorError>> + Send;
}

/// Certificate storage (content-addressed pinning in production).
pub trait CertificateIssuer: Send + Sync {
    fn issue(
        &self,
        certificate: &SettlementCertificate,
    ) -> impl Future<Output = Result<ContentRef, CollaboratorError>> + Send;
}

/// Split configuration store. The resolver only reads from it.
pub trait ConfigStore: Send + Sync {
    /// Active configs in insertion order.
    fn list_active_configs(&self) -> impl Future<Output = Result<Vec<SplitConfig>, CollaboratorError>> + Send;

    fn save(&self, config: &SplitConfig) -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}

/// Everything written when an asset settles.
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementCommit {
    pub record: SettlementRecord,
    /// The asset in its new `settled` state.
    pub asset: LivestockAsset,
    pub event: SupplyChainEvent,
}

/// Asset persistence used by the settlement workflow.
pub trait AssetBook: Send + Sync {
    fn load_asset(&self, asset_id: &str) -> impl Future<Output = Result<LivestockAsset, CollaboratorError>> + Send;

    /// Persist record, asset state and history entry in one transaction.
    ///
    /// Must fail with [`CollaboratorError::Conflict`] if the stored asset's
    /// version is no longer `expected_version`.
    fn commit_settlement(
        &self,
        commit: &SettlementCommit,
        expected_version: u64,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}
