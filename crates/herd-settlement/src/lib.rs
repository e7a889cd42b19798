//! # herd-settlement
//!
//! Slaughter settlement for tokenized livestock.
//!
//! A settlement resolves the revenue split for an animal's category, computes
//! the farmer/platform disbursement from the sale proceeds, pays both parties
//! in one grouped ledger payment and records the certificate before the
//! animal reaches its terminal `settled` state.
//!
//! ## Modules
//!
//! - [`resolver`]: First-match split selection with the 70/30 fallback
//! - [`calculator`]: Pure net/farmer/platform computation
//! - [`lifecycle`]: Asset state machine and mutation guards
//! - [`collaborators`]: Payment, certificate and storage interfaces
//! - [`locks`]: Per-asset serialization
//! - [`workflow`]: Pay-then-record settlement orchestration

pub mod calculator;
pub mod collaborators;
pub mod lifecycle;
pub mod locks;
pub mod resolver;
pub mod workflow;

use herd_types::livestock::LifecycleStatus;
use herd_types::{Amount, AssetId, SplitId};

pub use collaborators::CollaboratorError;

/// Error types for settlement operations.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    /// A split configuration's shares do not sum to 100.
    #[error("split {split_id} shares must sum to 100, got {farmer_share} + {platform_share} = {total}")]
    Configuration {
        split_id: SplitId,
        farmer_share: u8,
        platform_share: u8,
        total: u16,
    },

    /// Expenses exceed gross proceeds.
    #[error("expenses {expenses} exceed gross proceeds {gross}; correct the expenses before settling")]
    NegativeSettlement {
        /// Gross sale amount in micro-units.
        gross: Amount,
        /// Recorded expenses in micro-units.
        expenses: Amount,
    },

    /// A transition out of a terminal lifecycle state was attempted.
    #[error("asset is {status} (terminal); transition to {attempted} refused")]
    TerminalState {
        status: LifecycleStatus,
        attempted: LifecycleStatus,
    },

    /// The lifecycle does not allow this transition.
    #[error("transition {from} -> {to} is not permitted")]
    InvalidTransition {
        from: LifecycleStatus,
        to: LifecycleStatus,
    },

    /// The asset lacks a field required to mark it ready.
    #[error("asset {asset_id} has no {field}; record it before marking ready")]
    NotReady {
        asset_id: AssetId,
        field: &'static str,
    },

    /// Health score outside 0-100.
    #[error("health score {0} out of range 0-100")]
    InvalidHealthScore(u8),

    /// Weight must be a positive, finite number of kilograms.
    #[error("invalid weight {0} kg")]
    InvalidWeight(f64),

    /// Neither the request nor the asset names a farmer payee.
    #[error("no farmer payee for asset {0}")]
    MissingPayee(AssetId),

    /// The grouped payment was not made; nothing changed.
    #[error("payment not made: {0}")]
    Payment(CollaboratorError),

    /// A payment already on the ledger for this asset differs from the
    /// disbursement computed now.
    #[error("payment {token} for asset {asset_id} does not match the computed disbursement")]
    ReconciliationMismatch { asset_id: AssetId, token: String },

    /// The payment landed but the certificate or record could not be written.
    /// Re-running the settlement resumes bookkeeping without paying again.
    #[error("payment {token} for asset {asset_id} landed but bookkeeping failed: {source}")]
    BookkeepingPending {
        asset_id: AssetId,
        token: String,
        #[source]
        source: CollaboratorError,
    },

    /// A settlement payment for the asset is already on the ledger, so the
    /// asset may not leave the settlement path or change payee.
    #[error("payment {token} for asset {asset_id} landed; finish the settlement first")]
    PaymentLanded { asset_id: AssetId, token: String },

    /// Reading the asset or split configs failed.
    #[error("store error: {0}")]
    Store(CollaboratorError),
}

impl SettlementError {
    /// Whether this error signals a workflow bug rather than a business-rule
    /// rejection an operator can correct.
    pub fn is_workflow_bug(&self) -> bool {
        matches!(self, Self::TerminalState { .. })
    }

    /// Stable machine-readable name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::NegativeSettlement { .. } => "NEGATIVE_SETTLEMENT",
            Self::TerminalState { .. } => "TERMINAL_STATE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotReady { .. } => "NOT_READY",
            Self::InvalidHealthScore(_) => "INVALID_HEALTH_SCORE",
            Self::InvalidWeight(_) => "INVALID_WEIGHT",
            Self::MissingPayee(_) => "MISSING_PAYEE",
            Self::Payment(_) => "PAYMENT_FAILED",
            Self::ReconciliationMismatch { .. } => "RECONCILIATION_MISMATCH",
            Self::BookkeepingPending { .. } => "BOOKKEEPING_PENDING",
            Self::PaymentLanded { .. } => "PAYMENT_LANDED",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

/// Convenience result type for settlement operations.
pub type Result<T> = std::result::Result<T, SettlementError>;
