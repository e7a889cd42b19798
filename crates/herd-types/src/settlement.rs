//! Settlement inputs, results and the persisted settlement record.

use serde::{Deserialize, Serialize};

use crate::split::SplitConfig;
use crate::{Amount, AssetId, Identity, SplitId, Timestamp};

/// Facts needed to compute a disbursement.
///
/// `expenses` may exceed `gross_amount`; the calculator rejects the
/// resulting negative net rather than the input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementInput {
    pub gross_amount: Amount,
    pub expenses: Amount,
    pub split: SplitConfig,
}

/// Computed disbursement amounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
pub struct SettlementResult {
    pub net_amount: Amount,
    pub farmer_amount: Amount,
    pub platform_amount: Amount,
}

impl SettlementResult {
    /// Sub-unit rounding residue that neither party receives.
    pub fn remainder(&self) -> Amount {
        self.net_amount - self.farmer_amount - self.platform_amount
    }
}

/// One leg of a grouped payment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
pub struct Disbursement {
    pub payee: Identity,
    pub amount: Amount,
}

/// Slaughter facts recorded on the certificate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
pub struct SlaughterInfo {
    pub facility: String,
    pub slaughtered_at: Timestamp,
    pub final_weight_kg: f64,
}

/// Proof that a grouped payment landed on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct PaymentReceipt {
    /// Ledger transaction (group) id.
    pub token: String,
    /// Caller-chosen idempotency reference used for reconciliation reads.
    pub reference: String,
    pub disbursements: Vec<Disbursement>,
    pub confirmed_at: Timestamp,
}

/// Opaque content reference returned by the certificate issuer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
pub struct ContentRef(pub String);

/// Document handed to the certificate issuer once the payment has landed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
pub struct SettlementCertificate {
    pub asset_id: AssetId,
    pub asset_name: String,
    pub breed: String,
    pub result: SettlementResult,
    pub payment_token: String,
    pub slaughter: SlaughterInfo,
}

/// The immutable audit record written when an asset settles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
pub struct SettlementRecord {
    pub asset_id: AssetId,
    pub split_id: SplitId,
    pub farmer_share: u8,
    pub platform_share: u8,
    pub gross_amount: Amount,
    pub expenses: Amount,
    pub result: SettlementResult,
    pub farmer: Identity,
    pub platform: Identity,
    pub payment_token: String,
    pub certificate: ContentRef,
    pub slaughter: SlaughterInfo,
    pub settled_at: Timestamp,
}
