//! Settlement workflow.
//!
//! Drives one slaughter settlement end to end:
//!
//! 1. serialize on the asset id ([`AssetLocks`])
//! 2. load the asset; refuse terminal states
//! 3. resolve the split and run the calculator
//! 4. pay farmer and platform as one grouped payment
//! 5. issue the certificate
//! 6. commit record, `settled` state and history entry together
//!
//! Payment is never retried: a submission that times out is followed by a
//! reconciliation read under the same reference, and a payment found there
//! is reused. Steps 5 and 6 are bookkeeping and are retried on transient
//! failures. If bookkeeping still fails the asset keeps its prior state and
//! [`SettlementError::BookkeepingPending`] is returned; running the
//! settlement again finds the landed payment and resumes at step 5. Until it
//! does, [`SettlementWorkflow::ensure_no_landed_payment`] refuses mutations
//! that would strand that payment.

use std::future::Future;
use std::time::Duration;

use herd_types::livestock::{LifecycleStatus, LivestockAsset};
use herd_types::settlement::{
    PaymentReceipt, SettlementCertificate, SettlementInput, SettlementRecord, SettlementResult,
    SlaughterInfo,
};
use herd_types::split::SplitConfig;
use herd_types::{Amount, AssetId, Identity, Timestamp};
use tracing::{debug, error, info, warn};

use crate::calculator::{calculate, disbursement_pair};
use crate::collaborators::{
    AssetBook, CertificateIssuer, CollaboratorError, ConfigStore, PaymentGateway, SettlementCommit,
};
use crate::lifecycle;
use crate::locks::AssetLocks;
use crate::resolver::resolve_split;
use crate::{Result, SettlementError};

/// Default number of bookkeeping retries after the first attempt.
pub const DEFAULT_BOOKKEEPING_RETRIES: u32 = 5;

/// Default base delay between bookkeeping retries.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Default wait for payment confirmation.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Workflow settings.
#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    /// Payee of the platform share.
    pub platform: Identity,
    pub bookkeeping_retries: u32,
    /// Retry `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    pub confirmation_timeout: Duration,
}

impl WorkflowConfig {
    pub fn new(platform: Identity) -> Self {
        Self {
            platform,
            bookkeeping_retries: DEFAULT_BOOKKEEPING_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

/// Operator's request to settle one asset.
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementRequest {
    pub asset_id: AssetId,
    pub gross_amount: Amount,
    pub expenses: Amount,
    /// Farmer payee; defaults to the asset's owner.
    pub farmer: Option<Identity>,
    pub slaughter: SlaughterInfo,
    /// Operator identity recorded on the history entry.
    pub actor: String,
}

/// Result of a dry run: what would be paid, with nothing submitted.
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementPreview {
    pub split: SplitConfig,
    pub result: SettlementResult,
}

/// Idempotency reference under which an asset's settlement payment is made.
pub fn settlement_reference(asset_id: &str) -> String {
    format!("settlement:{asset_id}")
}

/// Delay before bookkeeping retry `attempt`, saturating instead of overflowing.
pub fn retry_delay(backoff: Duration, attempt: u32) -> Duration {
    backoff.checked_mul(attempt).unwrap_or(Duration::MAX)
}

/// The settlement orchestrator.
pub struct SettlementWorkflow<P, C, B, S> {
    payments: P,
    certificates: C,
    book: B,
    configs: S,
    config: WorkflowConfig,
    locks: AssetLocks,
}

impl<P, C, B, S> SettlementWorkflow<P, C, B, S>
where
    P: PaymentGateway,
    C: CertificateIssuer,
    B: AssetBook,
    S: ConfigStore,
{
    pub fn new(payments: P, certificates: C, book: B, configs: S, config: WorkflowConfig) -> Self {
        Self {
            payments,
            certificates,
            book,
            configs,
            config,
            locks: AssetLocks::new(),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn payments(&self) -> &P {
        &self.payments
    }

    pub fn certificates(&self) -> &C {
        &self.certificates
    }

    /// Per-asset locks. Other writers of an asset take the same lock so they
    /// cannot interleave with a settlement in flight.
    pub fn locks(&self) -> &AssetLocks {
        &self.locks
    }

    /// Refuse with [`SettlementError::PaymentLanded`] when a settlement
    /// payment for the asset is already on the ledger. Callers hold the
    /// asset's lock.
    pub async fn ensure_no_landed_payment(&self, asset_id: &str) -> Result<()> {
        let landed = self
            .payments
            .find_payment(&settlement_reference(asset_id))
            .await
            .map_err(SettlementError::Payment)?;
        match landed {
            Some(receipt) => {
                warn!(asset_id, token = %receipt.token, "mutation refused, settlement payment pending bookkeeping");
                Err(SettlementError::PaymentLanded {
                    asset_id: asset_id.to_string(),
                    token: receipt.token,
                })
            }
            None => Ok(()),
        }
    }

    /// Resolve the split and compute amounts for an asset without paying or
    /// changing anything.
    pub async fn preview(&self, asset_id: &str, gross_amount: Amount, expenses: Amount) -> Result<SettlementPreview> {
        let asset = self.book.load_asset(asset_id).await.map_err(SettlementError::Store)?;
        let split = self.resolve(&asset).await?;
        let result = calculate(&SettlementInput {
            gross_amount,
            expenses,
            split: split.clone(),
        })?;
        Ok(SettlementPreview { split, result })
    }

    /// Settle one asset. See the module docs for the sequence.
    pub async fn settle(&self, request: &SettlementRequest, now: Timestamp) -> Result<SettlementRecord> {
        let _guard = self.locks.acquire(&request.asset_id).await;

        match self.settle_locked(request, now).await {
            Ok(record) => Ok(record),
            Err(e) => {
                if e.is_workflow_bug() {
                    error!(asset_id = %request.asset_id, kind = e.kind(), "settlement refused: {e}");
                } else {
                    warn!(asset_id = %request.asset_id, kind = e.kind(), "settlement not completed: {e}");
                }
                Err(e)
            }
        }
    }

    async fn settle_locked(&self, request: &SettlementRequest, now: Timestamp) -> Result<SettlementRecord> {
        let asset = self
            .book
            .load_asset(&request.asset_id)
            .await
            .map_err(SettlementError::Store)?;
        lifecycle::check_transition(asset.lifecycle_status, LifecycleStatus::Settled)?;

        let split = self.resolve(&asset).await?;
        let result = calculate(&SettlementInput {
            gross_amount: request.gross_amount,
            expenses: request.expenses,
            split: split.clone(),
        })?;
        if result.remainder() > 0 {
            debug!(asset_id = %asset.id, remainder = result.remainder(), "rounding remainder not disbursed");
        }

        let farmer = request
            .farmer
            .clone()
            .or_else(|| asset.owner_identity.clone())
            .ok_or_else(|| SettlementError::MissingPayee(asset.id.clone()))?;

        let receipt = self.pay(&asset.id, &result, &farmer).await?;

        let record = self
            .record_settlement(&asset, request, &split, result, farmer, &receipt, now)
            .await
            .map_err(|source| SettlementError::BookkeepingPending {
                asset_id: asset.id.clone(),
                token: receipt.token.clone(),
                source,
            })?;

        info!(
            asset_id = %record.asset_id,
            split_id = %record.split_id,
            net = record.result.net_amount,
            farmer = record.result.farmer_amount,
            platform = record.result.platform_amount,
            payment = %record.payment_token,
            "settlement committed"
        );
        Ok(record)
    }

    async fn resolve(&self, asset: &LivestockAsset) -> Result<SplitConfig> {
        let configs = self
            .configs
            .list_active_configs()
            .await
            .map_err(SettlementError::Store)?;
        Ok(resolve_split(&asset.category, &configs))
    }

    /// Make, or find, the grouped payment for this asset. Never submits twice.
    async fn pay(&self, asset_id: &str, result: &SettlementResult, farmer: &Identity) -> Result<PaymentReceipt> {
        let reference = settlement_reference(asset_id);
        let expected = disbursement_pair(result, farmer, &self.config.platform);

        // A previous attempt may have paid and then failed bookkeeping.
        if let Some(receipt) = self
            .payments
            .find_payment(&reference)
            .await
            .map_err(SettlementError::Payment)?
        {
            info!(asset_id, token = %receipt.token, "payment already on ledger, resuming bookkeeping");
            return self.check_receipt(asset_id, receipt, &expected);
        }

        let submitted = tokio::time::timeout(
            self.config.confirmation_timeout,
            self.payments.submit_group(&reference, &expected),
        )
        .await
        .unwrap_or(Err(CollaboratorError::Timeout));

        match submitted {
            Ok(receipt) => {
                info!(asset_id, token = %receipt.token, "grouped payment confirmed");
                self.check_receipt(asset_id, receipt, &expected)
            }
            Err(CollaboratorError::Timeout) => {
                warn!(asset_id, "payment confirmation timed out, reconciling");
                match self.payments.find_payment(&reference).await {
                    Ok(Some(receipt)) => self.check_receipt(asset_id, receipt, &expected),
                    Ok(None) => Err(SettlementError::Payment(CollaboratorError::Timeout)),
                    Err(e) => Err(SettlementError::Payment(e)),
                }
            }
            Err(e) => Err(SettlementError::Payment(e)),
        }
    }

    fn check_receipt(
        &self,
        asset_id: &str,
        receipt: PaymentReceipt,
        expected: &[herd_types::settlement::Disbursement],
    ) -> Result<PaymentReceipt> {
        if receipt.disbursements != expected {
            error!(asset_id, token = %receipt.token, "landed payment differs from computed disbursement");
            return Err(SettlementError::ReconciliationMismatch {
                asset_id: asset_id.to_string(),
                token: receipt.token,
            });
        }
        Ok(receipt)
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_settlement(
        &self,
        asset: &LivestockAsset,
        request: &SettlementRequest,
        split: &SplitConfig,
        result: SettlementResult,
        farmer: Identity,
        receipt: &PaymentReceipt,
        now: Timestamp,
    ) -> std::result::Result<SettlementRecord, CollaboratorError> {
        let certificate = SettlementCertificate {
            asset_id: asset.id.clone(),
            asset_name: asset.name.clone(),
            breed: asset.breed.clone(),
            result,
            payment_token: receipt.token.clone(),
            slaughter: request.slaughter.clone(),
        };
        let content_ref = self
            .with_retries("certificate", || self.certificates.issue(&certificate))
            .await?;

        let record = SettlementRecord {
            asset_id: asset.id.clone(),
            split_id: split.id.clone(),
            farmer_share: split.farmer_share,
            platform_share: split.platform_share,
            gross_amount: request.gross_amount,
            expenses: request.expenses,
            result,
            farmer,
            platform: self.config.platform.clone(),
            payment_token: receipt.token.clone(),
            certificate: content_ref,
            slaughter: request.slaughter.clone(),
            settled_at: now,
        };

        let mut settled = asset.clone();
        let event = lifecycle::apply_settlement(&mut settled, &record, &request.actor)
            .map_err(|e| CollaboratorError::Rejected(e.to_string()))?;
        let commit = SettlementCommit {
            record,
            asset: settled,
            event,
        };

        self.with_retries("record", || self.book.commit_settlement(&commit, asset.version))
            .await?;
        Ok(commit.record)
    }

    async fn with_retries<T, F, Fut>(&self, step: &'static str, mut op: F) -> std::result::Result<T, CollaboratorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, CollaboratorError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.bookkeeping_retries => {
                    attempt += 1;
                    warn!(step, attempt, "bookkeeping step failed, retrying: {e}");
                    tokio::time::sleep(retry_delay(self.config.retry_backoff, attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
