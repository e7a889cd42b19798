//! Ledger and certificate store backed by the daemon database.
//!
//! Lets the daemon settle without a live chain or pinning service. The
//! ledger honours the same contract as a real one: a group is recorded
//! whole or not at all, and its reference is an idempotency key. Receipts
//! are kept in `herd.db`, so a payment that landed before a restart is found
//! again by reconciliation instead of being paid twice.
//!
//! Both collaborators can be told to fail the next few calls, which drives
//! the timeout-reconciliation and bookkeeping-pending paths end to end.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use herd_crypto::blake3::{self, contexts};
use herd_db::queries::sandbox;
use herd_settlement::collaborators::{CertificateIssuer, CollaboratorError, PaymentGateway};
use herd_types::settlement::{ContentRef, Disbursement, PaymentReceipt, SettlementCertificate};
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Consume one pending injected failure, if any.
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Grouped-payment ledger.
#[derive(Debug)]
pub struct SandboxLedger {
    db: Arc<Mutex<Connection>>,
    lost_confirmations: AtomicU32,
}

impl SandboxLedger {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self {
            db,
            lost_confirmations: AtomicU32::new(0),
        }
    }

    /// The next `n` submissions land but report a confirmation timeout.
    pub fn lose_confirmations(&self, n: u32) {
        self.lost_confirmations.store(n, Ordering::SeqCst);
    }

    /// Number of groups recorded.
    pub async fn count(&self) -> herd_db::Result<u64> {
        let conn = self.db.lock().await;
        sandbox::count_payments(&conn)
    }
}

impl PaymentGateway for SandboxLedger {
    async fn submit_group(
        &self,
        reference: &str,
        disbursements: &[Disbursement],
    ) -> Result<PaymentReceipt, CollaboratorError> {
        if disbursements.is_empty() {
            return Err(CollaboratorError::Rejected("empty payment group".into()));
        }
        if let Some(leg) = disbursements.iter().find(|d| d.payee.as_str().trim().is_empty()) {
            return Err(CollaboratorError::Rejected(format!(
                "leg of {} has no payee",
                leg.amount
            )));
        }

        let conn = self.db.lock().await;
        if let Some(existing) = sandbox::find_payment(&conn, reference)? {
            return Ok(existing);
        }

        let seq = sandbox::next_sequence(&conn)?;
        let digest = blake3::derive_key(
            contexts::PAYMENT_TOKEN,
            format!("{reference}:{seq}").as_bytes(),
        );
        let receipt = PaymentReceipt {
            token: format!("sandbox-{}", hex::encode(&digest[..16])),
            reference: reference.to_string(),
            disbursements: disbursements.to_vec(),
            confirmed_at: crate::now(),
        };
        sandbox::insert_payment(&conn, &receipt)?;
        debug!(reference, token = %receipt.token, legs = disbursements.len(), "sandbox payment recorded");

        if take_one(&self.lost_confirmations) {
            warn!(reference, "sandbox dropping payment confirmation");
            return Err(CollaboratorError::Timeout);
        }
        Ok(receipt)
    }

    async fn find_payment(&self, reference: &str) -> Result<Option<PaymentReceipt>, CollaboratorError> {
        let conn = self.db.lock().await;
        Ok(sandbox::find_payment(&conn, reference)?)
    }
}

/// Content-addressed certificate store.
#[derive(Debug)]
pub struct SandboxIssuer {
    db: Arc<Mutex<Connection>>,
    failures: AtomicU32,
}

impl SandboxIssuer {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self {
            db,
            failures: AtomicU32::new(0),
        }
    }

    /// The next `n` issue calls fail as unavailable.
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// The stored certificate document, if present.
    pub async fn get(&self, content_ref: &str) -> herd_db::Result<Option<serde_json::Value>> {
        let conn = self.db.lock().await;
        match sandbox::get_certificate(&conn, content_ref)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl CertificateIssuer for SandboxIssuer {
    async fn issue(&self, certificate: &SettlementCertificate) -> Result<ContentRef, CollaboratorError> {
        if take_one(&self.failures) {
            return Err(CollaboratorError::Unavailable("sandbox issuer unavailable".into()));
        }
        let document = serde_json::to_vec(certificate)
            .map_err(|e| CollaboratorError::Rejected(e.to_string()))?;
        let content_ref = blake3::content_ref(&document);
        let conn = self.db.lock().await;
        sandbox::insert_certificate(&conn, &content_ref, &document)?;
        Ok(ContentRef(content_ref))
    }
}
