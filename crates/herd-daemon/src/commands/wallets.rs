//! Custodial wallet command handlers.
//!
//! A wallet is an ed25519 keypair whose identity is the hex public key. The
//! signing key is sealed under the master key with the identity as AAD and
//! never leaves the daemon.

use std::sync::Arc;

use herd_crypto::chacha20::{nonce_from_slice, Sealed};
use herd_crypto::ed25519::SigningKey;
use herd_db::queries::wallets::{self, WalletRow};
use serde_json::Value;
use tracing::info;
use zeroize::Zeroizing;

use super::{str_param, to_json};
use crate::rpc::{require_admin, RpcError};
use crate::secrets::SecretStore;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn secrets(state: &DaemonState) -> std::result::Result<&dyn SecretStore, RpcError> {
    state.secrets.as_deref().ok_or_else(RpcError::secret_store_locked)
}

/// Create a wallet for an account holder.
pub async fn create_wallet(state: &Arc<DaemonState>, params: &Value) -> Result {
    require_admin(state, params)?;
    let owner_email = str_param(params, "owner_email")?.trim().to_lowercase();
    if !owner_email.contains('@') {
        return Err(RpcError::invalid_params("owner_email must be an email address"));
    }
    let store = secrets(state)?;

    let key = SigningKey::generate();
    let identity = key.verifying_key().identity();
    let secret = Zeroizing::new(key.to_bytes());
    let sealed = store
        .seal(secret.as_slice(), identity.as_bytes())
        .map_err(|e| RpcError::internal_error(&format!("seal failed: {e}")))?;

    let row = WalletRow {
        identity,
        owner_email,
        sealed_key: sealed.ciphertext,
        nonce: sealed.nonce.to_vec(),
        created_at: crate::now(),
    };
    {
        let db = state.db.lock().await;
        wallets::insert(&db, &row)?;
    }

    let wallet = row.public();
    info!(identity = %wallet.identity.masked(), "custodial wallet created");
    to_json(&wallet)
}

/// Public view of one wallet. With the store unlocked, `key_intact` reports
/// whether the sealed key opens and still matches the identity.
pub async fn get_wallet(state: &Arc<DaemonState>, params: &Value) -> Result {
    let identity = str_param(params, "identity")?;
    let row = {
        let db = state.db.lock().await;
        wallets::get(&db, identity)?
    };

    let sealed_ok = match state.secrets.as_deref() {
        Some(store) => {
            let sealed = Sealed {
                nonce: nonce_from_slice(&row.nonce)
                    .map_err(|e| RpcError::internal_error(&format!("corrupt nonce: {e}")))?,
                ciphertext: row.sealed_key.clone(),
            };
            let intact = store
                .open(&sealed, row.identity.as_bytes())
                .ok()
                .and_then(|secret| SigningKey::from_slice(&secret).ok())
                .is_some_and(|key| key.verifying_key().identity() == row.identity);
            Some(intact)
        }
        None => None,
    };

    let mut view = to_json(&row.public())?;
    view["key_intact"] = serde_json::json!(sealed_ok);
    Ok(view)
}

pub async fn list_wallets(state: &Arc<DaemonState>, _params: &Value) -> Result {
    let db = state.db.lock().await;
    to_json(&wallets::list(&db)?)
}

pub async fn delete_wallet(state: &Arc<DaemonState>, params: &Value) -> Result {
    require_admin(state, params)?;
    let identity = str_param(params, "identity")?;
    {
        let db = state.db.lock().await;
        wallets::delete(&db, identity)?;
    }
    info!(identity = %herd_types::Identity::new(identity).masked(), "custodial wallet deleted");
    Ok(serde_json::json!({"deleted": true}))
}
