//! Domain-separated BLAKE3 hashing.
//!
//! ## Modes
//!
//! - [`hash`]: Pure hashing: content addressing of certificates
//! - [`derive_key`]: Key derivation with a registered context string
//!
//! Context strings are fixed; see [`contexts`].

/// Registered BLAKE3 context strings.
pub mod contexts {
    pub const CERTIFICATE_REF: &str = "herd v1 certificate-ref";
    pub const PAYMENT_TOKEN: &str = "herd v1 payment-token";
    pub const MASTER_KEY_CHECK: &str = "herd v1 master-key-check";
    pub const WALLET_SEAL_KEY: &str = "herd v1 wallet-seal-key";

    /// All registered context strings. Used for validation.
    pub const ALL_CONTEXTS: &[&str] = &[
        CERTIFICATE_REF,
        PAYMENT_TOKEN,
        MASTER_KEY_CHECK,
        WALLET_SEAL_KEY,
    ];
}

/// Compute BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a key using BLAKE3's built-in key derivation mode.
///
/// `context` should be one of [`contexts::ALL_CONTEXTS`].
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    *hasher.finalize().as_bytes()
}

/// Compute a keyed BLAKE3 hash (MAC/PRF).
pub fn keyed_hash(key: &[u8; 32], data: &[u8]) -> [u8; 32] {
    *::blake3::keyed_hash(key, data).as_bytes()
}

/// Verify that a context string is registered.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

/// Content reference for a certificate document: `b3:` followed by the
/// hex-encoded keyed digest.
pub fn content_ref(document: &[u8]) -> String {
    let digest = derive_key(contexts::CERTIFICATE_REF, document);
    format!("b3:{}", hex::encode(digest))
}
