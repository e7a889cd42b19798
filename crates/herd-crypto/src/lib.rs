//! # herd-crypto
//!
//! Cryptographic primitives for custodial wallets and audit references.
//!
//! ## Modules
//!
//! - [`blake3`]: Domain-separated BLAKE3 hashing and content references
//! - [`ed25519`]: Ed25519 wallet keys
//! - [`chacha20`]: ChaCha20-Poly1305 sealing of key material at rest
//! - [`argon2id`]: Master key derivation from an operator passphrase

pub mod argon2id;
pub mod blake3;
pub mod chacha20;
pub mod ed25519;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AEAD decryption failed (authentication tag mismatch).
    #[error("AEAD decryption failed")]
    AeadDecryption,

    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    AeadEncryption,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Argon2id hashing failed.
    #[error("argon2id error: {0}")]
    Argon2(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
