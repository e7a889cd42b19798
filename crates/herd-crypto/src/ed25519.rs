//! Ed25519 wallet keys (RFC 8032).
//!
//! Custodial wallets hold an Ed25519 signing key; the wallet identity is the
//! hex-encoded verifying key. The daemon never signs with these keys, it only
//! creates them, seals them and checks that a sealed key still matches its
//! identity. `ed25519-dalek` zeroizes the secret when a key is dropped.

use crate::{CryptoError, Result};

/// Secret key length in bytes.
pub const SECRET_KEY_SIZE: usize = 32;

/// An Ed25519 signing key (private key).
pub struct SigningKey {
    inner: ed25519_dalek::SigningKey,
}

/// An Ed25519 verification key (public key).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyingKey {
    inner: ed25519_dalek::VerifyingKey,
}

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            inner: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Restore a signing key from stored bytes, checking their length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SECRET_KEY_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: SECRET_KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self {
            inner: ed25519_dalek::SigningKey::from_bytes(&array),
        })
    }

    pub fn to_bytes(&self) -> [u8; SECRET_KEY_SIZE] {
        self.inner.to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }
}

impl VerifyingKey {
    /// Wallet identity string: lowercase hex of the public key.
    pub fn identity(&self) -> String {
        hex::encode(self.inner.as_bytes())
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("identity", &self.verifying_key().identity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_restores_identity() {
        let key = SigningKey::generate();
        let restored = SigningKey::from_slice(&key.to_bytes()).expect("restore");
        assert_eq!(restored.verifying_key().identity(), key.verifying_key().identity());
    }

    #[test]
    fn test_from_slice_checks_length() {
        assert!(matches!(
            SigningKey::from_slice(&[0u8; 31]),
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn test_identity_is_hex_public_key() {
        let key = SigningKey::from_slice(&[42u8; 32]).expect("key");
        let identity = key.verifying_key().identity();
        assert_eq!(identity.len(), 64);
        assert!(identity.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(
            identity,
            SigningKey::from_slice(&[42u8; 32]).expect("key").verifying_key().identity()
        );
        assert_ne!(identity, SigningKey::generate().verifying_key().identity());
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = SigningKey::from_slice(&[9u8; 32]).expect("key");
        let rendered = format!("{key:?}");
        assert!(rendered.starts_with("SigningKey"));
        assert!(!rendered.contains(&hex::encode([9u8; 32])));
    }
}
