//! ChaCha20-Poly1305 AEAD encryption (RFC 8439).
//!
//! Used to seal custodial wallet keys at rest under the master key.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;

use crate::{CryptoError, Result};

/// Nonce size for ChaCha20-Poly1305 (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Key size for ChaCha20-Poly1305 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Authentication tag size (128 bits = 16 bytes).
pub const TAG_SIZE: usize = 16;

/// Ciphertext together with the random nonce it was sealed under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypt data with ChaCha20-Poly1305.
///
/// Returns ciphertext with appended 16-byte authentication tag. The nonce
/// must never be reused with the same key.
pub fn encrypt(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadEncryption)
}

/// Decrypt data with ChaCha20-Poly1305.
///
/// `aad` must match what was used during encryption.
pub fn decrypt(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadDecryption)
}

/// Seal `plaintext` under a fresh random nonce.
pub fn seal(key: &[u8; KEY_SIZE], plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    let ciphertext = encrypt(key, &nonce, plaintext, aad)?;
    Ok(Sealed { nonce, ciphertext })
}

/// Open a [`Sealed`] value.
pub fn open(key: &[u8; KEY_SIZE], sealed: &Sealed, aad: &[u8]) -> Result<Vec<u8>> {
    decrypt(key, &sealed.nonce, &sealed.ciphertext, aad)
}

/// Convert a stored nonce column back into a fixed-size nonce.
pub fn nonce_from_slice(bytes: &[u8]) -> Result<[u8; NONCE_SIZE]> {
    bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: NONCE_SIZE,
        actual: bytes.len(),
    })
}
