//! Argon2id master key derivation.
//!
//! The operator passphrase is stretched once at daemon start into the
//! 32-byte master key that seals custodial wallet secrets.

use argon2::{Algorithm, Argon2, Params, Version};

use crate::{CryptoError, Result};

/// Default master key parameters: m=64MB, t=3, p=1.
pub const MASTER_M_COST: u32 = 65536;
pub const MASTER_T_COST: u32 = 3;
pub const MASTER_P_COST: u32 = 1;
pub const MASTER_OUTPUT_LEN: usize = 32;

/// Salt length stored alongside the sealed wallets.
pub const SALT_LEN: usize = 16;

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdfParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: MASTER_M_COST,
            t_cost: MASTER_T_COST,
            p_cost: MASTER_P_COST,
        }
    }
}

/// Derive the 32-byte master key from a passphrase.
pub fn derive_master_key(passphrase: &[u8], salt: &[u8], params: KdfParams) -> Result<[u8; MASTER_OUTPUT_LEN]> {
    let params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(MASTER_OUTPUT_LEN))
        .map_err(|e| CryptoError::Argon2(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; MASTER_OUTPUT_LEN];
    argon2
        .hash_password_into(passphrase, salt, &mut output)
        .map_err(|e| CryptoError::Argon2(e.to_string()))?;

    Ok(output)
}

/// Check value stored next to the salt so a wrong passphrase is detected at
/// start instead of at the first unseal.
pub fn master_key_check(master_key: &[u8; MASTER_OUTPUT_LEN]) -> [u8; 32] {
    let check_key = crate::blake3::derive_key(crate::blake3::contexts::MASTER_KEY_CHECK, master_key);
    crate::blake3::keyed_hash(&check_key, b"master-key-check")
}

/// Generate a random salt for Argon2id.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    // Small parameters keep the tests fast.
    const TEST_PARAMS: KdfParams = KdfParams {
        m_cost: 1024,
        t_cost: 1,
        p_cost: 1,
    };

    #[test]
    fn test_derive_deterministic() {
        let salt = b"1234567890123456";
        let key1 = derive_master_key(b"passphrase", salt, TEST_PARAMS).expect("derive");
        let key2 = derive_master_key(b"passphrase", salt, TEST_PARAMS).expect("derive");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_derive_different_passphrases() {
        let salt = b"1234567890123456";
        let key1 = derive_master_key(b"pass1", salt, TEST_PARAMS).expect("derive");
        let key2 = derive_master_key(b"pass2", salt, TEST_PARAMS).expect("derive");
        assert_ne!(key1, key2);
        assert_ne!(master_key_check(&key1), master_key_check(&key2));
    }

    #[test]
    fn test_short_salt_rejected() {
        assert!(derive_master_key(b"passphrase", b"abc", TEST_PARAMS).is_err());
    }

    #[test]
    fn test_generate_salt() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
