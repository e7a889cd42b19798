//! Master key custody for sealing custodial wallet secrets.

use herd_crypto::argon2id::{self, KdfParams, MASTER_OUTPUT_LEN};
use herd_crypto::blake3::{self, contexts};
use herd_crypto::chacha20::{self, Sealed, KEY_SIZE};
use herd_crypto::CryptoError;
use herd_db::queries::settings;
use rusqlite::Connection;
use tracing::info;
use zeroize::{Zeroize, Zeroizing};

/// Environment variable holding the operator passphrase.
pub const PASSPHRASE_ENV: &str = "HERD_MASTER_PASSPHRASE";

/// Secret store errors.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("master passphrase does not match this database")]
    WrongPassphrase,

    #[error("corrupt key metadata: {0}")]
    CorruptMetadata(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Db(#[from] herd_db::DbError),
}

/// Provider of the 32-byte sealing key for wallet secrets.
pub trait SecretStore: Send + Sync {
    fn sealing_key(&self) -> &[u8; KEY_SIZE];

    /// Seal `plaintext` bound to `aad`.
    fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Sealed, CryptoError> {
        chacha20::seal(self.sealing_key(), plaintext, aad)
    }

    fn open(&self, sealed: &Sealed, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        chacha20::open(self.sealing_key(), sealed, aad).map(Zeroizing::new)
    }
}

/// Sealing key derived from the operator passphrase with Argon2id.
///
/// The salt and a check value live in the `settings` table, so every daemon
/// start with the same passphrase yields the same key, and a different
/// passphrase is refused up front.
pub struct PassphraseSecretStore {
    key: [u8; KEY_SIZE],
}

impl PassphraseSecretStore {
    pub fn unlock(conn: &Connection, passphrase: &[u8], params: KdfParams) -> Result<Self, SecretError> {
        let salt = match settings::get_optional(conn, settings::MASTER_KEY_SALT)? {
            Some(hex_salt) => hex::decode(&hex_salt).map_err(|e| SecretError::CorruptMetadata(e.to_string()))?,
            None => {
                let salt = argon2id::generate_salt().to_vec();
                settings::set(conn, settings::MASTER_KEY_SALT, &hex::encode(&salt))?;
                info!("Generated master key salt");
                salt
            }
        };

        let master = Zeroizing::new(argon2id::derive_master_key(passphrase, &salt, params)?);
        let check = hex::encode(argon2id::master_key_check(&master));

        match settings::get_optional(conn, settings::MASTER_KEY_CHECK)? {
            Some(stored) if stored != check => return Err(SecretError::WrongPassphrase),
            Some(_) => {}
            None => settings::set(conn, settings::MASTER_KEY_CHECK, &check)?,
        }

        Ok(Self {
            key: blake3::derive_key(contexts::WALLET_SEAL_KEY, &master[..MASTER_OUTPUT_LEN]),
        })
    }
}

impl SecretStore for PassphraseSecretStore {
    fn sealing_key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl Drop for PassphraseSecretStore {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PARAMS: KdfParams = KdfParams {
        m_cost: 1024,
        t_cost: 1,
        p_cost: 1,
    };

    fn test_db() -> Connection {
        herd_db::open_memory().expect("open test db")
    }

    #[test]
    fn test_same_passphrase_same_key() {
        let conn = test_db();
        let first = PassphraseSecretStore::unlock(&conn, b"correct horse", TEST_PARAMS).expect("unlock");
        let second = PassphraseSecretStore::unlock(&conn, b"correct horse", TEST_PARAMS).expect("unlock");
        assert_eq!(first.sealing_key(), second.sealing_key());
    }

    #[test]
    fn test_wrong_passphrase_refused() {
        let conn = test_db();
        PassphraseSecretStore::unlock(&conn, b"correct horse", TEST_PARAMS).expect("unlock");
        let err = PassphraseSecretStore::unlock(&conn, b"battery staple", TEST_PARAMS)
            .err()
            .expect("wrong passphrase");
        assert!(matches!(err, SecretError::WrongPassphrase));
    }

    #[test]
    fn test_seal_open_bound_to_aad() {
        let conn = test_db();
        let store = PassphraseSecretStore::unlock(&conn, b"pass", TEST_PARAMS).expect("unlock");
        let sealed = store.seal(b"signing key bytes", b"identity-a").expect("seal");
        assert_eq!(
            store.open(&sealed, b"identity-a").expect("open").as_slice(),
            b"signing key bytes"
        );
        assert!(store.open(&sealed, b"identity-b").is_err());
    }
}
