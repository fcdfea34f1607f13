use crate::aes_gcm::KEY_LEN;
use crate::error::{CryptoError, CryptoResult};
use argon2::Argon2;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Key derivation result
pub type KdfResult<T> = Result<T, CryptoError>;

/// Password KDF together with its cost parameters.
///
/// Stored next to every password-wrapped key so the exact same derivation can
/// be repeated at unwrap time, even after the configured defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm")]
pub enum KdfParams {
    /// PBKDF2-HMAC-SHA256
    #[serde(rename = "pbkdf2-sha256", rename_all = "camelCase")]
    Pbkdf2Sha256 { iterations: u32 },
    /// Argon2id v0x13
    #[serde(rename = "argon2id", rename_all = "camelCase")]
    Argon2id {
        /// Memory cost in KiB
        memory_cost: u32,
        time_cost: u32,
        parallelism: u32,
    },
}

impl KdfParams {
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Self::Pbkdf2Sha256 { .. } => "pbkdf2-sha256",
            Self::Argon2id { .. } => "argon2id",
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams::Pbkdf2Sha256 {
            iterations: 600_000, // OWASP 2023 recommendation
        }
    }
}

/// Key Derivation Function utilities
pub struct Kdf;

impl Kdf {
    /// Derive a key using PBKDF2-HMAC-SHA256
    ///
    /// # Arguments
    /// * `password` - The password to derive from
    /// * `salt` - Salt for key derivation (should be unique per use)
    /// * `iterations` - Number of iterations (higher = more secure but slower)
    /// * `key_length` - Length of derived key in bytes
    pub fn pbkdf2(
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        key_length: usize,
    ) -> KdfResult<Zeroizing<Vec<u8>>> {
        if iterations == 0 {
            return Err(CryptoError::KeyDerivationFailed(
                "PBKDF2 iteration count must be positive".to_string(),
            ));
        }

        let mut derived_key = Zeroizing::new(vec![0u8; key_length]);

        pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut derived_key);

        Ok(derived_key)
    }

    /// Derive a key from a password using Argon2id
    ///
    /// This extracts the raw key bytes instead of the PHC format.
    pub fn argon2_derive_key(
        password: &[u8],
        salt: &[u8],
        memory_cost: u32,
        time_cost: u32,
        parallelism: u32,
        key_length: usize,
    ) -> KdfResult<Zeroizing<Vec<u8>>> {
        let params = argon2::Params::new(memory_cost, time_cost, parallelism, Some(key_length))
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

        let mut output = Zeroizing::new(vec![0u8; key_length]);

        argon2
            .hash_password_into(password, salt, &mut output)
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

        Ok(output)
    }

    /// Derive a 32-byte AES-256 key with whichever KDF `params` names
    pub fn derive_aes256_key(
        password: &[u8],
        salt: &[u8],
        params: &KdfParams,
    ) -> KdfResult<Zeroizing<[u8; KEY_LEN]>> {
        let derived = match *params {
            KdfParams::Pbkdf2Sha256 { iterations } => {
                Self::pbkdf2(password, salt, iterations, KEY_LEN)?
            }
            KdfParams::Argon2id {
                memory_cost,
                time_cost,
                parallelism,
            } => Self::argon2_derive_key(
                password,
                salt,
                memory_cost,
                time_cost,
                parallelism,
                KEY_LEN,
            )?,
        };

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&derived);
        Ok(key)
    }

    /// Generate a cryptographically secure random salt
    pub fn generate_salt(length: usize) -> Vec<u8> {
        let mut salt = vec![0u8; length];
        rand::thread_rng().fill_bytes(&mut salt);
        salt
    }
}
