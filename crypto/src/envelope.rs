use crate::aes_gcm::{Aes256GcmEncryptor, KEY_LEN, NONCE_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{Kdf, KdfParams};
use zeroize::Zeroizing;

/// Data Encryption Key held in memory only for the duration of a call
pub type DataKey = Zeroizing<[u8; KEY_LEN]>;

/// A DEK encrypted under a password-derived Key Encryption Key.
///
/// Carries everything needed to re-derive the KEK except the password itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordWrap {
    /// AES-256-GCM ciphertext of the raw 32-byte DEK, tag appended
    pub wrapped_key: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub salt: Vec<u8>,
    pub kdf: KdfParams,
}

/// Envelope encryption with password-derived KEKs
///
/// This implements the envelope encryption pattern:
/// 1. Generate a random Data Encryption Key (DEK)
/// 2. Encrypt data with DEK
/// 3. Derive a KEK from a password with a fresh salt
/// 4. Encrypt DEK with KEK and store it alongside the encrypted data
///
/// Several wraps of one DEK let several parties open the same data, and a
/// password change only re-wraps 32 bytes instead of re-encrypting the data.
pub struct PasswordEnvelope;

impl PasswordEnvelope {
    /// Generate a fresh random DEK
    pub fn generate_dek() -> DataKey {
        Aes256GcmEncryptor::generate_key()
    }

    /// Wrap `dek` under a KEK derived from `password`.
    ///
    /// Salt and nonce are drawn fresh on every call, so two wraps of the same
    /// DEK never share either. `aad` binds the wrap to its intended slot.
    pub fn wrap(
        dek: &[u8; KEY_LEN],
        password: &[u8],
        kdf: &KdfParams,
        salt_length: usize,
        aad: &[u8],
    ) -> CryptoResult<PasswordWrap> {
        let salt = Kdf::generate_salt(salt_length);
        let kek = Kdf::derive_aes256_key(password, &salt, kdf)?;

        let sealed = Aes256GcmEncryptor::new(&kek)?.seal(dek.as_slice(), aad)?;

        Ok(PasswordWrap {
            wrapped_key: sealed.ciphertext,
            nonce: sealed.nonce,
            salt,
            kdf: *kdf,
        })
    }

    /// Recover the DEK from a wrap with the password it was wrapped under
    pub fn unwrap(wrap: &PasswordWrap, password: &[u8], aad: &[u8]) -> CryptoResult<DataKey> {
        let kek = Kdf::derive_aes256_key(password, &wrap.salt, &wrap.kdf)?;

        let dek_bytes = Aes256GcmEncryptor::new(&kek)?.open(&wrap.nonce, &wrap.wrapped_key, aad)?;

        if dek_bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                got: dek_bytes.len(),
            });
        }

        let mut dek = Zeroizing::new([0u8; KEY_LEN]);
        dek.copy_from_slice(&dek_bytes);
        Ok(dek)
    }

    /// Re-wrap a DEK under a new password (password change)
    ///
    /// The data encrypted under the DEK is untouched.
    pub fn rewrap(
        wrap: &PasswordWrap,
        old_password: &[u8],
        new_password: &[u8],
        kdf: &KdfParams,
        salt_length: usize,
        aad: &[u8],
    ) -> CryptoResult<PasswordWrap> {
        let dek = Self::unwrap(wrap, old_password, aad)?;
        Self::wrap(&dek, new_password, kdf, salt_length, aad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: KdfParams = KdfParams::Pbkdf2Sha256 { iterations: 1_000 };

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let dek = PasswordEnvelope::generate_dek();

        let wrap = PasswordEnvelope::wrap(&dek, b"hospital-password", &FAST, 16, b"slot").unwrap();
        let recovered = PasswordEnvelope::unwrap(&wrap, b"hospital-password", b"slot").unwrap();

        assert_eq!(*dek, *recovered);
        assert_eq!(wrap.salt.len(), 16);
        assert_eq!(wrap.kdf, FAST);
    }

    #[test]
    fn test_wrong_password() {
        let dek = PasswordEnvelope::generate_dek();
        let wrap = PasswordEnvelope::wrap(&dek, b"right", &FAST, 16, b"").unwrap();

        assert!(matches!(
            PasswordEnvelope::unwrap(&wrap, b"wrong", b""),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_wrong_slot() {
        let dek = PasswordEnvelope::generate_dek();
        let wrap = PasswordEnvelope::wrap(&dek, b"secret", &FAST, 16, b"hospital").unwrap();

        assert!(PasswordEnvelope::unwrap(&wrap, b"secret", b"patient").is_err());
    }

    #[test]
    fn test_two_wraps_are_independent() {
        let dek = PasswordEnvelope::generate_dek();

        let first = PasswordEnvelope::wrap(&dek, b"same", &FAST, 16, b"").unwrap();
        let second = PasswordEnvelope::wrap(&dek, b"same", &FAST, 16, b"").unwrap();

        assert_ne!(first.salt, second.salt);
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.wrapped_key, second.wrapped_key);
    }

    #[test]
    fn test_rewrap() {
        let dek = PasswordEnvelope::generate_dek();
        let old = PasswordEnvelope::wrap(&dek, b"old-password", &FAST, 16, b"").unwrap();

        let new = PasswordEnvelope::rewrap(&old, b"old-password", b"new-password", &FAST, 16, b"")
            .unwrap();

        assert_eq!(*PasswordEnvelope::unwrap(&new, b"new-password", b"").unwrap(), *dek);
        assert!(PasswordEnvelope::unwrap(&new, b"old-password", b"").is_err());
    }

    #[test]
    fn test_rewrap_requires_current_password() {
        let dek = PasswordEnvelope::generate_dek();
        let old = PasswordEnvelope::wrap(&dek, b"old-password", &FAST, 16, b"").unwrap();

        assert!(
            PasswordEnvelope::rewrap(&old, b"guess", b"new-password", &FAST, 16, b"").is_err()
        );
    }
}
