use crate::error::{CryptoError, CryptoResult};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::{ZeroizeOnDrop, Zeroizing};

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;
/// 96-bit nonce, the recommended size for GCM
pub const NONCE_LEN: usize = 12;
/// GCM authentication tag length, appended to every ciphertext
pub const TAG_LEN: usize = 16;

/// Name recorded next to ciphertexts produced by this module
pub const ALGORITHM: &str = "AES-256-GCM";

/// Ciphertext plus the nonce it was produced with.
///
/// The authentication tag is the trailing `TAG_LEN` bytes of `ciphertext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

/// AES-256-GCM encryptor with memory security
///
/// This implementation provides:
/// - AES-256 in Galois/Counter Mode (NIST approved)
/// - A fresh random 96-bit nonce for every seal
/// - Associated data binding, so a ciphertext only opens in the context it was sealed for
/// - Memory zeroization on drop
#[derive(ZeroizeOnDrop)]
pub struct Aes256GcmEncryptor {
    #[zeroize(skip)]
    cipher: Aes256Gcm,
    /// Key copy kept only so it is wiped on drop
    key: [u8; KEY_LEN],
}

impl Aes256GcmEncryptor {
    /// Create a new encryptor with a 32-byte key
    pub fn new(key: &[u8; KEY_LEN]) -> CryptoResult<Self> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        Ok(Self { cipher, key: *key })
    }

    /// Generate a new random key (cryptographically secure)
    pub fn generate_key() -> Zeroizing<[u8; KEY_LEN]> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(key.as_mut());
        key
    }

    /// Generate a random nonce. Never reuse one under the same key.
    pub fn generate_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }

    /// Encrypt `plaintext` under a fresh nonce, authenticating `aad` alongside it
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> CryptoResult<SealedBox> {
        let nonce = Self::generate_nonce();

        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(SealedBox { nonce, ciphertext })
    }

    /// Decrypt and verify. Fails on any key, nonce, ciphertext or `aad` mismatch.
    pub fn open(&self, nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> CryptoResult<Zeroizing<Vec<u8>>> {
        // Nonce::from_slice panics on a wrong length
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::InvalidNonce {
                expected: NONCE_LEN,
                got: nonce.len(),
            });
        }

        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}
