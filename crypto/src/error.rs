use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    /// AEAD tag mismatch. Wrong key and tampered input are indistinguishable here.
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Invalid nonce length: expected {expected}, got {got}")]
    InvalidNonce { expected: usize, got: usize },

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
