use crate::outcome::Rejection;
use crypto::CryptoError;
use error_common::codes;
use error_common::RustCareError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    /// Rejected before any cryptographic work: empty secret, missing payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wrong secret for the claimed role, or a record that failed integrity checks
    #[error("Invalid credentials or corrupted record")]
    AccessDenied,

    /// Decrypted cleanly but the plaintext is not the expected payload shape
    #[error("Record payload is malformed")]
    Serialization,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Stable error code reported to API callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => codes::validation::INVALID_INPUT,
            Self::AccessDenied => codes::authentication::INVALID_CREDENTIALS,
            Self::Serialization => codes::validation::INVALID_FORMAT,
            Self::Crypto(CryptoError::Configuration(_)) => codes::configuration::INVALID_CONFIGURATION,
            Self::Crypto(_) => codes::internal::CRYPTO_FAILURE,
        }
    }
}

impl From<Rejection> for VaultError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::AccessDenied => Self::AccessDenied,
            Rejection::Malformed => Self::Serialization,
        }
    }
}

impl From<VaultError> for RustCareError {
    fn from(error: VaultError) -> Self {
        let message = error.to_string();
        match error {
            VaultError::InvalidInput(msg) => Self::ValidationError(msg),
            VaultError::AccessDenied => Self::AuthError(message),
            VaultError::Serialization => Self::ValidationError(message),
            VaultError::Crypto(CryptoError::Configuration(msg)) => Self::ConfigError(msg),
            VaultError::Crypto(_) => Self::InternalError(message),
        }
    }
}
