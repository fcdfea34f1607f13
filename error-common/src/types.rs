use thiserror::Error;

/// Simplified error enum shared across the workspace's outer layers
#[derive(Error, Debug)]
pub enum RustCareError {
    /// Authentication/authorization errors
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RustCareError {
    /// Short category name, safe to log
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::AuthError(_) => "authentication",
            Self::ValidationError(_) => "validation",
            Self::InternalError(_) => "internal",
            Self::ConfigError(_) => "configuration",
            Self::Other(_) => "other",
        }
    }
}

/// Result type alias for RustCare operations
pub type Result<T> = std::result::Result<T, RustCareError>;

/// Log an error with its category and the calling context
pub fn log_error(context: &str, error: &RustCareError) {
    tracing::error!(
        context = context,
        error_type = error.error_type(),
        error = %error,
        "operation failed"
    );
}
