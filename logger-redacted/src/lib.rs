//! Logging with automatic PII redaction
//!
//! Treatment records are full of data that must never reach a log file:
//! national identity numbers, contact details, wrapped keys and ciphertext.
//! [`init`] installs a `tracing` subscriber whose every formatted line passes
//! through a [`PiiRedactor`] before it is written to stderr.
//!
//! # Detected Data Types
//!
//! - **Email Addresses**: `user@example.com` → `EMAIL[<hash>]`
//! - **Phone Numbers**: `(555) 123-4567` → `PHONE[<hash>]`
//! - **NIC Numbers**: `199012345678` → `NIC[<hash>]`
//! - **Key material / ciphertext**: long base64 runs → `BLOB[len=44]`
//! - **Custom Patterns**: configurable organization-specific patterns
//!
//! Hashes are truncated SHA-256, so repeated values can still be correlated.
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init, LoggerConfig};
//!
//! init(&LoggerConfig::from_env()).expect("logger");
//! tracing::info!("opened record for patient@example.org");
//! // stderr: "... opened record for EMAIL[3q2+7w...]"
//! ```

pub mod config;
pub mod redactor;
pub mod writer;

pub use config::*;
pub use redactor::*;
pub use writer::*;

use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid redaction pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Logger initialization failed: {0}")]
    Init(String),
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `config.log_level`.
///
/// # Errors
/// Fails on an invalid filter directive or if a global subscriber is already set.
pub fn init(config: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let result = if config.redaction_enabled {
        let redactor = Arc::new(PiiRedactor::new(RedactionConfig::default())?);
        let writer = RedactingMakeWriter::new(redactor, std::io::stderr);
        // ANSI escapes would split tokens the redactor needs to see whole
        let builder = builder.with_ansi(false).with_writer(writer);
        match config.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.try_init(),
        }
    } else {
        let builder = builder.with_writer(std::io::stderr);
        match config.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.try_init(),
        }
    };

    result.map_err(|e| LoggerError::Init(e.to_string()))
}
