//! Common error handling utilities for Treatment Vault
//!
//! Standardized error types and error codes used by the outer layers of the
//! workspace. Library crates keep their own `thiserror` enums and convert into
//! [`RustCareError`] at the boundary, mapping each failure to a code from
//! [`codes`] for API responses.
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, RustCareError};
//!
//! fn check_secret(secret: &str) -> Result<(), RustCareError> {
//!     if secret.is_empty() {
//!         return Err(RustCareError::ValidationError(format!(
//!             "{}: secret must not be empty",
//!             codes::validation::INVALID_INPUT
//!         )));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_secret("").is_err());
//! ```

pub mod codes;
pub mod types;

pub use types::*;
