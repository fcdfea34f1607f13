//! Cryptographic primitives for Treatment Vault
//!
//! This crate provides the building blocks used to seal treatment records:
//! - Authenticated symmetric encryption (AES-256-GCM) with associated data
//! - Password-based key derivation (PBKDF2-HMAC-SHA256, Argon2id)
//! - Envelope encryption with password-derived key encryption keys
//! - Explicit cipher configuration, loadable from the environment
//!
//! # Security Features
//!
//! - Keys and derived material are zeroized when dropped
//! - Every seal draws a fresh random nonce, every wrap a fresh salt
//! - KDF parameters travel with each wrap and are bounded before use
//!
//! # Example
//!
//! ```rust
//! use crypto::{CipherConfig, PasswordEnvelope};
//!
//! let config = CipherConfig::insecure_for_tests();
//! let dek = PasswordEnvelope::generate_dek();
//! let wrap = PasswordEnvelope::wrap(&dek, b"password", &config.kdf, config.salt_length, b"")
//!     .unwrap();
//! let recovered = PasswordEnvelope::unwrap(&wrap, b"password", b"").unwrap();
//! assert_eq!(*dek, *recovered);
//! ```

pub mod aes_gcm;
pub mod config;
pub mod envelope;
pub mod error;
pub mod kdf;

pub use aes_gcm::{Aes256GcmEncryptor, SealedBox, KEY_LEN, NONCE_LEN, TAG_LEN};
pub use config::{CipherConfig, KdfAlgorithm, KdfCostLimits};
pub use envelope::{DataKey, PasswordEnvelope, PasswordWrap};
pub use error::*;
pub use kdf::{Kdf, KdfParams};
