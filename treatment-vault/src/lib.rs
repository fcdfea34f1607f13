//! Dual-access encrypted treatment records
//!
//! A treatment record is sealed once and can then be opened by either of two
//! parties, each with their own secret: the hospital that wrote it and the
//! patient it belongs to. The document store only ever sees ciphertext, two
//! password-wrapped copies of the record's data key and cleartext metadata
//! that carries no clinical content.
//!
//! # Example
//!
//! ```rust
//! use crypto::CipherConfig;
//! use secrecy::SecretString;
//! use serde_json::{json, Value};
//! use treatment_vault::{Credentials, OpenOutcome, RecordCipher};
//!
//! let cipher = RecordCipher::new(CipherConfig::insecure_for_tests())?;
//! let payload = json!({ "admissionDate": "2024-01-01", "diagnosis": "flu" });
//!
//! let record = cipher.encrypt_record(
//!     &payload,
//!     &SecretString::new("H-pass".to_string()),
//!     &SecretString::new("P-pass".to_string()),
//! )?;
//!
//! let opened: OpenOutcome<Value> = cipher.decrypt_record(&record, &Credentials::patient("P-pass"));
//! assert_eq!(opened, OpenOutcome::Opened(payload));
//! # Ok::<(), treatment_vault::VaultError>(())
//! ```

pub mod cipher;
pub mod error;
pub mod history;
pub mod outcome;
pub mod payload;
pub mod record;

pub use cipher::RecordCipher;
pub use error::{VaultError, VaultResult};
pub use history::{authoritative, lineage};
pub use outcome::{OpenOutcome, Rejection};
pub use payload::{
    AdmissionDetails, AttachmentKind, AttachmentRef, MedicalHistory, RecordPayload, TreatmentPayload,
    TreatmentPlan,
};
pub use record::{
    Credentials, EncryptedRecord, RecordMetadata, RecordSummary, RecordType, Role, WrappedKey,
    PAYLOAD_ALGORITHM, RECORD_FORMAT_VERSION,
};
