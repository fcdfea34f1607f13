//! Stored record format
//!
//! An [`EncryptedRecord`] is the only thing written to the document store. It
//! holds the payload ciphertext, two independent wraps of the same data key
//! and a small amount of cleartext metadata. Binary fields are standard
//! base64 and the JSON field names are camelCase.

use crate::error::VaultError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use crypto::{KdfParams, PasswordWrap, NONCE_LEN};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Record format version written by this crate
pub const RECORD_FORMAT_VERSION: u32 = 1;

/// Payload cipher identifier stored in `algorithm`
pub const PAYLOAD_ALGORITHM: &str = crypto::aes_gcm::ALGORITHM;

/// Which party a secret belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Hospital,
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::Patient => "patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hospital" => Ok(Self::Hospital),
            "patient" => Ok(Self::Patient),
            other => Err(VaultError::InvalidInput(format!(
                "Unknown role: {other}. Valid options: hospital, patient"
            ))),
        }
    }
}

/// A role together with the secret that should open that role's wrap
#[derive(Debug, Clone)]
pub struct Credentials {
    pub role: Role,
    secret: SecretString,
}

impl Credentials {
    pub fn new(role: Role, secret: SecretString) -> Self {
        Self { role, secret }
    }

    pub fn hospital(secret: impl Into<String>) -> Self {
        Self::new(Role::Hospital, SecretString::new(secret.into()))
    }

    pub fn patient(secret: impl Into<String>) -> Self {
        Self::new(Role::Patient, SecretString::new(secret.into()))
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    #[default]
    Admission,
    Consultation,
    Procedure,
    LabResult,
    Discharge,
    FollowUp,
}

/// Cleartext facts about a payload. Must never carry diagnosis or other
/// protected health information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_date: Option<NaiveDate>,
    #[serde(default)]
    pub record_type: RecordType,
    #[serde(default)]
    pub has_attachments: bool,
    #[serde(default)]
    pub has_lab_reports: bool,
    #[serde(default)]
    pub has_prescriptions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    #[serde(flatten)]
    pub summary: RecordSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One password wrap of the record's data key, as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKey {
    pub wrapped_key: String,
    pub iv: String,
    pub salt: String,
    pub kdf: KdfParams,
}

impl From<&PasswordWrap> for WrappedKey {
    fn from(wrap: &PasswordWrap) -> Self {
        Self {
            wrapped_key: STANDARD.encode(&wrap.wrapped_key),
            iv: STANDARD.encode(wrap.nonce),
            salt: STANDARD.encode(&wrap.salt),
            kdf: wrap.kdf,
        }
    }
}

impl WrappedKey {
    /// Decode back into a `PasswordWrap`. `None` when any field is not valid
    /// base64 or the IV has the wrong length.
    pub fn to_wrap(&self) -> Option<PasswordWrap> {
        let nonce: [u8; NONCE_LEN] = STANDARD.decode(&self.iv).ok()?.try_into().ok()?;

        Some(PasswordWrap {
            wrapped_key: STANDARD.decode(&self.wrapped_key).ok()?,
            nonce,
            salt: STANDARD.decode(&self.salt).ok()?,
            kdf: self.kdf,
        })
    }
}

/// A sealed treatment record.
///
/// Everything except `metadata.updatedAt` is fixed once written; edits create
/// a new record that names the old one in `supersedes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedRecord {
    pub record_id: Uuid,
    pub version: u32,
    pub algorithm: String,
    pub ciphertext: String,
    #[serde(rename = "cipherIV")]
    pub cipher_iv: String,
    pub hospital_wrapped_key: WrappedKey,
    pub patient_wrapped_key: WrappedKey,
    pub metadata: RecordMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<Uuid>,
}

impl EncryptedRecord {
    pub fn wrapped_key(&self, role: Role) -> &WrappedKey {
        match role {
            Role::Hospital => &self.hospital_wrapped_key,
            Role::Patient => &self.patient_wrapped_key,
        }
    }

    pub(crate) fn wrapped_key_mut(&mut self, role: Role) -> &mut WrappedKey {
        match role {
            Role::Hospital => &mut self.hospital_wrapped_key,
            Role::Patient => &mut self.patient_wrapped_key,
        }
    }

    /// Bump `updatedAt`. Never moves it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.metadata.updated_at {
            self.metadata.updated_at = now;
        }
    }

    pub fn is_supersession_of(&self, other: &EncryptedRecord) -> bool {
        self.supersedes == Some(other.record_id)
    }

    pub(crate) fn payload_aad(&self) -> serde_json::Result<String> {
        payload_aad(
            &self.record_id,
            self.version,
            self.supersedes.as_ref(),
            &self.metadata.summary,
        )
    }
}

/// Associated data for the payload ciphertext.
///
/// Covers every cleartext field that is fixed once written: the record id, the
/// `supersedes` link and the summary. Timestamps are left out so `touch` and
/// re-wraps do not invalidate the payload.
pub(crate) fn payload_aad(
    record_id: &Uuid,
    version: u32,
    supersedes: Option<&Uuid>,
    summary: &RecordSummary,
) -> serde_json::Result<String> {
    let supersedes = supersedes.map(Uuid::to_string).unwrap_or_default();
    let summary = serde_json::to_string(summary)?;
    Ok(format!(
        "treatment-vault:v{version}:payload:{record_id}:supersedes={supersedes}:summary={summary}"
    ))
}

/// Associated data for one role's key wrap
pub(crate) fn wrap_aad(record_id: &Uuid, version: u32, role: Role) -> String {
    format!("treatment-vault:v{version}:{role}-wrap:{record_id}")
}
