//! Treatment payloads
//!
//! What gets encrypted: admission details, medical history and the treatment
//! plan, plus references to attachments stored elsewhere. Anything that is
//! `Serialize + DeserializeOwned` can be sealed through [`RecordPayload`];
//! [`TreatmentPayload`] is the typed shape used by the hospital system and
//! `serde_json::Value` covers free-form documents.

use crate::record::{RecordSummary, RecordType};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// A structure that can be sealed into an `EncryptedRecord`.
pub trait RecordPayload: Serialize + DeserializeOwned {
    /// Non-sensitive facts stored in cleartext next to the ciphertext so the
    /// document store can filter without decrypting.
    fn summary(&self) -> RecordSummary {
        RecordSummary::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentPayload {
    pub record_type: RecordType,
    pub admission: AdmissionDetails,
    #[serde(default)]
    pub medical_history: MedicalHistory,
    #[serde(default)]
    pub treatment_plan: TreatmentPlan,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionDetails {
    pub admission_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_date: Option<NaiveDate>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attending_physician: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicalHistory {
    pub conditions: Vec<String>,
    pub allergies: Vec<String>,
    pub current_medications: Vec<String>,
    pub past_procedures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreatmentPlan {
    pub diagnosis: String,
    pub procedures: Vec<String>,
    pub prescriptions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    LabReport,
    Prescription,
    Scan,
    Other,
}

/// Pointer to an uploaded file. The file itself is stored and encrypted elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub kind: AttachmentKind,
    pub storage_key: String,
    pub file_name: String,
}

impl RecordPayload for TreatmentPayload {
    fn summary(&self) -> RecordSummary {
        let has_kind = |kind| self.attachments.iter().any(|a| a.kind == kind);

        RecordSummary {
            admission_date: Some(self.admission.admission_date),
            record_type: self.record_type,
            has_attachments: !self.attachments.is_empty(),
            has_lab_reports: has_kind(AttachmentKind::LabReport),
            has_prescriptions: !self.treatment_plan.prescriptions.is_empty()
                || has_kind(AttachmentKind::Prescription),
        }
    }
}

/// Free-form payloads: the summary is read from well-known top-level keys when present.
impl RecordPayload for Value {
    fn summary(&self) -> RecordSummary {
        let admission_date = self
            .get("admissionDate")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());

        let record_type = self
            .get("recordType")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let has_attachments = self
            .get("attachments")
            .and_then(Value::as_array)
            .is_some_and(|a| !a.is_empty());

        RecordSummary {
            admission_date,
            record_type,
            has_attachments,
            ..RecordSummary::default()
        }
    }
}
