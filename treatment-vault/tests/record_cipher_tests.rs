use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;
use crypto::{CipherConfig, KdfParams};
use secrecy::SecretString;
use serde_json::{json, Value};
use treatment_vault::{
    AdmissionDetails, AttachmentKind, AttachmentRef, Credentials, EncryptedRecord, MedicalHistory,
    OpenOutcome, RecordCipher, RecordType, Rejection, Role, TreatmentPayload, TreatmentPlan, VaultError,
};

fn cipher() -> RecordCipher {
    RecordCipher::new(CipherConfig::insecure_for_tests()).unwrap()
}

fn secret(value: &str) -> SecretString {
    SecretString::new(value.to_string())
}

fn seal(cipher: &RecordCipher, payload: &Value) -> EncryptedRecord {
    cipher
        .encrypt_record(payload, &secret("H-pass"), &secret("P-pass"))
        .unwrap()
}

fn open(cipher: &RecordCipher, record: &EncryptedRecord, credentials: &Credentials) -> OpenOutcome<Value> {
    cipher.decrypt_record(record, credentials)
}

/// Flip the lowest bit of the first decoded byte of a base64 field
fn flip_bit(field: &mut String) {
    let mut bytes = STANDARD.decode(&*field).unwrap();
    bytes[0] ^= 0x01;
    *field = STANDARD.encode(bytes);
}

#[test]
fn test_admission_scenario() {
    let cipher = cipher();
    let payload = json!({ "admissionDate": "2024-01-01", "diagnosis": "flu" });

    let record = cipher
        .encrypt_record(&payload, &secret("hpass123"), &secret("ppass456"))
        .unwrap();

    assert_eq!(open(&cipher, &record, &Credentials::patient("ppass456")), OpenOutcome::Opened(payload.clone()));
    assert_eq!(open(&cipher, &record, &Credentials::hospital("hpass123")), OpenOutcome::Opened(payload));
    assert_eq!(
        open(&cipher, &record, &Credentials::hospital("wrong")),
        OpenOutcome::Rejected(Rejection::AccessDenied)
    );
    assert_eq!(
        open(&cipher, &record, &Credentials::patient("hpass123")),
        OpenOutcome::Rejected(Rejection::AccessDenied)
    );
}

#[test]
fn test_stored_json_has_no_cleartext_phi() {
    let cipher = cipher();
    let record = seal(&cipher, &json!({ "admissionDate": "2024-01-01", "diagnosis": "tuberculosis" }));

    let stored = serde_json::to_string(&record).unwrap();

    assert!(!stored.contains("tuberculosis"));
    assert!(!stored.contains("H-pass"));
    assert!(!stored.contains("P-pass"));
}

#[test]
fn test_stored_shape() {
    let cipher = cipher();
    let record = seal(&cipher, &json!({ "admissionDate": "2024-01-01", "recordType": "admission" }));

    let json = serde_json::to_value(&record).unwrap();

    assert_eq!(json["version"], 1);
    assert_eq!(json["algorithm"], "AES-256-GCM");
    assert_eq!(STANDARD.decode(json["cipherIV"].as_str().unwrap()).unwrap().len(), 12);
    for role in ["hospitalWrappedKey", "patientWrappedKey"] {
        let wrap = &json[role];
        assert_eq!(STANDARD.decode(wrap["iv"].as_str().unwrap()).unwrap().len(), 12);
        assert_eq!(STANDARD.decode(wrap["salt"].as_str().unwrap()).unwrap().len(), 16);
        // 32-byte key plus the GCM tag
        assert_eq!(STANDARD.decode(wrap["wrappedKey"].as_str().unwrap()).unwrap().len(), 48);
        assert_eq!(wrap["kdf"]["algorithm"], "pbkdf2-sha256");
    }
    assert_eq!(json["metadata"]["admissionDate"], "2024-01-01");
    assert_eq!(json["metadata"]["recordType"], "admission");
    assert_eq!(json["metadata"]["createdAt"], json["metadata"]["updatedAt"]);
    assert!(json.get("supersedes").is_none());

    let back: EncryptedRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_typed_payload_roundtrip() {
    let cipher = cipher();
    let payload = TreatmentPayload {
        record_type: RecordType::Procedure,
        admission: AdmissionDetails {
            admission_date: NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
            discharge_date: NaiveDate::from_ymd_opt(2024, 6, 15),
            reason: "Appendicitis".to_string(),
            ward: Some("Surgical B".to_string()),
            attending_physician: Some("Dr. Perera".to_string()),
        },
        medical_history: MedicalHistory {
            conditions: vec!["asthma".to_string()],
            ..Default::default()
        },
        treatment_plan: TreatmentPlan {
            diagnosis: "Acute appendicitis".to_string(),
            procedures: vec!["Laparoscopic appendectomy".to_string()],
            prescriptions: vec!["Cefuroxime".to_string()],
            follow_up: Some("Clinic in 2 weeks".to_string()),
        },
        attachments: vec![AttachmentRef {
            kind: AttachmentKind::Scan,
            storage_key: "uploads/ct-4411.dcm".to_string(),
            file_name: "ct.dcm".to_string(),
        }],
    };

    let record = cipher
        .encrypt_record(&payload, &secret("H-pass"), &secret("P-pass"))
        .unwrap();

    assert_eq!(record.metadata.summary.record_type, RecordType::Procedure);
    assert!(record.metadata.summary.has_attachments);
    assert!(record.metadata.summary.has_prescriptions);
    assert!(!record.metadata.summary.has_lab_reports);

    let opened: OpenOutcome<TreatmentPayload> = cipher.decrypt_record(&record, &Credentials::patient("P-pass"));
    assert_eq!(opened, OpenOutcome::Opened(payload));
}

#[test]
fn test_wrong_shape_is_malformed() {
    let cipher = cipher();
    let record = seal(&cipher, &json!({ "diagnosis": "flu" }));

    let opened: OpenOutcome<TreatmentPayload> = cipher.decrypt_record(&record, &Credentials::patient("P-pass"));

    assert_eq!(opened, OpenOutcome::Rejected(Rejection::Malformed));
    assert!(matches!(opened.into_result(), Err(VaultError::Serialization)));
}

#[test]
fn test_tampered_payload_fields() {
    let cipher = cipher();
    let original = seal(&cipher, &json!({ "diagnosis": "flu" }));

    let tamperings: [fn(&mut EncryptedRecord); 10] = [
        |r: &mut EncryptedRecord| flip_bit(&mut r.ciphertext),
        |r: &mut EncryptedRecord| flip_bit(&mut r.cipher_iv),
        |r: &mut EncryptedRecord| r.record_id = uuid::Uuid::new_v4(),
        |r: &mut EncryptedRecord| r.cipher_iv = "AAAA".to_string(),
        |r: &mut EncryptedRecord| r.ciphertext = "%%%".to_string(),
        |r: &mut EncryptedRecord| r.version = 2,
        |r: &mut EncryptedRecord| r.algorithm = "AES-128-GCM".to_string(),
        |r: &mut EncryptedRecord| r.supersedes = Some(uuid::Uuid::new_v4()),
        |r: &mut EncryptedRecord| r.metadata.summary.has_prescriptions = true,
        |r: &mut EncryptedRecord| r.metadata.summary.record_type = RecordType::Discharge,
    ];

    for tamper in tamperings {
        let mut record = original.clone();
        tamper(&mut record);

        for credentials in [Credentials::hospital("H-pass"), Credentials::patient("P-pass")] {
            assert_eq!(open(&cipher, &record, &credentials).rejection(), Some(Rejection::AccessDenied));
        }
    }
}

#[test]
fn test_tampered_wrap_fields() {
    let cipher = cipher();
    let original = seal(&cipher, &json!({ "diagnosis": "flu" }));

    let tamperings: [fn(&mut EncryptedRecord); 5] = [
        |r: &mut EncryptedRecord| flip_bit(&mut r.hospital_wrapped_key.wrapped_key),
        |r: &mut EncryptedRecord| flip_bit(&mut r.hospital_wrapped_key.iv),
        |r: &mut EncryptedRecord| flip_bit(&mut r.hospital_wrapped_key.salt),
        |r: &mut EncryptedRecord| r.hospital_wrapped_key.kdf = KdfParams::Pbkdf2Sha256 { iterations: 1_001 },
        |r: &mut EncryptedRecord| r.hospital_wrapped_key.kdf = KdfParams::Pbkdf2Sha256 { iterations: 0 },
    ];

    for tamper in tamperings {
        let mut record = original.clone();
        tamper(&mut record);

        assert_eq!(
            open(&cipher, &record, &Credentials::hospital("H-pass")).rejection(),
            Some(Rejection::AccessDenied)
        );
        // The other wrap is independent
        assert!(open(&cipher, &record, &Credentials::patient("P-pass")).is_opened());
    }
}

#[test]
fn test_rewrap_changes_one_party_only() {
    let cipher = cipher();
    let payload = json!({ "diagnosis": "flu" });
    let record = seal(&cipher, &payload);

    let updated = cipher
        .rewrap(&record, &Credentials::patient("P-pass"), &secret("P-pass-2"))
        .unwrap();

    assert_eq!(updated.record_id, record.record_id);
    assert_eq!(updated.ciphertext, record.ciphertext);
    assert_eq!(updated.cipher_iv, record.cipher_iv);
    assert_eq!(updated.hospital_wrapped_key, record.hospital_wrapped_key);
    assert_ne!(updated.patient_wrapped_key, record.patient_wrapped_key);
    assert_eq!(updated.metadata.created_at, record.metadata.created_at);
    assert!(updated.metadata.updated_at >= record.metadata.updated_at);

    assert_eq!(open(&cipher, &updated, &Credentials::patient("P-pass-2")), OpenOutcome::Opened(payload.clone()));
    assert_eq!(open(&cipher, &updated, &Credentials::hospital("H-pass")), OpenOutcome::Opened(payload));
    assert_eq!(
        open(&cipher, &updated, &Credentials::patient("P-pass")).rejection(),
        Some(Rejection::AccessDenied)
    );
}

#[test]
fn test_rewrap_upgrades_kdf() {
    let old_cipher = cipher();
    let record = seal(&old_cipher, &json!({ "diagnosis": "flu" }));

    let mut config = CipherConfig::insecure_for_tests();
    config.kdf = KdfParams::Argon2id {
        memory_cost: 64,
        time_cost: 1,
        parallelism: 1,
    };
    let new_cipher = RecordCipher::new(config).unwrap();

    let updated = new_cipher
        .rewrap(&record, &Credentials::hospital("H-pass"), &secret("H-pass"))
        .unwrap();

    assert_eq!(updated.hospital_wrapped_key.kdf.algorithm_name(), "argon2id");
    assert_eq!(updated.patient_wrapped_key.kdf.algorithm_name(), "pbkdf2-sha256");
    // Each wrap is opened with its own stored parameters
    assert!(new_cipher.decrypt_record::<Value>(&updated, &Credentials::hospital("H-pass")).is_opened());
    assert!(new_cipher.decrypt_record::<Value>(&updated, &Credentials::patient("P-pass")).is_opened());
}

#[test]
fn test_supersede() {
    let cipher = cipher();
    let previous = seal(&cipher, &json!({ "diagnosis": "flu" }));

    let edited = cipher
        .supersede(&previous, &json!({ "diagnosis": "influenza A" }), &secret("H-pass"), &secret("P-pass"))
        .unwrap();

    assert_ne!(edited.record_id, previous.record_id);
    assert!(edited.is_supersession_of(&previous));
    assert_eq!(
        open(&cipher, &edited, &Credentials::patient("P-pass")).opened(),
        Some(json!({ "diagnosis": "influenza A" }))
    );
    // The superseded record still opens
    assert!(open(&cipher, &previous, &Credentials::patient("P-pass")).is_opened());

    let result = cipher.supersede(&previous, &json!({ "diagnosis": "x" }), &secret("wrong"), &secret("P-pass"));
    assert!(matches!(result, Err(VaultError::AccessDenied)));
}

#[test]
fn test_forged_supersedes_link_is_denied() {
    let cipher = cipher();
    let older = seal(&cipher, &json!({ "diagnosis": "flu" }));
    let mut unrelated = seal(&cipher, &json!({ "diagnosis": "fracture" }));

    unrelated.supersedes = Some(older.record_id);
    unrelated.metadata.summary.has_prescriptions = true;

    for credentials in [Credentials::hospital("H-pass"), Credentials::patient("P-pass")] {
        assert_eq!(open(&cipher, &unrelated, &credentials).rejection(), Some(Rejection::AccessDenied));
    }
    assert!(open(&cipher, &older, &Credentials::hospital("H-pass")).is_opened());
}

#[test]
fn test_timestamps_are_not_bound() {
    let cipher = cipher();
    let mut record = seal(&cipher, &json!({ "diagnosis": "flu" }));

    record.touch(record.metadata.updated_at + chrono::Duration::days(1));

    assert!(open(&cipher, &record, &Credentials::patient("P-pass")).is_opened());
}

#[test]
fn test_role_from_credentials() {
    let credentials = Credentials::new(Role::Hospital, secret("H-pass"));
    assert_eq!(credentials.role, Role::Hospital);
    // Debug output never shows the secret
    assert!(!format!("{credentials:?}").contains("H-pass"));
}
