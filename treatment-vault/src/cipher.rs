//! Sealing and opening treatment records
//!
//! Each record gets a fresh random data key. The payload is encrypted once
//! under it with AES-256-GCM, then the data key is wrapped twice: under a
//! key derived from the hospital secret and under a key derived from the
//! patient secret. Either secret alone opens the record.

use crate::error::{VaultError, VaultResult};
use crate::outcome::{OpenOutcome, Rejection};
use crate::payload::RecordPayload;
use crate::record::{
    payload_aad, wrap_aad, Credentials, EncryptedRecord, RecordMetadata, Role, WrappedKey,
    PAYLOAD_ALGORITHM, RECORD_FORMAT_VERSION,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use crypto::{Aes256GcmEncryptor, CipherConfig, DataKey, PasswordEnvelope, PasswordWrap, KEY_LEN};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Seals and opens [`EncryptedRecord`]s. Holds no key material between calls.
#[derive(Debug, Clone)]
pub struct RecordCipher {
    config: CipherConfig,
}

impl RecordCipher {
    /// # Errors
    /// Fails if the configuration is invalid (short salt, zero-cost KDF).
    pub fn new(config: CipherConfig) -> VaultResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CipherConfig {
        &self.config
    }

    /// Encrypt a payload so that either secret can open it.
    ///
    /// # Errors
    /// `InvalidInput` for an empty secret or a payload that serializes to `null`.
    pub fn encrypt_record<P: RecordPayload>(
        &self,
        payload: &P,
        hospital_secret: &SecretString,
        patient_secret: &SecretString,
    ) -> VaultResult<EncryptedRecord> {
        self.seal(payload, hospital_secret, patient_secret, None)
    }

    /// Open a record with one role's secret.
    ///
    /// Wrong secrets and tampered records both come back as
    /// `Rejected(AccessDenied)`. A payload that decrypts but does not
    /// deserialize into `P` is `Rejected(Malformed)`.
    pub fn decrypt_record<P: RecordPayload>(
        &self,
        record: &EncryptedRecord,
        credentials: &Credentials,
    ) -> OpenOutcome<P> {
        let plaintext = match self.open_plaintext(record, credentials) {
            Ok(plaintext) => plaintext,
            Err(rejection) => {
                warn!(
                    record_id = %record.record_id,
                    role = %credentials.role,
                    outcome = rejection.as_str(),
                    "treatment record open rejected"
                );
                return OpenOutcome::Rejected(rejection);
            }
        };

        match serde_json::from_slice::<P>(&plaintext) {
            Ok(payload) => {
                debug!(record_id = %record.record_id, role = %credentials.role, "treatment record opened");
                OpenOutcome::Opened(payload)
            }
            Err(_) => {
                warn!(
                    record_id = %record.record_id,
                    role = %credentials.role,
                    outcome = Rejection::Malformed.as_str(),
                    "treatment record payload did not deserialize"
                );
                OpenOutcome::Rejected(Rejection::Malformed)
            }
        }
    }

    /// Seal an edited payload as a new record that supersedes `previous`.
    ///
    /// The hospital secret must open `previous`; `previous` itself is left as is.
    ///
    /// # Errors
    /// `AccessDenied` if the hospital secret does not open `previous`, plus
    /// everything [`RecordCipher::encrypt_record`] can return.
    pub fn supersede<P: RecordPayload>(
        &self,
        previous: &EncryptedRecord,
        payload: &P,
        hospital_secret: &SecretString,
        patient_secret: &SecretString,
    ) -> VaultResult<EncryptedRecord> {
        require_secret(hospital_secret, Role::Hospital)?;
        self.unwrap_key(previous, Role::Hospital, hospital_secret)
            .map_err(VaultError::from)?;

        self.seal(payload, hospital_secret, patient_secret, Some(previous.record_id))
    }

    /// Re-wrap one role's copy of the data key under a new secret.
    ///
    /// The payload ciphertext and the other role's wrap are unchanged; only
    /// `metadata.updatedAt` moves.
    ///
    /// # Errors
    /// `InvalidInput` for an empty new secret, `AccessDenied` when the current
    /// secret does not open the wrap or the record format is not supported.
    pub fn rewrap(
        &self,
        record: &EncryptedRecord,
        credentials: &Credentials,
        new_secret: &SecretString,
    ) -> VaultResult<EncryptedRecord> {
        require_secret(new_secret, credentials.role)?;

        let role = credentials.role;
        let current = self
            .stored_wrap(record, role, credentials.secret())
            .map_err(VaultError::from)?;
        let wrapped = PasswordEnvelope::rewrap(
            &current,
            credentials.secret().expose_secret().as_bytes(),
            new_secret.expose_secret().as_bytes(),
            &self.config.kdf,
            self.config.salt_length,
            wrap_aad(&record.record_id, record.version, role).as_bytes(),
        )
        .map_err(|_| VaultError::AccessDenied)?;

        let mut updated = record.clone();
        *updated.wrapped_key_mut(role) = WrappedKey::from(&wrapped);
        updated.touch(Utc::now());

        info!(
            record_id = %record.record_id,
            role = %credentials.role,
            kdf = self.config.kdf.algorithm_name(),
            "treatment record key re-wrapped"
        );

        Ok(updated)
    }

    fn seal<P: RecordPayload>(
        &self,
        payload: &P,
        hospital_secret: &SecretString,
        patient_secret: &SecretString,
        supersedes: Option<Uuid>,
    ) -> VaultResult<EncryptedRecord> {
        require_secret(hospital_secret, Role::Hospital)?;
        require_secret(patient_secret, Role::Patient)?;

        let plaintext = Zeroizing::new(
            serde_json::to_vec(payload)
                .map_err(|e| VaultError::InvalidInput(format!("payload is not serializable: {e}")))?,
        );
        if plaintext.as_slice() == b"null" {
            return Err(VaultError::InvalidInput("payload is required".to_string()));
        }

        let record_id = Uuid::new_v4();
        let version = RECORD_FORMAT_VERSION;
        let summary = payload.summary();
        let aad = payload_aad(&record_id, version, supersedes.as_ref(), &summary)
            .map_err(|e| VaultError::InvalidInput(format!("summary is not serializable: {e}")))?;
        let dek = PasswordEnvelope::generate_dek();

        let sealed = Aes256GcmEncryptor::new(&dek)?.seal(&plaintext, aad.as_bytes())?;

        let hospital_wrapped_key = self.wrap_key(&dek, &record_id, version, Role::Hospital, hospital_secret)?;
        let patient_wrapped_key = self.wrap_key(&dek, &record_id, version, Role::Patient, patient_secret)?;

        let now = Utc::now();
        let record = EncryptedRecord {
            record_id,
            version,
            algorithm: PAYLOAD_ALGORITHM.to_string(),
            ciphertext: STANDARD.encode(&sealed.ciphertext),
            cipher_iv: STANDARD.encode(sealed.nonce),
            hospital_wrapped_key,
            patient_wrapped_key,
            metadata: RecordMetadata {
                summary,
                created_at: now,
                updated_at: now,
            },
            supersedes,
        };

        info!(
            record_id = %record.record_id,
            record_type = ?record.metadata.summary.record_type,
            kdf = self.config.kdf.algorithm_name(),
            supersedes = ?record.supersedes,
            "treatment record sealed"
        );

        Ok(record)
    }

    fn wrap_key(
        &self,
        dek: &[u8; KEY_LEN],
        record_id: &Uuid,
        version: u32,
        role: Role,
        secret: &SecretString,
    ) -> VaultResult<WrappedKey> {
        let wrap = PasswordEnvelope::wrap(
            dek,
            secret.expose_secret().as_bytes(),
            &self.config.kdf,
            self.config.salt_length,
            wrap_aad(record_id, version, role).as_bytes(),
        )?;
        Ok(WrappedKey::from(&wrap))
    }

    fn unwrap_key(&self, record: &EncryptedRecord, role: Role, secret: &SecretString) -> Result<DataKey, Rejection> {
        let wrap = self.stored_wrap(record, role, secret)?;
        PasswordEnvelope::unwrap(
            &wrap,
            secret.expose_secret().as_bytes(),
            wrap_aad(&record.record_id, record.version, role).as_bytes(),
        )
        .map_err(|_| Rejection::AccessDenied)
    }

    /// Checks that run before any key derivation. An unknown format, an empty
    /// secret and an over-cost wrap are all reported like a wrong secret.
    fn stored_wrap(&self, record: &EncryptedRecord, role: Role, secret: &SecretString) -> Result<PasswordWrap, Rejection> {
        if !is_supported(record) || secret.expose_secret().is_empty() {
            return Err(Rejection::AccessDenied);
        }

        let stored = record.wrapped_key(role);
        // Stored parameters are untrusted: bound the derivation cost before running it
        if !self.config.cost_limits.allows(&stored.kdf) {
            return Err(Rejection::AccessDenied);
        }

        stored.to_wrap().ok_or(Rejection::AccessDenied)
    }

    fn open_plaintext(&self, record: &EncryptedRecord, credentials: &Credentials) -> Result<Zeroizing<Vec<u8>>, Rejection> {
        let dek = self.unwrap_key(record, credentials.role, credentials.secret())?;

        let nonce = STANDARD.decode(&record.cipher_iv).map_err(|_| Rejection::AccessDenied)?;
        let ciphertext = STANDARD.decode(&record.ciphertext).map_err(|_| Rejection::AccessDenied)?;
        let aad = record.payload_aad().map_err(|_| Rejection::AccessDenied)?;

        Aes256GcmEncryptor::new(&dek)
            .and_then(|cipher| cipher.open(&nonce, &ciphertext, aad.as_bytes()))
            .map_err(|_| Rejection::AccessDenied)
    }
}

fn is_supported(record: &EncryptedRecord) -> bool {
    record.version == RECORD_FORMAT_VERSION && record.algorithm == PAYLOAD_ALGORITHM
}

fn require_secret(secret: &SecretString, role: Role) -> VaultResult<()> {
    if secret.expose_secret().is_empty() {
        return Err(VaultError::InvalidInput(format!("{role} secret must not be empty")));
    }
    Ok(())
}
