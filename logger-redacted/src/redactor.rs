use base64::{engine::general_purpose, Engine as _};
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";
// National identity card: old format 9 digits + V/X, new format 12 digits
const NIC_PATTERN: &str = r"\b(?:\d{9}[VvXx]|\d{12})\b";
const PHONE_PATTERN: &str = r"(?:\+\d{1,3}[-.\s]?)?\(?\b\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b";
// Base64/hex runs long enough to be key material or ciphertext
const BLOB_PATTERN: &str = r"[A-Za-z0-9+/]{40,}={0,2}";

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_nic: bool,
    pub redact_secret_blobs: bool,
    pub hash_for_correlation: bool,
    /// `(pattern, replacement)` pairs applied after the built-in rules
    pub custom_patterns: Vec<(String, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_nic: true,
            redact_secret_blobs: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// PII redactor for log messages and operator-facing error text
#[derive(Debug)]
pub struct PiiRedactor {
    config: RedactionConfig,
    email: Regex,
    nic: Regex,
    phone: Regex,
    blob: Regex,
    custom: Vec<(Regex, String)>,
}

impl PiiRedactor {
    /// Compile the redaction rules
    ///
    /// # Errors
    /// Returns an error if a custom pattern is not a valid regex.
    pub fn new(config: RedactionConfig) -> Result<Self, regex::Error> {
        let custom = config
            .custom_patterns
            .iter()
            .map(|(pattern, replacement)| Ok::<_, regex::Error>((Regex::new(pattern)?, replacement.clone())))
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            email: Regex::new(EMAIL_PATTERN)?,
            nic: Regex::new(NIC_PATTERN)?,
            phone: Regex::new(PHONE_PATTERN)?,
            blob: Regex::new(BLOB_PATTERN)?,
            custom,
            config,
        })
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_secret_blobs {
            result = self
                .blob
                .replace_all(&result, |caps: &Captures| format!("BLOB[len={}]", caps[0].len()))
                .into_owned();
        }

        if self.config.redact_emails {
            result = self.replace(&self.email, &result, "EMAIL", "***@***");
        }

        // NIC before phone: a 12 digit NIC also contains a phone-shaped run
        if self.config.redact_nic {
            result = self.replace(&self.nic, &result, "NIC", "*********");
        }

        if self.config.redact_phones {
            result = self.replace(&self.phone, &result, "PHONE", "(***) ***-****");
        }

        for (pattern, replacement) in &self.custom {
            result = pattern.replace_all(&result, replacement.as_str()).into_owned();
        }

        result
    }

    fn replace(&self, pattern: &Regex, text: &str, label: &str, mask: &str) -> String {
        pattern
            .replace_all(text, |caps: &Captures| {
                if self.config.hash_for_correlation {
                    format!("{label}[{}]", Self::hash_value(&caps[0]))
                } else {
                    mask.to_string()
                }
            })
            .into_owned()
    }

    fn hash_value(value: &str) -> String {
        let digest = Sha256::digest(value.as_bytes());
        // First 8 bytes are enough to correlate repeated values
        general_purpose::STANDARD_NO_PAD.encode(digest.get(..8).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masking() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_email_redaction() {
        let redacted = masking().redact("User john.doe@example.com logged in");
        assert_eq!(redacted, "User ***@*** logged in");
    }

    #[test]
    fn test_phone_redaction() {
        let redacted = masking().redact("Call me at (555) 123-4567");
        assert!(redacted.contains("(***) ***-****"));
        assert!(!redacted.contains("4567"));
    }

    #[test]
    fn test_nic_redaction() {
        let redactor = masking();
        assert_eq!(redactor.redact("nic=199012345678"), "nic=*********");
        assert_eq!(redactor.redact("NIC 901234567V on file"), "NIC ********* on file");
    }

    #[test]
    fn test_blob_redaction() {
        let key = "q83vEjRWeJq83vEjRWeJq83vEjRWeJq83vEjRWeJq80=";
        let redacted = masking().redact(&format!("wrappedKey={key}"));
        assert_eq!(redacted, format!("wrappedKey=BLOB[len={}]", key.len()));
    }

    #[test]
    fn test_dates_survive() {
        let text = "admission 2024-01-01 updated 2024-01-02T10:00:00Z";
        assert_eq!(masking().redact(text), text);
    }

    #[test]
    fn test_hash_for_correlation_is_stable() {
        let redactor = PiiRedactor::new(RedactionConfig::default()).unwrap();

        let first = redactor.redact("patient@example.org");
        let second = redactor.redact("contact patient@example.org again");

        assert!(first.starts_with("EMAIL["));
        assert!(second.contains(&first));
    }

    #[test]
    fn test_custom_pattern() {
        let redactor = PiiRedactor::new(RedactionConfig {
            custom_patterns: vec![(r"\bMRN\d+".to_string(), "MRN[REDACTED]".to_string())],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(redactor.redact("record MRN123456"), "record MRN[REDACTED]");
    }

    #[test]
    fn test_invalid_custom_pattern() {
        let result = PiiRedactor::new(RedactionConfig {
            custom_patterns: vec![("(".to_string(), String::new())],
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
