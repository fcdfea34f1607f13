//! Cipher configuration
//!
//! Explicit, per-environment parameters for record encryption:
//! - Password key derivation function and its cost
//! - Salt length for each password wrap
//! - Upper bound on the KDF cost accepted from a stored wrap

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::KdfParams;
use std::str::FromStr;

/// Below this PBKDF2 iteration count a configuration is only fit for tests
pub const MIN_PRODUCTION_PBKDF2_ITERATIONS: u32 = 100_000;

/// Smallest accepted salt; Argon2 itself requires at least 8 bytes
pub const MIN_SALT_LENGTH: usize = 16;

/// Key Derivation Function selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KdfAlgorithm {
    /// PBKDF2-HMAC-SHA256
    #[default]
    Pbkdf2,
    /// Argon2id (memory-hard)
    Argon2id,
}

impl FromStr for KdfAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pbkdf2" | "pbkdf2-sha256" | "pbkdf2_sha256" => Ok(KdfAlgorithm::Pbkdf2),
            "argon2id" | "argon2" => Ok(KdfAlgorithm::Argon2id),
            _ => Err(CryptoError::Configuration(format!(
                "Unknown KDF algorithm: {s}. Valid options: pbkdf2, argon2id"
            ))),
        }
    }
}

/// Highest KDF cost `RecordCipher` will run when opening a stored wrap.
///
/// Wrap parameters come from the document store, so they are bounded before
/// any derivation work starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfCostLimits {
    pub max_pbkdf2_iterations: u32,
    pub max_argon2_memory_cost: u32,
    pub max_argon2_time_cost: u32,
    pub max_argon2_parallelism: u32,
}

impl Default for KdfCostLimits {
    fn default() -> Self {
        Self {
            max_pbkdf2_iterations: 5_000_000,
            max_argon2_memory_cost: 256 * 1024, // 256 MiB
            max_argon2_time_cost: 16,
            max_argon2_parallelism: 8,
        }
    }
}

impl KdfCostLimits {
    pub fn allows(&self, params: &KdfParams) -> bool {
        match *params {
            KdfParams::Pbkdf2Sha256 { iterations } => {
                iterations > 0 && iterations <= self.max_pbkdf2_iterations
            }
            KdfParams::Argon2id {
                memory_cost,
                time_cost,
                parallelism,
            } => {
                memory_cost <= self.max_argon2_memory_cost
                    && time_cost <= self.max_argon2_time_cost
                    && parallelism <= self.max_argon2_parallelism
            }
        }
    }
}

/// Record cipher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherConfig {
    /// KDF and cost used for new wraps
    pub kdf: KdfParams,

    /// Salt length in bytes for each wrap
    pub salt_length: usize,

    /// Bounds applied to stored wrap parameters on open
    pub cost_limits: KdfCostLimits,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            salt_length: 32,
            cost_limits: KdfCostLimits::default(),
        }
    }
}

impl CipherConfig {
    /// Create a configuration with the given KDF and default salt/limits
    pub fn with_kdf(kdf: KdfParams) -> Self {
        Self {
            kdf,
            ..Self::default()
        }
    }

    /// Cheap parameters for unit and integration tests. Never use in production.
    pub fn insecure_for_tests() -> Self {
        Self {
            kdf: KdfParams::Pbkdf2Sha256 { iterations: 1_000 },
            salt_length: MIN_SALT_LENGTH,
            cost_limits: KdfCostLimits::default(),
        }
    }

    /// Create a new cipher configuration from environment variables
    ///
    /// | variable | default |
    /// |---|---|
    /// | `TREATMENT_VAULT_KDF` | `pbkdf2` |
    /// | `TREATMENT_VAULT_PBKDF2_ITERATIONS` | `600000` |
    /// | `TREATMENT_VAULT_ARGON2_MEMORY_KIB` | `19456` |
    /// | `TREATMENT_VAULT_ARGON2_TIME_COST` | `2` |
    /// | `TREATMENT_VAULT_ARGON2_PARALLELISM` | `1` |
    /// | `TREATMENT_VAULT_SALT_LENGTH` | `32` |
    /// | `TREATMENT_VAULT_MAX_PBKDF2_ITERATIONS` | `5000000` |
    /// | `TREATMENT_VAULT_MAX_ARGON2_MEMORY_KIB` | `262144` |
    pub fn from_env() -> CryptoResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`CipherConfig::from_env`] with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> CryptoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let algorithm = match lookup("TREATMENT_VAULT_KDF") {
            Some(value) => value.parse()?,
            None => KdfAlgorithm::default(),
        };

        config.kdf = match algorithm {
            KdfAlgorithm::Pbkdf2 => KdfParams::Pbkdf2Sha256 {
                iterations: parse_var(&lookup, "TREATMENT_VAULT_PBKDF2_ITERATIONS", 600_000)?,
            },
            KdfAlgorithm::Argon2id => KdfParams::Argon2id {
                // OWASP recommended parameters
                memory_cost: parse_var(&lookup, "TREATMENT_VAULT_ARGON2_MEMORY_KIB", 19 * 1024)?,
                time_cost: parse_var(&lookup, "TREATMENT_VAULT_ARGON2_TIME_COST", 2)?,
                parallelism: parse_var(&lookup, "TREATMENT_VAULT_ARGON2_PARALLELISM", 1)?,
            },
        };

        config.salt_length = parse_var(&lookup, "TREATMENT_VAULT_SALT_LENGTH", config.salt_length)?;

        config.cost_limits.max_pbkdf2_iterations = parse_var(
            &lookup,
            "TREATMENT_VAULT_MAX_PBKDF2_ITERATIONS",
            config.cost_limits.max_pbkdf2_iterations,
        )?;
        config.cost_limits.max_argon2_memory_cost = parse_var(
            &lookup,
            "TREATMENT_VAULT_MAX_ARGON2_MEMORY_KIB",
            config.cost_limits.max_argon2_memory_cost,
        )?;

        // Validate configuration
        config.validate()?;

        if !config.is_production_strength() {
            tracing::warn!(
                kdf = config.kdf.algorithm_name(),
                "cipher configured with a KDF cost below production strength"
            );
        }

        Ok(config)
    }

    /// Validate the cipher configuration
    pub fn validate(&self) -> CryptoResult<()> {
        if self.salt_length < MIN_SALT_LENGTH {
            return Err(CryptoError::Configuration(format!(
                "Salt length must be at least {MIN_SALT_LENGTH} bytes, got {}",
                self.salt_length
            )));
        }

        match self.kdf {
            KdfParams::Pbkdf2Sha256 { iterations } => {
                if iterations == 0 {
                    return Err(CryptoError::Configuration(
                        "PBKDF2 iterations must be positive".to_string(),
                    ));
                }
            }
            KdfParams::Argon2id {
                memory_cost,
                time_cost,
                parallelism,
            } => {
                argon2::Params::new(memory_cost, time_cost, parallelism, None)
                    .map_err(|e| CryptoError::Configuration(format!("Invalid Argon2 parameters: {e}")))?;
            }
        }

        // New wraps must stay openable under our own limits
        if !self.cost_limits.allows(&self.kdf) {
            return Err(CryptoError::Configuration(
                "Configured KDF cost exceeds the accepted cost limits".to_string(),
            ));
        }

        Ok(())
    }

    /// Check whether the KDF cost is fit for production use
    pub fn is_production_strength(&self) -> bool {
        match self.kdf {
            KdfParams::Pbkdf2Sha256 { iterations } => iterations >= MIN_PRODUCTION_PBKDF2_ITERATIONS,
            KdfParams::Argon2id {
                memory_cost,
                time_cost,
                ..
            } => memory_cost >= 19 * 1024 && time_cost >= 2,
        }
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> CryptoResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| CryptoError::Configuration(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}
