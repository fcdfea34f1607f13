// Error codes implementation
// Standardized codes returned to API callers alongside user-facing messages

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const INVALID_FORMAT: &str = "VALIDATION_1003";
}

pub mod authentication {
    /// Wrong secret for the claimed role, or a record that failed integrity checks.
    /// Both surface under this one code.
    pub const INVALID_CREDENTIALS: &str = "AUTH_2001";
}

pub mod configuration {
    pub const INVALID_CONFIGURATION: &str = "CONFIG_5001";
}

pub mod internal {
    pub const CRYPTO_FAILURE: &str = "INTERNAL_9001";
}
