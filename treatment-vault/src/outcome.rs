use crate::error::{VaultError, VaultResult};
use error_common::codes;
use std::fmt;

/// Why an open attempt produced nothing.
///
/// A wrong secret and a tampered record are the same `AccessDenied`:
/// callers cannot tell which wrap, IV or tag failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    AccessDenied,
    Malformed,
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccessDenied => codes::authentication::INVALID_CREDENTIALS,
            Self::Malformed => codes::validation::INVALID_FORMAT,
        }
    }

    /// Short name, safe to log
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "access_denied",
            Self::Malformed => "malformed",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessDenied => write!(f, "invalid credentials or corrupted record"),
            Self::Malformed => write!(f, "record payload is malformed"),
        }
    }
}

/// Result of opening a record. Opening never fails with an error: every
/// failure is one of the [`Rejection`] outcomes.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome<T> {
    Opened(T),
    Rejected(Rejection),
}

impl<T> OpenOutcome<T> {
    pub fn is_opened(&self) -> bool {
        matches!(self, Self::Opened(_))
    }

    pub fn opened(self) -> Option<T> {
        match self {
            Self::Opened(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Opened(_) => None,
            Self::Rejected(rejection) => Some(*rejection),
        }
    }

    pub fn map<U, F>(self, f: F) -> OpenOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Opened(value) => OpenOutcome::Opened(f(value)),
            Self::Rejected(rejection) => OpenOutcome::Rejected(rejection),
        }
    }

    /// Convert into a `Result` for `?` propagation
    pub fn into_result(self) -> VaultResult<T> {
        match self {
            Self::Opened(value) => Ok(value),
            Self::Rejected(rejection) => Err(VaultError::from(rejection)),
        }
    }
}
