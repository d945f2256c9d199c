//! Error kinds and the classified error type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the outer orchestrator should do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Retryable infrastructure blip; the orchestrator re-invokes the
    /// attempt.
    Transient,
    /// Environment, permission, or quota problem; the action fails and
    /// is not retried.
    NonTransient,
    /// Malformed input or document, surfaced with detail.
    Error,
    /// Policy violation (disallowed configuration key, missing share
    /// library); always fatal to the attempt.
    Failed,
}

impl ErrorKind {
    /// Returns `true` if the orchestrator should retry the attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "TRANSIENT"),
            Self::NonTransient => write!(f, "NON_TRANSIENT"),
            Self::Error => write!(f, "ERROR"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// A failure with its classification attached.
///
/// `code` is a stable `GAxxx` identifier (or, for causes the classifier
/// has no registration for, the cause label itself) used by the
/// orchestrator and in the action's persisted error fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{code} [{kind}] {message}")]
pub struct ClassifiedError {
    /// Retry disposition.
    pub kind: ErrorKind,
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ClassifiedError {
    /// Create an error with an explicit kind and code.
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a `TRANSIENT` error.
    pub fn transient(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, code, message)
    }

    /// Create a `NON_TRANSIENT` error.
    pub fn non_transient(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NonTransient, code, message)
    }

    /// Create an `ERROR` error.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Error, code, message)
    }

    /// Create a `FAILED` error.
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Failed, code, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_transient_is_retryable() {
        assert!(ErrorKind::Transient.is_retryable());
        assert!(!ErrorKind::NonTransient.is_retryable());
        assert!(!ErrorKind::Error.is_retryable());
        assert!(!ErrorKind::Failed.is_retryable());
    }

    #[test]
    fn display_includes_code_kind_and_message() {
        let err = ClassifiedError::failed("GA010", "property not allowed");
        assert_eq!(err.to_string(), "GA010 [FAILED] property not allowed");
    }

    #[test]
    fn serde_roundtrip() {
        let err = ClassifiedError::transient("GA001", "host unreachable");
        let json = serde_json::to_string(&err).unwrap();
        let back: ClassifiedError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
