//! Resource resolution errors.

use gantry_core::context::EvalError;
use gantry_core::storage::StorageError;
use gantry_error::{Classifier, ClassifiedError, codes};

/// Errors from building a resource manifest.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceError {
    /// A storage backend could not be consulted.
    #[error("cannot resolve resources under {path}: {source}")]
    Storage {
        /// Directory or file being resolved.
        path: String,
        /// Underlying storage failure.
        source: StorageError,
    },

    /// A declared resource path could not be interpreted.
    #[error("malformed resource path {path:?}: {detail}")]
    MalformedPath {
        /// The declared path.
        path: String,
        /// What was wrong with it.
        detail: String,
    },

    /// The system share library is enabled but its common directory is
    /// missing or empty.
    #[error("system share library {0} is missing or empty")]
    MissingSystemSharelib(String),

    /// A share-library configuration file did not parse.
    #[error("share-library configuration {path} is malformed: {detail}")]
    MalformedLibraryConfig {
        /// Path of the offending file.
        path: String,
        /// Parser detail.
        detail: String,
    },

    /// Variable substitution over a declaration failed.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl ResourceError {
    /// Classify this error for the outer orchestrator.
    #[must_use]
    pub fn classify(&self, classifier: &Classifier) -> ClassifiedError {
        match self {
            Self::Storage { source, .. } => classifier.classify(source.cause(), self.to_string()),
            Self::MalformedPath { .. } | Self::MalformedLibraryConfig { .. } => {
                classifier.classify("malformed-document", self.to_string())
            }
            Self::MissingSystemSharelib(_) => {
                ClassifiedError::failed(codes::MISSING_SYSTEM_SHARELIB, self.to_string())
            }
            Self::Eval(_) => ClassifiedError::transient(codes::EVAL_ERROR, self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_system_sharelib_is_fatal_policy_failure() {
        let err = ResourceError::MissingSystemSharelib("/share/lib/gantry".into());
        let classified = err.classify(&Classifier::standard());
        assert_eq!(classified.kind, ErrorKind::Failed);
        assert_eq!(classified.code, codes::MISSING_SYSTEM_SHARELIB);
    }

    #[test]
    fn unreachable_backend_is_transient() {
        let err = ResourceError::Storage {
            path: "/share/lib".into(),
            source: StorageError::Unreachable("down".into()),
        };
        let classified = err.classify(&Classifier::standard());
        assert_eq!(classified.kind, ErrorKind::Transient);
    }

    #[test]
    fn malformed_path_is_error() {
        let err = ResourceError::MalformedPath {
            path: "::".into(),
            detail: "empty".into(),
        };
        let classified = err.classify(&Classifier::standard());
        assert_eq!(classified.kind, ErrorKind::Error);
        assert_eq!(classified.code, codes::MALFORMED_DOCUMENT);
    }
}
