//! Configuration assembly errors.

use gantry_core::context::EvalError;
use gantry_core::storage::StorageError;
use gantry_error::{Classifier, ClassifiedError, codes};

/// Errors from assembling an execution configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A disallowed key appeared in an injected layer.
    #[error("property {key:?} not allowed in {layer} configuration")]
    DisallowedKey {
        /// The offending key.
        key: String,
        /// Name of the violating layer.
        layer: String,
    },

    /// A declared external configuration document could not be read.
    #[error("cannot read configuration document {path}: {source}")]
    Document {
        /// Document path as resolved.
        path: String,
        /// Underlying storage failure.
        source: StorageError,
    },

    /// A configuration document did not parse as a key→value map.
    #[error("configuration document {path} is malformed: {detail}")]
    Malformed {
        /// Document path as resolved.
        path: String,
        /// Parser detail.
        detail: String,
    },

    /// Variable substitution over a document failed.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl ConfigError {
    /// Classify this error for the outer orchestrator.
    #[must_use]
    pub fn classify(&self, classifier: &Classifier) -> ClassifiedError {
        match self {
            Self::DisallowedKey { .. } => {
                ClassifiedError::failed(codes::DISALLOWED_PROPERTY, self.to_string())
            }
            Self::Document { source, .. } => classifier.classify(source.cause(), self.to_string()),
            Self::Malformed { .. } => classifier.classify("malformed-document", self.to_string()),
            Self::Eval(_) => ClassifiedError::transient(codes::EVAL_ERROR, self.to_string()),
        }
    }
}
