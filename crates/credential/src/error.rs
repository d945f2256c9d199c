//! Credential resolution errors.

use gantry_core::context::EvalError;
use gantry_error::{Classifier, ClassifiedError, codes};

/// Errors from resolving an action's declared credentials.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The action declared a name the owning job does not define.
    #[error("credential {0:?} is not declared by the owning job")]
    MissingDeclaration(String),

    /// A declaration names a provider type with no registered
    /// implementation.
    #[error("no provider registered for credential type {0:?}")]
    MissingProvider(String),

    /// A provider failed to acquire a token.
    #[error("provider {kind:?} failed to acquire a token: {detail}")]
    Acquisition {
        /// The provider type.
        kind: String,
        /// Provider-reported detail.
        detail: String,
    },

    /// Evaluation of a templated declaration property failed.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl CredentialError {
    /// Classify this error for the outer orchestrator.
    #[must_use]
    pub fn classify(&self, classifier: &Classifier) -> ClassifiedError {
        match self {
            Self::MissingDeclaration(_) => {
                ClassifiedError::error(codes::MISSING_CREDENTIAL, self.to_string())
            }
            Self::MissingProvider(_) => {
                ClassifiedError::error(codes::MISSING_PROVIDER, self.to_string())
            }
            Self::Acquisition { .. } => classifier.classify("io", self.to_string()),
            Self::Eval(_) => ClassifiedError::transient(codes::EVAL_ERROR, self.to_string()),
        }
    }
}
