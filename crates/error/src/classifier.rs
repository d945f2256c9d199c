//! Failure-cause classification registry.

use std::collections::HashMap;

use crate::codes;
use crate::kind::{ClassifiedError, ErrorKind};

/// Maps failure-cause labels to an [`ErrorKind`] and stable code.
///
/// The registry is built once at engine construction and never mutated
/// afterwards. Causes without a registration classify as
/// [`ErrorKind::Error`] with the cause label as the code, so nothing
/// ever escapes unclassified.
#[derive(Debug, Clone)]
pub struct Classifier {
    registry: HashMap<&'static str, (ErrorKind, &'static str)>,
}

impl Classifier {
    /// Create an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            registry: HashMap::new(),
        }
    }

    /// The standard registry covering the engine's known failure causes.
    #[must_use]
    pub fn standard() -> Self {
        let mut classifier = Self::empty();
        classifier.register("host-unreachable", ErrorKind::Transient, codes::UNKNOWN_HOST);
        classifier.register("access-denied", ErrorKind::NonTransient, codes::ACCESS_DENIED);
        classifier.register("disk-exhausted", ErrorKind::NonTransient, codes::DISK_EXHAUSTED);
        classifier.register("quota-exceeded", ErrorKind::NonTransient, codes::QUOTA_EXCEEDED);
        classifier.register("storage-readonly", ErrorKind::NonTransient, codes::STORAGE_READONLY);
        classifier.register("connection-refused", ErrorKind::Transient, codes::CONNECTION_REFUSED);
        classifier.register("malformed-document", ErrorKind::Error, codes::MALFORMED_DOCUMENT);
        classifier.register("not-found", ErrorKind::Error, codes::NOT_FOUND);
        classifier.register("io", ErrorKind::Transient, codes::IO);
        classifier
    }

    /// Register a cause label. Later registrations win.
    pub fn register(&mut self, cause: &'static str, kind: ErrorKind, code: &'static str) {
        self.registry.insert(cause, (kind, code));
    }

    /// Classify a failure cause into an error.
    #[must_use]
    pub fn classify(&self, cause: &str, message: impl Into<String>) -> ClassifiedError {
        match self.registry.get(cause) {
            Some((kind, code)) => ClassifiedError::new(*kind, *code, message),
            None => ClassifiedError::new(ErrorKind::Error, cause, message),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn standard_table_matches_taxonomy() {
        let classifier = Classifier::standard();
        let cases = [
            ("host-unreachable", ErrorKind::Transient, "GA001"),
            ("access-denied", ErrorKind::NonTransient, "GA002"),
            ("disk-exhausted", ErrorKind::NonTransient, "GA003"),
            ("quota-exceeded", ErrorKind::NonTransient, "GA004"),
            ("storage-readonly", ErrorKind::NonTransient, "GA005"),
            ("connection-refused", ErrorKind::Transient, "GA006"),
            ("malformed-document", ErrorKind::Error, "GA007"),
            ("not-found", ErrorKind::Error, "GA008"),
            ("io", ErrorKind::Transient, "GA009"),
        ];
        for (cause, kind, code) in cases {
            let err = classifier.classify(cause, "boom");
            assert_eq!(err.kind, kind, "kind for {cause}");
            assert_eq!(err.code, code, "code for {cause}");
        }
    }

    #[test]
    fn unregistered_cause_defaults_to_error() {
        let classifier = Classifier::standard();
        let err = classifier.classify("something-novel", "surprise");
        assert_eq!(err.kind, ErrorKind::Error);
        assert_eq!(err.code, "something-novel");
        assert_eq!(err.message, "surprise");
    }

    #[test]
    fn later_registration_wins() {
        let mut classifier = Classifier::standard();
        classifier.register("io", ErrorKind::NonTransient, "GA099");
        let err = classifier.classify("io", "disk gone");
        assert_eq!(err.kind, ErrorKind::NonTransient);
        assert_eq!(err.code, "GA099");
    }
}
