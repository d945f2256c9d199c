//! The launcher's self-reported status artifact.
//!
//! The launcher writes `status.json` into the execution directory
//! exactly once, via the storage layer's write-then-publish pattern, so
//! readers never observe a partial artifact. It is the authoritative
//! outcome source when the cluster's own report is unavailable.

use gantry_core::context::Context;
use gantry_core::storage::{StorageError, join};
use gantry_error::{Classifier, ClassifiedError};
use serde::{Deserialize, Serialize};

/// File name of the status artifact inside the execution directory.
pub const STATUS_ARTIFACT: &str = "status.json";

/// File name of the recovery record inside the execution directory.
pub const RECOVERY_FILE: &str = "recovery.id";

/// Structured error properties the launcher reports on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorProperties {
    /// Numeric error code as a string; `"0"` means the launcher could
    /// not determine one, `"-1"` means it crashed before writing one.
    #[serde(rename = "error.code", default)]
    pub code: Option<String>,
    /// Human-readable failure reason.
    #[serde(rename = "error.reason", default)]
    pub reason: Option<String>,
    /// Message of an inner exception, preferred over the reason when
    /// present.
    #[serde(rename = "exception.message", default)]
    pub exception_message: Option<String>,
    /// Stack trace of the inner exception.
    #[serde(rename = "exception.stacktrace", default)]
    pub exception_stacktrace: Option<String>,
}

/// The launcher's completion self-report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusArtifact {
    /// Identifier of a job the launcher itself started.
    #[serde(default)]
    pub new_external_id: Option<String>,
    /// Comma-separated identifiers of further jobs started.
    #[serde(default)]
    pub external_child_ids: Option<String>,
    /// Terminal state string reported by the launcher.
    #[serde(default)]
    pub final_status: Option<String>,
    /// Serialized captured output, present only when requested.
    #[serde(default)]
    pub output_properties: Option<String>,
    /// Opaque serialized stats blob.
    #[serde(default)]
    pub stats: Option<String>,
    /// Structured error properties on a failed or killed outcome.
    #[serde(default)]
    pub error_properties: Option<ErrorProperties>,
}

/// Errors from reading the status artifact.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArtifactError {
    /// The artifact exists but could not be read.
    #[error("cannot read status artifact {path}: {source}")]
    Storage {
        /// Artifact path.
        path: String,
        /// Underlying storage failure.
        source: StorageError,
    },
    /// The artifact exists but does not parse.
    #[error("status artifact {path} is malformed: {detail}")]
    Malformed {
        /// Artifact path.
        path: String,
        /// Parser detail.
        detail: String,
    },
}

impl ArtifactError {
    /// Classify this error for the outer orchestrator.
    #[must_use]
    pub fn classify(&self, classifier: &Classifier) -> ClassifiedError {
        match self {
            Self::Storage { source, .. } => classifier.classify(source.cause(), self.to_string()),
            Self::Malformed { .. } => classifier.classify("malformed-document", self.to_string()),
        }
    }
}

/// Read the status artifact from the execution directory.
///
/// A missing artifact is `None`, not an error; the reconciler decides
/// whether its absence is fatal.
pub async fn read_artifact(ctx: &dyn Context) -> Result<Option<StatusArtifact>, ArtifactError> {
    let path = join(ctx.execution_dir(), STATUS_ARTIFACT);
    let bytes = match ctx.storage().read(&path).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => return Ok(None),
        Err(source) => return Err(ArtifactError::Storage { path, source }),
    };
    let artifact = serde_json::from_slice(&bytes).map_err(|err| ArtifactError::Malformed {
        path,
        detail: err.to_string(),
    })?;
    Ok(Some(artifact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::testkit::TestContext;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn missing_artifact_is_none() {
        let ctx = TestContext::new("/apps/demo", "/run/demo/a1");
        assert_eq!(read_artifact(&ctx).await.unwrap(), None);
    }

    #[tokio::test]
    async fn artifact_roundtrip() {
        let ctx = TestContext::new("/apps/demo", "/run/demo/a1");
        ctx.storage_handle().put(
            "/run/demo/a1/status.json",
            br#"{
                "final_status": "FAILED",
                "external_child_ids": "application_1700_0002,application_1700_0003",
                "error_properties": {"error.code": "0", "error.reason": "bad jar"}
            }"#
            .to_vec(),
        );
        let artifact = read_artifact(&ctx).await.unwrap().unwrap();
        assert_eq!(artifact.final_status.as_deref(), Some("FAILED"));
        let props = artifact.error_properties.unwrap();
        assert_eq!(props.code.as_deref(), Some("0"));
        assert_eq!(props.reason.as_deref(), Some("bad jar"));
        assert_eq!(props.exception_message, None);
    }

    #[tokio::test]
    async fn unparseable_artifact_is_malformed() {
        let ctx = TestContext::new("/apps/demo", "/run/demo/a1");
        ctx.storage_handle()
            .put("/run/demo/a1/status.json", b"not json".to_vec());
        let err = read_artifact(&ctx).await.unwrap_err();
        assert!(matches!(err, ArtifactError::Malformed { .. }));
    }
}
