//! Cluster resource manager contract.

use async_trait::async_trait;
use gantry_core::id::ApplicationId;
use gantry_error::{Classifier, ClassifiedError, codes};
use serde::{Deserialize, Serialize};

use crate::spec::SubmissionSpec;

/// Lifecycle state of a submitted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    /// Accepted but not yet scheduled.
    Accepted,
    /// The application is running.
    Running,
    /// The application finished; see the final status.
    Finished,
    /// The application failed.
    Failed,
    /// The application was killed.
    Killed,
}

impl AppState {
    /// Returns `true` when no further state changes can occur.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Killed)
    }

    /// External status string recorded for the orchestrator.
    #[must_use]
    pub fn as_external(self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        }
    }
}

/// Final status of a finished application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    /// Not yet finished.
    Undefined,
    /// Finished successfully.
    Succeeded,
    /// Finished in failure.
    Failed,
    /// Terminated by a kill request.
    Killed,
}

/// The cluster's view of one submitted application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationReport {
    /// Current lifecycle state.
    pub state: AppState,
    /// Final status, `Undefined` until terminal.
    pub final_status: FinalStatus,
    /// Console tracking URL, when the cluster assigned one.
    pub tracking_url: Option<String>,
    /// Cluster-side diagnostics, usually present on failure.
    pub diagnostics: Option<String>,
}

/// Errors surfaced by a cluster client.
///
/// The cluster is eventually consistent: `NotFound` may be returned for
/// a valid past handle whose record was purged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    /// The handle is unknown to the cluster.
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    /// The resource manager cannot be reached.
    #[error("cluster unreachable: {0}")]
    Unreachable(String),
    /// The cluster rejected the submission as malformed.
    #[error("submission rejected: {0}")]
    Rejected(String),
    /// The invoking user may not perform the operation.
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// Any other communication failure.
    #[error("cluster i/o error: {0}")]
    Io(String),
}

impl ClusterError {
    /// Classify this error for the outer orchestrator.
    #[must_use]
    pub fn classify(&self, classifier: &Classifier) -> ClassifiedError {
        match self {
            Self::NotFound(_) => classifier.classify("not-found", self.to_string()),
            Self::Unreachable(_) => classifier.classify("host-unreachable", self.to_string()),
            // A malformed submission will not succeed on retry.
            Self::Rejected(_) => {
                ClassifiedError::non_transient(codes::MALFORMED_DOCUMENT, self.to_string())
            }
            Self::AccessDenied(_) => classifier.classify("access-denied", self.to_string()),
            Self::Io(_) => classifier.classify("io", self.to_string()),
        }
    }
}

/// Client for the cluster resource manager.
///
/// Calls are single round trips with no internal retry or timeout
/// management; cancellation policy belongs to the caller.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Submit an application, returning its assigned handle.
    async fn submit_application(&self, spec: &SubmissionSpec)
        -> Result<ApplicationId, ClusterError>;

    /// Fetch the current report for a handle.
    async fn report(&self, id: ApplicationId) -> Result<ApplicationReport, ClusterError>;

    /// Request termination of an application.
    async fn kill_application(&self, id: ApplicationId) -> Result<(), ClusterError>;

    /// Applications carrying a submission tag, for finding children of
    /// a restarted launcher.
    async fn applications_by_tag(&self, tag: &str) -> Result<Vec<ApplicationId>, ClusterError>;
}
