//! Status reconciliation between the cluster report and the artifact.

use gantry_core::context::{ActionInfo, Context};
use gantry_core::keys;
use gantry_core::settings::EngineSettings;
use gantry_error::{Classifier, ClassifiedError, codes};
use tracing::{info, warn};

use crate::artifact::{ArtifactError, ErrorProperties, StatusArtifact, read_artifact};
use crate::client::{ClusterClient, FinalStatus};

/// Result of one reconciliation round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The launcher has not reached a terminal state; check again
    /// later.
    Running,
    /// The attempt completed successfully.
    Succeeded,
    /// The attempt ended in failure.
    Failed,
    /// The attempt was killed.
    Killed,
}

/// Errors from reconciliation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    /// The action has no recorded handle to check.
    #[error("action has no recorded submission handle")]
    NoHandle,

    /// Neither a cluster report nor a status artifact is available.
    #[error("handle {handle} cannot be queried ({detail}) and no status artifact exists")]
    Unrecoverable {
        /// The unqueryable handle.
        handle: String,
        /// Why the cluster query failed.
        detail: String,
    },

    /// The artifact exists but its final-status field is not a known
    /// terminal state.
    #[error("status artifact reports unknown final status {0:?}")]
    MalformedFinalStatus(String),

    /// Captured output exceeds the configured limit.
    #[error("captured output is {size} bytes, limit {limit}")]
    OutputTooLarge {
        /// Actual size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The stats blob exceeds the configured limit.
    #[error("stats blob is {size} bytes, limit {limit}")]
    StatsTooLarge {
        /// Actual size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The status artifact could not be read or parsed.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl ReconcileError {
    /// Classify this error for the outer orchestrator.
    #[must_use]
    pub fn classify(&self, classifier: &Classifier) -> ClassifiedError {
        match self {
            Self::NoHandle | Self::Unrecoverable { .. } => {
                ClassifiedError::error(codes::UNRECOVERABLE_HANDLE, self.to_string())
            }
            Self::MalformedFinalStatus(_) => {
                classifier.classify("malformed-document", self.to_string())
            }
            Self::OutputTooLarge { .. } => {
                ClassifiedError::error(codes::OUTPUT_TOO_LARGE, self.to_string())
            }
            Self::StatsTooLarge { .. } => {
                ClassifiedError::error(codes::STATS_TOO_LARGE, self.to_string())
            }
            Self::Artifact(err) => err.classify(classifier),
        }
    }
}

/// Reconciles a submission's completion status.
#[derive(Clone, Copy)]
pub struct Reconciler<'a> {
    settings: &'a EngineSettings,
    client: &'a dyn ClusterClient,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over the engine settings and a cluster
    /// client.
    #[must_use]
    pub fn new(settings: &'a EngineSettings, client: &'a dyn ClusterClient) -> Self {
        Self { settings, client }
    }

    /// One reconciliation round trip: at most one cluster query plus,
    /// conditionally, one artifact read. Never blocks waiting for the
    /// cluster.
    pub async fn check(
        &self,
        ctx: &dyn Context,
        action: &ActionInfo,
    ) -> Result<CheckOutcome, ReconcileError> {
        let id = action.external_id.ok_or(ReconcileError::NoHandle)?;

        match self.client.report(id).await {
            Ok(report) if !report.state.is_terminal() => {
                // Queued and running are distinct to the orchestrator.
                ctx.set_external_status(report.state.as_external());
                Ok(CheckOutcome::Running)
            }
            Ok(report) => {
                let artifact = read_artifact(ctx).await?;
                // The cluster says the attempt ended; the artifact's own
                // final status is the fine-grained outcome when present.
                let status = match artifact.as_ref().and_then(|a| a.final_status.as_deref()) {
                    Some(status) => parse_final_status(status)?,
                    None => cluster_final_status(report.final_status),
                };
                self.finish(ctx, action, status, artifact).await
            }
            Err(err) => {
                warn!(handle = %id, error = %err, "cluster query failed, falling back to status artifact");
                let artifact = read_artifact(ctx).await?;
                match artifact.as_ref().and_then(|a| a.final_status.as_deref()) {
                    Some(status) => {
                        let status = parse_final_status(status)?;
                        self.finish(ctx, action, status, artifact).await
                    }
                    None => {
                        ctx.set_execution_data("FAILED", None);
                        Err(ReconcileError::Unrecoverable {
                            handle: id.to_string(),
                            detail: err.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Record a terminal outcome from the artifact's fine-grained data.
    ///
    /// Both size limits are validated before the first setter runs, so a
    /// rejected artifact leaves no partially recorded execution data.
    async fn finish(
        &self,
        ctx: &dyn Context,
        action: &ActionInfo,
        status: CheckOutcome,
        artifact: Option<StatusArtifact>,
    ) -> Result<CheckOutcome, ReconcileError> {
        let artifact = artifact.unwrap_or_default();

        if let Some(stats) = &artifact.stats
            && stats.len() > self.settings.max_stats_size
        {
            return Err(ReconcileError::StatsTooLarge {
                size: stats.len(),
                limit: self.settings.max_stats_size,
            });
        }
        let output = if status == CheckOutcome::Succeeded && action.definition.capture_output {
            match &artifact.output_properties {
                Some(output) => {
                    let limit = self.output_limit(action);
                    if output.len() > limit {
                        return Err(ReconcileError::OutputTooLarge {
                            size: output.len(),
                            limit,
                        });
                    }
                    Some(output.as_str())
                }
                None => None,
            }
        } else {
            None
        };

        let child_ids = collect_child_ids(&artifact);
        if !child_ids.is_empty() {
            info!(action = %action.id, children = %child_ids, "launcher reported child jobs");
            ctx.set_external_child_ids(&child_ids);
        }

        if let Some(stats) = &artifact.stats {
            ctx.set_execution_stats(stats);
        }

        match status {
            CheckOutcome::Succeeded => {
                ctx.set_execution_data("SUCCEEDED", output);
                info!(action = %action.id, "attempt succeeded");
            }
            CheckOutcome::Failed => {
                let (code, message) = translate_error(artifact.error_properties.as_ref());
                ctx.set_error_info(&code, &message);
                ctx.set_execution_data("FAILED", None);
                info!(action = %action.id, code = %code, "attempt failed");
            }
            CheckOutcome::Killed => {
                if let Some(props) = artifact.error_properties.as_ref() {
                    let (code, message) = translate_error(Some(props));
                    ctx.set_error_info(&code, &message);
                }
                ctx.set_execution_data("KILLED", None);
                info!(action = %action.id, "attempt was killed");
            }
            CheckOutcome::Running => unreachable!("finish is only called on terminal outcomes"),
        }
        Ok(status)
    }

    /// Per-action output limit from the definition's inline
    /// configuration, else the engine default.
    fn output_limit(&self, action: &ActionInfo) -> usize {
        action
            .definition
            .inline_config
            .get(keys::MAX_OUTPUT_SIZE)
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.settings.max_output_size)
    }
}

/// Kill targets from the artifact: a launcher-started job counts as a
/// child alongside the explicitly reported ones.
fn collect_child_ids(artifact: &StatusArtifact) -> String {
    let mut ids: Vec<&str> = Vec::new();
    if let Some(new_id) = artifact.new_external_id.as_deref() {
        let new_id = new_id.trim();
        if !new_id.is_empty() {
            ids.push(new_id);
        }
    }
    if let Some(children) = artifact.external_child_ids.as_deref() {
        ids.extend(children.split(',').map(str::trim).filter(|s| !s.is_empty()));
    }
    ids.join(",")
}

fn parse_final_status(status: &str) -> Result<CheckOutcome, ReconcileError> {
    match status {
        "SUCCEEDED" => Ok(CheckOutcome::Succeeded),
        "FAILED" => Ok(CheckOutcome::Failed),
        "KILLED" => Ok(CheckOutcome::Killed),
        other => Err(ReconcileError::MalformedFinalStatus(other.to_owned())),
    }
}

/// The cluster's final status when the artifact gives none. An
/// undefined final status on a terminal report means the launcher died
/// without reporting, which is a failure.
fn cluster_final_status(status: FinalStatus) -> CheckOutcome {
    match status {
        FinalStatus::Succeeded => CheckOutcome::Succeeded,
        FinalStatus::Killed => CheckOutcome::Killed,
        FinalStatus::Failed | FinalStatus::Undefined => CheckOutcome::Failed,
    }
}

/// Translate artifact error properties into the action's error fields.
///
/// Code `"0"` means the launcher could not determine a code; `"-1"`
/// means it crashed before writing one. The inner exception message is
/// preferred over the reason when present.
fn translate_error(props: Option<&ErrorProperties>) -> (String, String) {
    let Some(props) = props else {
        return (
            codes::UNKNOWN_LAUNCHER_FAILURE.to_owned(),
            "launcher reported failure without error properties".to_owned(),
        );
    };
    let message = props
        .exception_message
        .clone()
        .or_else(|| props.reason.clone())
        .unwrap_or_else(|| "launcher reported failure without a reason".to_owned());
    let code = match props.code.as_deref() {
        Some("0") | None => codes::UNKNOWN_LAUNCHER_FAILURE.to_owned(),
        Some("-1") => codes::LAUNCHER_CRASH.to_owned(),
        Some(code) => code.to_owned(),
    };
    (code, message)
}
