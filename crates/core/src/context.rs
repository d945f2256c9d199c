//! Per-action execution context contract.
//!
//! The orchestrator owns and persists all action state; the engine
//! reads and writes it exclusively through [`Context`]. Setter methods
//! take `&self` because a `kill` may race an in-flight `check` against
//! the same action; implementations synchronize internally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ExecConfig;
use crate::definition::{ActionDefinition, JobDefinition};
use crate::id::{ActionId, ApplicationId, WorkflowId};
use crate::storage::Storage;

/// Failure of a variable-evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("variable evaluation failed: {0}")]
pub struct EvalError(pub String);

/// Final disposition the engine reports through `set_end_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// The attempt completed successfully.
    Ok,
    /// The attempt ended in failure or was killed.
    Error,
}

/// Metadata of the workflow that owns the action.
#[derive(Debug, Clone)]
pub struct WorkflowInfo {
    /// Workflow identifier.
    pub id: WorkflowId,
    /// Human-readable application name.
    pub app_name: String,
    /// Root path of the deployed application on remote storage.
    pub app_path: String,
    /// User the workflow runs as.
    pub user: String,
    /// Optional group ACL the workflow was submitted with.
    pub group_acl: Option<String>,
    /// When the orchestrator created the workflow.
    pub created_at: DateTime<Utc>,
    /// The owning job's definition document.
    pub definition: JobDefinition,
    /// The job's submit-time configuration (variables and overrides).
    pub conf: ExecConfig,
}

/// The persisted state of one action, read-only to the engine.
#[derive(Debug, Clone)]
pub struct ActionInfo {
    /// Action identifier.
    pub id: ActionId,
    /// The action's definition document.
    pub definition: ActionDefinition,
    /// Launcher handle from a previous submission, if any.
    pub external_id: Option<ApplicationId>,
    /// Last observed external status string.
    pub external_status: Option<String>,
    /// Identifiers of child jobs the launcher reported.
    pub external_child_ids: Vec<String>,
    /// Set when this attempt is a user-initiated retry; forces a fresh
    /// submission even when a recoverable handle exists.
    pub user_retry: bool,
    /// When the current attempt started.
    pub started_at: Option<DateTime<Utc>>,
}

impl ActionInfo {
    /// Create a fresh, never-submitted action record.
    #[must_use]
    pub fn new(id: ActionId, definition: ActionDefinition) -> Self {
        Self {
            id,
            definition,
            external_id: None,
            external_status: None,
            external_child_ids: Vec::new(),
            user_retry: false,
            started_at: None,
        }
    }
}

/// Orchestrator-provided collaborator for one action's lifecycle.
pub trait Context: Send + Sync {
    /// The owning workflow's metadata.
    fn workflow(&self) -> &WorkflowInfo;

    /// The orchestrator-prepared proto configuration for this action
    /// (invoking user, cluster endpoints, workflow library paths).
    fn proto_config(&self) -> &ExecConfig;

    /// The action's execution directory on remote storage. The
    /// recovery record and status artifact live here.
    fn execution_dir(&self) -> &str;

    /// Storage access authenticated as the workflow user.
    fn storage(&self) -> &dyn Storage;

    /// Generate a callback URL carrying a status-token placeholder.
    fn callback_url(&self, status_token: &str) -> String;

    /// Evaluate `${...}` variable references against the workflow's
    /// variables and functions.
    fn evaluate(&self, input: &str) -> Result<String, EvalError>;

    /// Record submission: launcher handle and console tracking URL.
    fn set_start_data(&self, external_id: &ApplicationId, tracking_url: &str);

    /// Update the externally observed status string.
    fn set_external_status(&self, status: &str);

    /// Record a terminal external status and optional captured output.
    fn set_execution_data(&self, external_status: &str, output: Option<&str>);

    /// Attach an opaque stats blob reported by the launcher.
    fn set_execution_stats(&self, stats: &str);

    /// Record child job identifiers reported by the launcher.
    fn set_external_child_ids(&self, ids: &str);

    /// Record a structured error on the action.
    fn set_error_info(&self, code: &str, message: &str);

    /// Record the final disposition of the attempt.
    fn set_end_data(&self, status: CompletionStatus);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_status_serde() {
        assert_eq!(
            serde_json::to_string(&CompletionStatus::Ok).unwrap(),
            "\"ok\""
        );
        assert_eq!(
            serde_json::to_string(&CompletionStatus::Error).unwrap(),
            "\"error\""
        );
    }

    #[test]
    fn fresh_action_has_no_handle() {
        let action = ActionInfo::new(
            ActionId::new("a1").unwrap(),
            ActionDefinition::default(),
        );
        assert!(action.external_id.is_none());
        assert!(!action.user_retry);
    }
}
