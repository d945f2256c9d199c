//! Launcher container specification.

use gantry_core::config::ExecConfig;
use gantry_credential::TokenSet;
use gantry_resource::Manifest;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Everything the cluster needs to run one launcher container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionSpec {
    /// Display name, `gantry:launcher:T=<type>:W=<workflow>:A=<action>`.
    pub name: String,
    /// Submission queue.
    pub queue: String,
    /// Scheduling priority; launchers always submit at the default.
    pub priority: u32,
    /// Submission tag inherited by child jobs, when tagging is enabled.
    pub tag: Option<String>,
    /// Memory request for the launcher container, in MB.
    pub memory_mb: u32,
    /// Virtual core request for the launcher container.
    pub vcores: u32,
    /// Localization set.
    pub manifest: Manifest,
    /// Container environment; carries the execution classpath.
    pub env: IndexMap<String, String>,
    /// Command line invoking the launcher entry point.
    pub command: Vec<String>,
    /// Authentication tokens serialized into the credential payload.
    pub tokens: TokenSet,
    /// The launcher's own configuration payload.
    pub launcher_conf: ExecConfig,
    /// The action's configuration payload, handed through to the job.
    pub action_conf: ExecConfig,
}

impl SubmissionSpec {
    /// Compose the display name for one submission.
    #[must_use]
    pub fn display_name(type_tag: &str, workflow_id: &str, action_name: &str) -> String {
        format!("gantry:launcher:T={type_tag}:W={workflow_id}:A={action_name}")
    }
}
