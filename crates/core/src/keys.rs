//! Well-known configuration key names.
//!
//! Keys in [`DISALLOWED`] carry the submitting identity or override the
//! cluster endpoints; they may only be set by the engine itself from the
//! Context, never by any injected configuration layer.

/// Identity of the submitting user. Engine-set only.
pub const USER_NAME: &str = "user.name";

/// Address of the cluster resource manager. Engine-set only.
pub const CLUSTER_MANAGER: &str = "cluster.manager";

/// Default storage endpoint for the cluster. Engine-set only.
pub const CLUSTER_STORAGE: &str = "cluster.storage";

/// Keys no injected configuration layer may contain.
pub const DISALLOWED: &[&str] = &[USER_NAME, CLUSTER_MANAGER, CLUSTER_STORAGE];

/// Prefix of the launcher configuration sub-namespace. When preparing
/// the launcher's own configuration, `launcher.<key>` entries are also
/// copied unprefixed so they take effect on the launcher runtime.
pub const LAUNCHER_PREFIX: &str = "launcher.";

/// Submission queue for the launcher application.
pub const SUBMIT_QUEUE: &str = "submit.queue";

/// View ACL for the submitted application.
pub const ACL_VIEW: &str = "acl.view";

/// Modify ACL for the submitted application.
pub const ACL_MODIFY: &str = "acl.modify";

/// Action-configuration keys promoted into the launcher configuration
/// when not already set there explicitly.
pub const PROMOTED: &[&str] = &[SUBMIT_QUEUE, ACL_VIEW, ACL_MODIFY];

/// Disables credential resolution when set to `true` on the action or
/// job configuration.
pub const SKIP_CREDENTIALS: &str = "credentials.skip";

/// Enables share-library resolution from the system library path.
pub const USE_SYSTEM_LIBPATH: &str = "system.libpath.enable";

/// Comma-separated workflow library paths, provided in the proto
/// configuration by the orchestrator.
pub const WORKFLOW_LIB_PATHS: &str = "workflow.lib.paths";

/// Comma-separated extra library directories declared for the launcher.
pub const LAUNCHER_LIB_PATH: &str = "launcher.lib.path";

/// Prefix for per-type share-library name overrides
/// (`action.sharelib.for.<type>`).
pub const SHARELIB_FOR_PREFIX: &str = "action.sharelib.for.";

/// Callback URL the launcher reports completion to.
pub const CALLBACK_URL: &str = "callback.url";

/// Merged launcher child process options.
pub const CHILD_OPTS: &str = "launcher.child.opts";

/// Root log level forwarded to the launcher process.
pub const ROOT_LOG_LEVEL: &str = "launcher.root.log.level";

/// User override for the maximum captured-output size. Honored only
/// from the action definition's inline configuration: reconciliation
/// runs without the assembled configuration layers, so overrides placed
/// in the job or default layers have no effect here.
pub const MAX_OUTPUT_SIZE: &str = "action.max.output.size";

/// Keeps the execution directory after `end`/`kill` when `true`.
pub const KEEP_EXECUTION_DIR: &str = "execution.dir.keep";

/// Submission tag attached to the launcher and its child jobs, used to
/// derive killable children.
pub const SUBMISSION_TAG: &str = "launcher.submission.tag";

/// Placeholder the launcher replaces with the final status when
/// invoking the callback URL.
pub const STATUS_TOKEN: &str = "$jobStatus";

/// Deterministic tag attached to a submission and inherited by its
/// child jobs. Derived from persisted identifiers only, so `kill` can
/// recompute it after a crash.
#[must_use]
pub fn submission_tag(workflow_id: &str, action_name: &str) -> String {
    format!("gantry@{workflow_id}@{action_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_tag_is_deterministic() {
        assert_eq!(submission_tag("0000001-wf", "step"), "gantry@0000001-wf@step");
    }

    #[test]
    fn disallowed_covers_identity_and_endpoints() {
        assert!(DISALLOWED.contains(&USER_NAME));
        assert!(DISALLOWED.contains(&CLUSTER_MANAGER));
        assert!(DISALLOWED.contains(&CLUSTER_STORAGE));
    }

    #[test]
    fn promoted_keys_are_not_disallowed() {
        for key in PROMOTED {
            assert!(!DISALLOWED.contains(key));
        }
    }
}
