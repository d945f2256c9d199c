//! Crash-safe launcher submission.
//!
//! The handle of a submission is recorded in a recovery file inside the
//! action's execution directory before the submission is confirmed.
//! Recovery after a crash therefore sees either "no submission
//! happened" or "handle recoverable", never a torn state where the
//! cluster runs the job but no handle can be found.

use gantry_core::config::ExecConfig;
use gantry_core::context::{ActionInfo, Context};
use gantry_core::definition::ActionDefinition;
use gantry_core::id::ApplicationId;
use gantry_core::keys;
use gantry_core::settings::EngineSettings;
use gantry_core::storage::{StorageError, join};
use gantry_credential::TokenSet;
use gantry_error::{Classifier, ClassifiedError, codes};
use gantry_resource::Manifest;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::artifact::RECOVERY_FILE;
use crate::client::{ClusterClient, ClusterError};
use crate::spec::SubmissionSpec;

/// Errors from the submission protocol.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    /// The recovery record could not be read or written.
    #[error("cannot access recovery record {path}: {source}")]
    Recovery {
        /// Recovery record path.
        path: String,
        /// Underlying storage failure.
        source: StorageError,
    },

    /// The recovery record exists but does not hold a handle.
    #[error("recovery record {path} is corrupt: {content:?}")]
    MalformedRecovery {
        /// Recovery record path.
        path: String,
        /// What the record held.
        content: String,
    },

    /// A recorded handle is unknown to the cluster.
    #[error("recorded handle {0} is unknown to the cluster")]
    UnrecoverableHandle(ApplicationId),

    /// The cluster call itself failed.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

impl SubmitError {
    /// Classify this error for the outer orchestrator.
    #[must_use]
    pub fn classify(&self, classifier: &Classifier) -> ClassifiedError {
        match self {
            Self::Recovery { source, .. } => classifier.classify(source.cause(), self.to_string()),
            Self::MalformedRecovery { .. } | Self::UnrecoverableHandle(_) => {
                ClassifiedError::error(codes::UNRECOVERABLE_HANDLE, self.to_string())
            }
            Self::Cluster(err) => err.classify(classifier),
        }
    }
}

/// Result of a successful submission or recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    /// The launcher's cluster handle.
    pub id: ApplicationId,
    /// Console tracking URL, empty when the cluster gave none.
    pub tracking_url: String,
    /// `true` when an existing submission was reused instead of
    /// creating a new one.
    pub recovered: bool,
}

/// The launcher submission protocol.
#[derive(Clone, Copy)]
pub struct SubmitProtocol<'a> {
    settings: &'a EngineSettings,
    client: &'a dyn ClusterClient,
}

impl<'a> SubmitProtocol<'a> {
    /// Create the protocol over the engine settings and a cluster
    /// client.
    #[must_use]
    pub fn new(settings: &'a EngineSettings, client: &'a dyn ClusterClient) -> Self {
        Self { settings, client }
    }

    /// Build the container specification for one submission.
    pub fn build_spec(
        &self,
        ctx: &dyn Context,
        def: &ActionDefinition,
        entry_point: &str,
        extra_env: &IndexMap<String, String>,
        launcher_conf: &ExecConfig,
        action_conf: &ExecConfig,
        manifest: Manifest,
        tokens: TokenSet,
    ) -> SubmissionSpec {
        let wf = ctx.workflow();
        let mut env = IndexMap::new();
        let classpath = manifest.classpath().join(":");
        if !classpath.is_empty() {
            env.insert("CLASSPATH".to_owned(), classpath);
        }
        for (key, value) in extra_env {
            env.insert(key.clone(), value.clone());
        }

        let mut command = vec![
            entry_point.to_owned(),
            "--execution-dir".to_owned(),
            ctx.execution_dir().to_owned(),
            "--diagnostics".to_owned(),
        ];
        command.extend(def.args.iter().cloned());

        SubmissionSpec {
            name: SubmissionSpec::display_name(&def.kind, wf.id.as_str(), &def.name),
            queue: launcher_conf
                .get_or(keys::SUBMIT_QUEUE, &self.settings.default_queue)
                .to_owned(),
            priority: 0,
            tag: launcher_conf.get(keys::SUBMISSION_TAG).map(str::to_owned),
            memory_mb: launcher_conf
                .get("launcher.memory.mb")
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.settings.launcher_memory_mb),
            vcores: launcher_conf
                .get("launcher.vcores")
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.settings.launcher_vcores),
            manifest,
            env,
            command,
            tokens,
            launcher_conf: launcher_conf.clone(),
            action_conf: action_conf.clone(),
        }
    }

    /// Submit the launcher, reusing a recoverable prior submission.
    ///
    /// A recorded handle is reused unless the attempt is a user retry,
    /// which always forces a fresh submission. On a fresh submission
    /// the handle is recorded before confirmation, so a failure while
    /// confirming still leaves the handle recoverable.
    pub async fn submit(
        &self,
        ctx: &dyn Context,
        action: &ActionInfo,
        spec: &SubmissionSpec,
    ) -> Result<Submitted, SubmitError> {
        if !action.user_retry
            && let Some(id) = self.recorded_handle(ctx).await?
        {
            info!(action = %action.id, handle = %id, "reusing recoverable submission");
            return match self.client.report(id).await {
                Ok(report) => Ok(Submitted {
                    id,
                    tracking_url: report.tracking_url.unwrap_or_default(),
                    recovered: true,
                }),
                Err(ClusterError::NotFound(_)) => Err(SubmitError::UnrecoverableHandle(id)),
                Err(err) => Err(err.into()),
            };
        }
        if action.user_retry {
            debug!(action = %action.id, "user retry, forcing fresh submission");
        }

        let id = self.client.submit_application(spec).await?;
        self.record_handle(ctx, id).await?;
        let report = self.client.report(id).await.map_err(|err| {
            // The handle is already durable; the next attempt recovers it.
            warn!(action = %action.id, handle = %id, error = %err, "submission confirmation failed");
            err
        })?;
        info!(action = %action.id, handle = %id, "launcher submitted");
        Ok(Submitted {
            id,
            tracking_url: report.tracking_url.unwrap_or_default(),
            recovered: false,
        })
    }

    /// Read the recovery record, if one exists.
    async fn recorded_handle(
        &self,
        ctx: &dyn Context,
    ) -> Result<Option<ApplicationId>, SubmitError> {
        let path = join(ctx.execution_dir(), RECOVERY_FILE);
        let bytes = match ctx.storage().read(&path).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => return Ok(None),
            Err(source) => return Err(SubmitError::Recovery { path, source }),
        };
        let content = String::from_utf8_lossy(&bytes).trim().to_owned();
        let id = ApplicationId::parse(&content)
            .map_err(|_| SubmitError::MalformedRecovery { path, content })?;
        Ok(Some(id))
    }

    /// Record the handle durably in the execution directory.
    async fn record_handle(
        &self,
        ctx: &dyn Context,
        id: ApplicationId,
    ) -> Result<(), SubmitError> {
        let path = join(ctx.execution_dir(), RECOVERY_FILE);
        ctx.storage()
            .write(&path, id.to_string().as_bytes())
            .await
            .map_err(|source| SubmitError::Recovery { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::{MockCluster, running_report};
    use gantry_core::id::ActionId;
    use gantry_core::testkit::TestContext;
    use pretty_assertions::assert_eq;

    fn action(user_retry: bool) -> ActionInfo {
        ActionInfo {
            user_retry,
            ..ActionInfo::new(
                ActionId::new("a1").unwrap(),
                ActionDefinition {
                    name: "step".to_owned(),
                    kind: "shell".to_owned(),
                    ..Default::default()
                },
            )
        }
    }

    fn spec() -> SubmissionSpec {
        SubmissionSpec {
            name: "gantry:launcher:T=shell:W=0000001-wf:A=step".to_owned(),
            queue: "default".to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fresh_submission_records_handle_before_confirmation() {
        let settings = EngineSettings::default();
        let cluster = MockCluster::new();
        let id = ApplicationId::new(1700, 1);
        cluster.script_submit(Ok(id));
        // Confirmation fails, but the handle must already be durable.
        cluster.script_report(id, Err(ClusterError::Unreachable("rm down".into())));
        let ctx = TestContext::new("/apps/demo", "/run/demo/a1");

        let err = SubmitProtocol::new(&settings, &cluster)
            .submit(&ctx, &action(false), &spec())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Cluster(_)));
        let recorded = ctx.storage_handle();
        assert!(recorded.paths().contains(&"/run/demo/a1/recovery.id".to_owned()));
    }

    #[tokio::test]
    async fn recovery_reuses_recorded_handle() {
        let settings = EngineSettings::default();
        let cluster = MockCluster::new();
        let id = ApplicationId::new(1700, 7);
        cluster.script_report(id, Ok(running_report()));
        let ctx = TestContext::new("/apps/demo", "/run/demo/a1");
        ctx.storage_handle()
            .put("/run/demo/a1/recovery.id", id.to_string().into_bytes());

        let submitted = SubmitProtocol::new(&settings, &cluster)
            .submit(&ctx, &action(false), &spec())
            .await
            .unwrap();
        assert!(submitted.recovered);
        assert_eq!(submitted.id, id);
        assert_eq!(submitted.tracking_url, "http://cluster.test/app");
        // No second cluster application was created.
        assert!(cluster.submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn user_retry_forces_fresh_submission() {
        let settings = EngineSettings::default();
        let cluster = MockCluster::new();
        let old = ApplicationId::new(1700, 7);
        let fresh = ApplicationId::new(1700, 8);
        cluster.script_submit(Ok(fresh));
        cluster.script_report(fresh, Ok(running_report()));
        let ctx = TestContext::new("/apps/demo", "/run/demo/a1");
        ctx.storage_handle()
            .put("/run/demo/a1/recovery.id", old.to_string().into_bytes());

        let submitted = SubmitProtocol::new(&settings, &cluster)
            .submit(&ctx, &action(true), &spec())
            .await
            .unwrap();
        assert!(!submitted.recovered);
        assert_eq!(submitted.id, fresh);
        assert_eq!(cluster.submitted.lock().len(), 1);
        // The recovery record now names the fresh handle.
        let stored = ctx.storage().read("/run/demo/a1/recovery.id").await.unwrap();
        assert_eq!(String::from_utf8(stored).unwrap(), fresh.to_string());
    }

    #[tokio::test]
    async fn purged_recovered_handle_is_unrecoverable() {
        let settings = EngineSettings::default();
        let cluster = MockCluster::new();
        let id = ApplicationId::new(1700, 7);
        cluster.script_report(id, Err(ClusterError::NotFound(id)));
        let ctx = TestContext::new("/apps/demo", "/run/demo/a1");
        ctx.storage_handle()
            .put("/run/demo/a1/recovery.id", id.to_string().into_bytes());

        let err = SubmitProtocol::new(&settings, &cluster)
            .submit(&ctx, &action(false), &spec())
            .await
            .unwrap_err();
        assert_eq!(err, SubmitError::UnrecoverableHandle(id));
    }

    #[tokio::test]
    async fn corrupt_recovery_record_is_reported() {
        let settings = EngineSettings::default();
        let cluster = MockCluster::new();
        let ctx = TestContext::new("/apps/demo", "/run/demo/a1");
        ctx.storage_handle()
            .put("/run/demo/a1/recovery.id", b"garbage".to_vec());

        let err = SubmitProtocol::new(&settings, &cluster)
            .submit(&ctx, &action(false), &spec())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::MalformedRecovery { .. }));
    }

    #[tokio::test]
    async fn spec_carries_classpath_queue_and_tag() {
        let settings = EngineSettings::default();
        let cluster = MockCluster::new();
        let protocol = SubmitProtocol::new(&settings, &cluster);
        let ctx = TestContext::new("/apps/demo", "/run/demo/a1");
        let def = action(false).definition;

        let mut manifest = Manifest::new();
        manifest.add(gantry_resource::ResourceEntry::file("/lib/a.jar"));
        manifest.add(gantry_resource::ResourceEntry::file("/lib/b.jar"));
        let launcher_conf: ExecConfig = [
            (keys::SUBMIT_QUEUE, "etl"),
            (keys::SUBMISSION_TAG, "gantry@0000001-wf@step"),
            ("launcher.memory.mb", "4096"),
        ]
        .into_iter()
        .collect();

        let spec = protocol.build_spec(
            &ctx,
            &def,
            "launcher-main",
            &IndexMap::new(),
            &launcher_conf,
            &ExecConfig::new(),
            manifest,
            TokenSet::new(),
        );
        assert_eq!(spec.queue, "etl");
        assert_eq!(spec.tag.as_deref(), Some("gantry@0000001-wf@step"));
        assert_eq!(spec.memory_mb, 4096);
        assert_eq!(spec.vcores, 1);
        assert_eq!(spec.env.get("CLASSPATH").unwrap(), "/lib/a.jar:/lib/b.jar");
        assert_eq!(spec.command[0], "launcher-main");
        assert_eq!(spec.name, "gantry:launcher:T=shell:W=0000001-wf:A=step");
    }
}
