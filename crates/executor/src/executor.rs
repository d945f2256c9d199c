//! The lifecycle driver sequencing assembly, submission and
//! reconciliation.

use std::sync::Arc;

use gantry_config::Assembler;
use gantry_core::context::{ActionInfo, CompletionStatus, Context};
use gantry_core::id::ApplicationId;
use gantry_core::keys;
use gantry_core::settings::EngineSettings;
use gantry_core::storage::{StorageError, join};
use gantry_credential::{CredentialInjector, ProviderRegistry};
use gantry_error::{Classifier, ClassifiedError, Result, codes};
use gantry_launcher::reconcile::{CheckOutcome, Reconciler};
use gantry_launcher::client::{ClusterClient, ClusterError};
use gantry_launcher::submit::SubmitProtocol;
use gantry_resource::{KindHints, ManifestBuilder};
use tracing::{debug, info, warn};

use crate::kind::KindRegistry;
use crate::status::ActionStatus;

/// Drives one action attempt through its lifecycle.
///
/// The executor holds no per-action state; every operation receives the
/// action's persisted record and its [`Context`], so many actions can
/// be driven concurrently through one executor.
pub struct ActionExecutor {
    settings: EngineSettings,
    classifier: Classifier,
    kinds: KindRegistry,
    providers: ProviderRegistry,
    client: Arc<dyn ClusterClient>,
}

impl ActionExecutor {
    /// Create an executor with the built-in kinds, the standard
    /// classifier and no credential providers.
    #[must_use]
    pub fn new(settings: EngineSettings, client: Arc<dyn ClusterClient>) -> Self {
        Self {
            settings,
            classifier: Classifier::standard(),
            kinds: KindRegistry::with_builtin(),
            providers: ProviderRegistry::new(),
            client,
        }
    }

    /// Replace the credential provider registry.
    #[must_use]
    pub fn with_providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    /// Replace the kind registry.
    #[must_use]
    pub fn with_kinds(mut self, kinds: KindRegistry) -> Self {
        self.kinds = kinds;
        self
    }

    /// Replace the error classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Start one attempt: prepare the execution directory, assemble the
    /// configurations, resolve resources and credentials, submit the
    /// launcher and run one immediate reconciliation to catch fast
    /// completions.
    pub async fn start(&self, ctx: &dyn Context, action: &ActionInfo) -> Result<ActionStatus> {
        let def = &action.definition;
        let kind = self.kinds.get(&def.kind).ok_or_else(|| {
            ClassifiedError::error(
                codes::MALFORMED_DOCUMENT,
                format!("unknown action type {:?}", def.kind),
            )
        })?;
        info!(action = %action.id, kind = %def.kind, "starting attempt");

        self.prepare_execution_dir(ctx).await?;

        let assembler = Assembler::new(&self.settings);
        let mut action_conf = assembler
            .action_config(ctx, def)
            .await
            .map_err(|err| err.classify(&self.classifier))?;
        let launcher_conf = assembler
            .launcher_config(ctx, def, &action_conf)
            .await
            .map_err(|err| err.classify(&self.classifier))?;

        let hints = KindHints {
            type_tag: kind.type_tag(),
            default_sharelib: kind.default_sharelib(),
            config_file_names: kind.config_file_names(),
        };
        let manifest = ManifestBuilder::new(&self.settings)
            .build(ctx, def, &mut action_conf, &hints)
            .await
            .map_err(|err| err.classify(&self.classifier))?;

        let tokens = CredentialInjector::new(&self.settings, &self.providers)
            .resolve(ctx, def, &mut action_conf)
            .await
            .map_err(|err| err.classify(&self.classifier))?;

        let protocol = SubmitProtocol::new(&self.settings, self.client.as_ref());
        let spec = protocol.build_spec(
            ctx,
            def,
            kind.entry_point(),
            &kind.extra_env(),
            &launcher_conf,
            &action_conf,
            manifest,
            tokens,
        );
        let submitted = protocol
            .submit(ctx, action, &spec)
            .await
            .map_err(|err| err.classify(&self.classifier))?;
        ctx.set_start_data(&submitted.id, &submitted.tracking_url);

        // One immediate reconciliation; a launcher can finish between
        // submission and the orchestrator's first poll.
        let mut current = action.clone();
        current.external_id = Some(submitted.id);
        let outcome = Reconciler::new(&self.settings, self.client.as_ref())
            .check(ctx, &current)
            .await
            .map_err(|err| err.classify(&self.classifier))?;
        Ok(match outcome {
            CheckOutcome::Running => ActionStatus::Submitted,
            terminal => status_from(terminal),
        })
    }

    /// One reconciliation round trip.
    pub async fn check(&self, ctx: &dyn Context, action: &ActionInfo) -> Result<ActionStatus> {
        let outcome = Reconciler::new(&self.settings, self.client.as_ref())
            .check(ctx, action)
            .await
            .map_err(|err| err.classify(&self.classifier))?;
        Ok(status_from(outcome))
    }

    /// Best-effort termination of the submission and every derivable
    /// child, then cleanup. Per-target failures are logged and do not
    /// abort the remainder; the action is marked killed regardless.
    pub async fn kill(&self, ctx: &dyn Context, action: &ActionInfo) -> Result<()> {
        let mut targets: Vec<ApplicationId> = Vec::new();
        if let Some(id) = action.external_id {
            targets.push(id);
        }
        for raw in &action.external_child_ids {
            match ApplicationId::parse(raw) {
                Ok(id) => targets.push(id),
                Err(_) => warn!(action = %action.id, child = %raw, "unparseable child id, skipping"),
            }
        }
        if self.settings.kill_child_jobs_on_restart {
            let tag =
                keys::submission_tag(ctx.workflow().id.as_str(), &action.definition.name);
            match self.client.applications_by_tag(&tag).await {
                Ok(ids) => targets.extend(ids),
                Err(err) => {
                    warn!(action = %action.id, tag = %tag, error = %err, "cannot enumerate tagged applications")
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        targets.retain(|id| seen.insert(*id));

        let mut failures = 0usize;
        for id in &targets {
            match self.client.kill_application(*id).await {
                Ok(()) => {}
                // A finished application cannot be killed; that is the
                // outcome we wanted.
                Err(ClusterError::NotFound(_)) => {
                    debug!(handle = %id, "application already finished")
                }
                Err(err) => {
                    failures += 1;
                    warn!(action = %action.id, handle = %id, error = %err, "kill failed");
                }
            }
        }
        info!(
            action = %action.id,
            targets = targets.len(),
            failures,
            "kill completed"
        );
        ctx.set_external_status("KILLED");
        ctx.set_execution_data("KILLED", None);
        self.cleanup_execution_dir(ctx).await;
        Ok(())
    }

    /// Record the final disposition and clean up. Cleanup failures are
    /// reported but never mask the outcome already recorded.
    pub async fn end(&self, ctx: &dyn Context, action: &ActionInfo) -> Result<CompletionStatus> {
        let status = match action
            .external_status
            .as_deref()
            .and_then(ActionStatus::from_external)
        {
            Some(ActionStatus::Succeeded) => CompletionStatus::Ok,
            _ => CompletionStatus::Error,
        };
        ctx.set_end_data(status);
        info!(action = %action.id, ?status, "attempt ended");
        self.cleanup_execution_dir(ctx).await;
        Ok(status)
    }

    /// Create the execution directory by preparing it under a temporary
    /// name and renaming, so a partially created directory is never
    /// observed. An existing directory is reused for recovery.
    async fn prepare_execution_dir(&self, ctx: &dyn Context) -> Result<()> {
        let dir = ctx.execution_dir();
        let storage = ctx.storage();
        if storage
            .exists(dir)
            .await
            .map_err(|err| self.classify_storage(&err, dir))?
        {
            debug!(dir, "execution directory already exists");
            return Ok(());
        }
        let tmp = format!("{}.tmp", dir.trim_end_matches('/'));
        storage
            .write(&join(&tmp, ".keep"), b"")
            .await
            .map_err(|err| self.classify_storage(&err, &tmp))?;
        storage
            .rename(&tmp, dir)
            .await
            .map_err(|err| self.classify_storage(&err, dir))?;
        debug!(dir, "execution directory created");
        Ok(())
    }

    /// Delete the execution directory unless the proto configuration
    /// asks to keep it. Best effort.
    async fn cleanup_execution_dir(&self, ctx: &dyn Context) {
        if ctx.proto_config().get_bool(keys::KEEP_EXECUTION_DIR, false) {
            debug!(dir = ctx.execution_dir(), "keeping execution directory");
            return;
        }
        if let Err(err) = ctx.storage().delete(ctx.execution_dir()).await {
            warn!(
                dir = ctx.execution_dir(),
                error = %err,
                "execution directory cleanup failed"
            );
        }
    }

    fn classify_storage(&self, err: &StorageError, path: &str) -> ClassifiedError {
        self.classifier.classify(err.cause(), format!("{path}: {err}"))
    }
}

fn status_from(outcome: CheckOutcome) -> ActionStatus {
    match outcome {
        CheckOutcome::Running => ActionStatus::Running,
        CheckOutcome::Succeeded => ActionStatus::Succeeded,
        CheckOutcome::Failed => ActionStatus::Failed,
        CheckOutcome::Killed => ActionStatus::Killed,
    }
}
