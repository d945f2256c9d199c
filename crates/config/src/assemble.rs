//! Layered configuration assembly.

use gantry_core::config::ExecConfig;
use gantry_core::context::Context;
use gantry_core::definition::ActionDefinition;
use gantry_core::settings::EngineSettings;
use gantry_core::storage::join;
use gantry_core::keys;
use tracing::debug;

use crate::error::ConfigError;

/// Assembles the action and launcher configurations for one submission.
///
/// Assembly is deterministic: the same definition, context and settings
/// yield byte-identical serialized output, so a crash between staging
/// and submission can be retried by re-running the whole pass.
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'a> {
    settings: &'a EngineSettings,
}

impl<'a> Assembler<'a> {
    /// Create an assembler over the engine settings.
    #[must_use]
    pub fn new(settings: &'a EngineSettings) -> Self {
        Self { settings }
    }

    /// Assemble the action's own execution configuration.
    ///
    /// Layer precedence, lowest to highest: engine connection defaults,
    /// per-type defaults, each external document in declaration order,
    /// the inline block, job-submission-time overrides. Every injected
    /// layer is checked against the disallowed-key set before merge.
    pub async fn action_config(
        &self,
        ctx: &dyn Context,
        def: &ActionDefinition,
    ) -> Result<ExecConfig, ConfigError> {
        let mut conf = self.connection_defaults(ctx);

        if let Some(defaults) = self.settings.defaults_for(&def.kind) {
            check_disallowed(defaults, "type-default")?;
            conf.merge(defaults);
        }

        for path in &def.config_documents {
            let resolved = resolve_path(&ctx.workflow().app_path, path);
            let layer = self.read_document(ctx, &resolved).await?;
            check_disallowed(&layer, &resolved)?;
            conf.merge(&layer);
        }

        check_disallowed(&def.inline_config, "inline")?;
        conf.merge(&def.inline_config);

        let overrides = &ctx.workflow().conf;
        check_disallowed(overrides, "job-submission")?;
        conf.merge(overrides);

        if conf.get(keys::ACL_MODIFY).is_none_or(|v| v.trim().is_empty())
            && let Some(group) = &ctx.workflow().group_acl
        {
            conf.set(keys::ACL_MODIFY, group);
        }

        if conf.get(keys::ROOT_LOG_LEVEL).is_none()
            && let Some(level) = self.settings.root_log_level_for(&def.kind)
        {
            conf.set(keys::ROOT_LOG_LEVEL, level);
        }

        debug!(action = %def.name, entries = conf.len(), "assembled action configuration");
        Ok(conf)
    }

    /// Assemble the launcher's configuration from the `launcher.`
    /// sub-namespace of every layer.
    ///
    /// Each `launcher.<key>` entry is carried both prefixed and
    /// unprefixed; the disallowed-key check runs on the copied result
    /// so `launcher.user.name` cannot smuggle an identity override in.
    pub async fn launcher_config(
        &self,
        ctx: &dyn Context,
        def: &ActionDefinition,
        action_conf: &ExecConfig,
    ) -> Result<ExecConfig, ConfigError> {
        let mut conf = self.connection_defaults(ctx);

        if let Some(defaults) = self.settings.defaults_for(&def.kind) {
            self.merge_launcher_layer(&mut conf, defaults, "type-default")?;
        }

        for path in &def.config_documents {
            let resolved = resolve_path(&ctx.workflow().app_path, path);
            let layer = self.read_document(ctx, &resolved).await?;
            self.merge_launcher_layer(&mut conf, &layer, &resolved)?;
        }

        self.merge_launcher_layer(&mut conf, &def.inline_config, "inline")?;
        self.merge_launcher_layer(&mut conf, &ctx.workflow().conf, "job-submission")?;

        conf.set(keys::CALLBACK_URL, ctx.callback_url(keys::STATUS_TOKEN));

        // Child options accumulate across layers instead of replacing;
        // the per-action list is appended last so it wins on conflicts.
        let mut opts = conf.get(keys::CHILD_OPTS).unwrap_or_default().to_owned();
        for opt in &def.launcher_opts {
            if !opts.is_empty() {
                opts.push(' ');
            }
            opts.push_str(opt.trim());
        }
        if !opts.trim().is_empty() {
            conf.set(keys::CHILD_OPTS, opts.trim());
        }

        if self.settings.kill_child_jobs_on_restart {
            let wf = ctx.workflow();
            conf.set(
                keys::SUBMISSION_TAG,
                keys::submission_tag(wf.id.as_str(), &def.name),
            );
        }

        let sharelib_key = format!("{}{}", keys::SHARELIB_FOR_PREFIX, def.kind);
        if let Some(names) = action_conf.get(&sharelib_key) {
            conf.set(sharelib_key, names);
        }

        // Queue and ACLs set on the action apply to the launcher too,
        // unless the launcher namespace named them explicitly.
        for key in keys::PROMOTED {
            let prefixed = format!("{}{key}", keys::LAUNCHER_PREFIX);
            if conf.get(&prefixed).is_none()
                && let Some(value) = action_conf.get(key)
            {
                conf.set(*key, value);
            }
        }

        if conf.get(keys::ROOT_LOG_LEVEL).is_none() {
            if let Some(level) = action_conf.get(keys::ROOT_LOG_LEVEL) {
                conf.set(keys::ROOT_LOG_LEVEL, level);
            } else if let Some(level) = self.settings.root_log_level_for(&def.kind) {
                conf.set(keys::ROOT_LOG_LEVEL, level);
            }
        }

        if conf.get(keys::SUBMIT_QUEUE).is_none() {
            conf.set(keys::SUBMIT_QUEUE, &self.settings.default_queue);
        }

        debug!(action = %def.name, entries = conf.len(), "assembled launcher configuration");
        Ok(conf)
    }

    /// Connection and identity entries only the engine may set.
    fn connection_defaults(&self, ctx: &dyn Context) -> ExecConfig {
        let mut conf = ExecConfig::new();
        conf.set(keys::USER_NAME, &ctx.workflow().user);
        let proto = ctx.proto_config();
        if let Some(manager) = proto.get(keys::CLUSTER_MANAGER) {
            conf.set(keys::CLUSTER_MANAGER, manager);
        }
        if let Some(storage) = proto.get(keys::CLUSTER_STORAGE) {
            conf.set(keys::CLUSTER_STORAGE, storage);
        }
        conf
    }

    /// Read one external document, run the substitution pass over its
    /// text, and parse it as a flat key→value object.
    async fn read_document(
        &self,
        ctx: &dyn Context,
        resolved: &str,
    ) -> Result<ExecConfig, ConfigError> {
        let bytes = ctx
            .storage()
            .read(resolved)
            .await
            .map_err(|source| ConfigError::Document {
                path: resolved.to_owned(),
                source,
            })?;
        let text = String::from_utf8(bytes).map_err(|err| ConfigError::Malformed {
            path: resolved.to_owned(),
            detail: err.to_string(),
        })?;
        let evaluated = ctx.evaluate(&text)?;
        parse_document(resolved, &evaluated)
    }

    /// Copy the `launcher.` sub-namespace of `layer` into `conf`, both
    /// prefixed and unprefixed, checking the copied entries.
    fn merge_launcher_layer(
        &self,
        conf: &mut ExecConfig,
        layer: &ExecConfig,
        name: &str,
    ) -> Result<(), ConfigError> {
        let mut staged = ExecConfig::new();
        for (key, value) in layer.iter() {
            if let Some(unprefixed) = key.strip_prefix(keys::LAUNCHER_PREFIX) {
                staged.set(key, value);
                staged.set(unprefixed, value);
            }
        }
        check_disallowed(&staged, name)?;
        conf.merge(&staged);
        Ok(())
    }
}

/// Resolve a document path: absolute paths and full URIs stand as-is,
/// anything else is relative to the application path.
fn resolve_path(app_path: &str, path: &str) -> String {
    if path.starts_with('/') || path.contains("://") {
        path.to_owned()
    } else {
        join(app_path, path)
    }
}

/// Parse a document as a JSON object of string values.
fn parse_document(path: &str, text: &str) -> Result<ExecConfig, ConfigError> {
    serde_json::from_str(text).map_err(|err| ConfigError::Malformed {
        path: path.to_owned(),
        detail: err.to_string(),
    })
}

/// Reject any layer carrying an identity or endpoint override.
pub fn check_disallowed(conf: &ExecConfig, layer: &str) -> Result<(), ConfigError> {
    for key in keys::DISALLOWED {
        if conf.contains(key) {
            return Err(ConfigError::DisallowedKey {
                key: (*key).to_owned(),
                layer: layer.to_owned(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::testkit::TestContext;
    use pretty_assertions::assert_eq;

    fn context() -> TestContext {
        TestContext::new("/apps/demo", "/run/demo/a1")
            .with_proto(keys::CLUSTER_MANAGER, "manager.test:8032")
            .with_proto(keys::CLUSTER_STORAGE, "store://cluster")
    }

    fn definition() -> ActionDefinition {
        ActionDefinition {
            name: "step".to_owned(),
            kind: "shell".to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn layers_apply_in_precedence_order() {
        let mut settings = EngineSettings::default();
        settings.type_defaults.insert(
            "shell".to_owned(),
            [("shared", "default"), ("only.default", "d")].into_iter().collect(),
        );
        let ctx = context();
        ctx.storage_handle().put(
            "/apps/demo/conf.json",
            br#"{"shared":"document","only.doc":"1"}"#.to_vec(),
        );
        let mut def = definition();
        def.config_documents.push("conf.json".to_owned());
        def.inline_config.set("shared", "inline");

        let conf = Assembler::new(&settings)
            .action_config(&ctx, &def)
            .await
            .unwrap();
        assert_eq!(conf.get("shared"), Some("inline"));
        assert_eq!(conf.get("only.default"), Some("d"));
        assert_eq!(conf.get("only.doc"), Some("1"));
        assert_eq!(conf.get(keys::USER_NAME), Some("tester"));
        assert_eq!(conf.get(keys::CLUSTER_MANAGER), Some("manager.test:8032"));
    }

    #[tokio::test]
    async fn job_overrides_win_over_inline() {
        let settings = EngineSettings::default();
        let mut ctx = context();
        ctx.workflow_mut().conf.set("shared", "job");
        let mut def = definition();
        def.inline_config.set("shared", "inline");

        let conf = Assembler::new(&settings)
            .action_config(&ctx, &def)
            .await
            .unwrap();
        assert_eq!(conf.get("shared"), Some("job"));
    }

    #[tokio::test]
    async fn assembly_is_idempotent() {
        let settings = EngineSettings::default();
        let ctx = context();
        ctx.storage_handle()
            .put("/apps/demo/conf.json", br#"{"a":"1","b":"2"}"#.to_vec());
        let mut def = definition();
        def.config_documents.push("conf.json".to_owned());
        def.inline_config.set("c", "3");

        let assembler = Assembler::new(&settings);
        let first = assembler.action_config(&ctx, &def).await.unwrap();
        let second = assembler.action_config(&ctx, &def).await.unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn disallowed_key_in_document_names_the_layer() {
        let settings = EngineSettings::default();
        let ctx = context();
        ctx.storage_handle()
            .put("/apps/demo/evil.json", br#"{"user.name":"mallory"}"#.to_vec());
        let mut def = definition();
        def.config_documents.push("evil.json".to_owned());

        let err = Assembler::new(&settings)
            .action_config(&ctx, &def)
            .await
            .unwrap_err();
        match err {
            ConfigError::DisallowedKey { key, layer } => {
                assert_eq!(key, "user.name");
                assert_eq!(layer, "/apps/demo/evil.json");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn disallowed_key_in_inline_block_is_rejected() {
        let settings = EngineSettings::default();
        let ctx = context();
        let mut def = definition();
        def.inline_config.set(keys::CLUSTER_MANAGER, "rogue:8032");

        let err = Assembler::new(&settings)
            .action_config(&ctx, &def)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::DisallowedKey { ref layer, .. } if layer == "inline"));
    }

    #[tokio::test]
    async fn documents_pass_through_substitution() {
        let settings = EngineSettings::default();
        let ctx = context();
        ctx.storage_handle().put(
            "/apps/demo/conf.json",
            br#"{"data.root":"${wf:appPath()}/data"}"#.to_vec(),
        );
        let mut def = definition();
        def.config_documents.push("conf.json".to_owned());

        let conf = Assembler::new(&settings)
            .action_config(&ctx, &def)
            .await
            .unwrap();
        assert_eq!(conf.get("data.root"), Some("/apps/demo/data"));
    }

    #[tokio::test]
    async fn absolute_document_paths_are_not_rebased() {
        let settings = EngineSettings::default();
        let ctx = context();
        ctx.storage_handle()
            .put("/shared/common.json", br#"{"x":"1"}"#.to_vec());
        let mut def = definition();
        def.config_documents.push("/shared/common.json".to_owned());

        let conf = Assembler::new(&settings)
            .action_config(&ctx, &def)
            .await
            .unwrap();
        assert_eq!(conf.get("x"), Some("1"));
    }

    #[tokio::test]
    async fn missing_document_fails_with_storage_cause() {
        let settings = EngineSettings::default();
        let ctx = context();
        let mut def = definition();
        def.config_documents.push("absent.json".to_owned());

        let err = Assembler::new(&settings)
            .action_config(&ctx, &def)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Document { .. }));
    }

    #[tokio::test]
    async fn malformed_document_is_rejected() {
        let settings = EngineSettings::default();
        let ctx = context();
        ctx.storage_handle()
            .put("/apps/demo/conf.json", b"not json".to_vec());
        let mut def = definition();
        def.config_documents.push("conf.json".to_owned());

        let err = Assembler::new(&settings)
            .action_config(&ctx, &def)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[tokio::test]
    async fn modify_acl_defaults_to_workflow_group() {
        let settings = EngineSettings::default();
        let mut ctx = context();
        ctx.workflow_mut().group_acl = Some("analysts".to_owned());
        let conf = Assembler::new(&settings)
            .action_config(&ctx, &definition())
            .await
            .unwrap();
        assert_eq!(conf.get(keys::ACL_MODIFY), Some("analysts"));
    }

    #[tokio::test]
    async fn explicit_modify_acl_is_kept() {
        let settings = EngineSettings::default();
        let mut ctx = context();
        ctx.workflow_mut().group_acl = Some("analysts".to_owned());
        let mut def = definition();
        def.inline_config.set(keys::ACL_MODIFY, "ops");
        let conf = Assembler::new(&settings)
            .action_config(&ctx, &def)
            .await
            .unwrap();
        assert_eq!(conf.get(keys::ACL_MODIFY), Some("ops"));
    }

    #[tokio::test]
    async fn launcher_entries_are_copied_unprefixed() {
        let settings = EngineSettings::default();
        let ctx = context();
        let mut def = definition();
        def.inline_config.set("launcher.memory.mb", "4096");
        def.inline_config.set("plain.key", "ignored");

        let action_conf = ExecConfig::new();
        let conf = Assembler::new(&settings)
            .launcher_config(&ctx, &def, &action_conf)
            .await
            .unwrap();
        assert_eq!(conf.get("launcher.memory.mb"), Some("4096"));
        assert_eq!(conf.get("memory.mb"), Some("4096"));
        assert_eq!(conf.get("plain.key"), None);
    }

    #[tokio::test]
    async fn launcher_prefixed_identity_override_is_rejected() {
        let settings = EngineSettings::default();
        let ctx = context();
        let mut def = definition();
        def.inline_config.set("launcher.user.name", "mallory");

        let err = Assembler::new(&settings)
            .launcher_config(&ctx, &def, &ExecConfig::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::DisallowedKey { ref key, .. } if key == "user.name"));
    }

    #[tokio::test]
    async fn promoted_keys_copied_only_when_unset() {
        let settings = EngineSettings::default();
        let ctx = context();
        let mut def = definition();
        def.inline_config.set("launcher.submit.queue", "fast");

        let action_conf: ExecConfig = [
            (keys::SUBMIT_QUEUE, "batch"),
            (keys::ACL_VIEW, "everyone"),
        ]
        .into_iter()
        .collect();
        let conf = Assembler::new(&settings)
            .launcher_config(&ctx, &def, &action_conf)
            .await
            .unwrap();
        // The explicit launcher queue wins; the view ACL is promoted.
        assert_eq!(conf.get(keys::SUBMIT_QUEUE), Some("fast"));
        assert_eq!(conf.get(keys::ACL_VIEW), Some("everyone"));
    }

    #[tokio::test]
    async fn callback_url_carries_status_token() {
        let settings = EngineSettings::default();
        let ctx = context();
        let conf = Assembler::new(&settings)
            .launcher_config(&ctx, &definition(), &ExecConfig::new())
            .await
            .unwrap();
        let url = conf.get(keys::CALLBACK_URL).unwrap();
        assert!(url.contains(keys::STATUS_TOKEN), "url was {url}");
    }

    #[tokio::test]
    async fn child_opts_accumulate_across_layers() {
        let mut settings = EngineSettings::default();
        settings.type_defaults.insert(
            "shell".to_owned(),
            [(keys::CHILD_OPTS, "-Xmx512m")].into_iter().collect(),
        );
        let ctx = context();
        let mut def = definition();
        def.launcher_opts.push("-Dverbose=true".to_owned());

        let conf = Assembler::new(&settings)
            .launcher_config(&ctx, &def, &ExecConfig::new())
            .await
            .unwrap();
        assert_eq!(conf.get(keys::CHILD_OPTS), Some("-Xmx512m -Dverbose=true"));
    }

    #[tokio::test]
    async fn submission_tag_present_when_restart_kill_enabled() {
        let settings = EngineSettings::default();
        let ctx = context();
        let conf = Assembler::new(&settings)
            .launcher_config(&ctx, &definition(), &ExecConfig::new())
            .await
            .unwrap();
        assert_eq!(conf.get(keys::SUBMISSION_TAG), Some("gantry@0000001-wf@step"));
    }

    #[tokio::test]
    async fn submission_tag_absent_when_disabled() {
        let settings = EngineSettings {
            kill_child_jobs_on_restart: false,
            ..Default::default()
        };
        let ctx = context();
        let conf = Assembler::new(&settings)
            .launcher_config(&ctx, &definition(), &ExecConfig::new())
            .await
            .unwrap();
        assert_eq!(conf.get(keys::SUBMISSION_TAG), None);
    }

    #[tokio::test]
    async fn launcher_queue_falls_back_to_settings_default() {
        let settings = EngineSettings {
            default_queue: "etl".to_owned(),
            ..Default::default()
        };
        let ctx = context();
        let conf = Assembler::new(&settings)
            .launcher_config(&ctx, &definition(), &ExecConfig::new())
            .await
            .unwrap();
        assert_eq!(conf.get(keys::SUBMIT_QUEUE), Some("etl"));
    }

    #[tokio::test]
    async fn sharelib_override_propagates_to_launcher() {
        let settings = EngineSettings::default();
        let ctx = context();
        let action_conf: ExecConfig = [("action.sharelib.for.shell", "shell,extra")]
            .into_iter()
            .collect();
        let conf = Assembler::new(&settings)
            .launcher_config(&ctx, &definition(), &action_conf)
            .await
            .unwrap();
        assert_eq!(conf.get("action.sharelib.for.shell"), Some("shell,extra"));
    }

    #[tokio::test]
    async fn root_log_level_forwarded_from_settings() {
        let mut settings = EngineSettings::default();
        settings.root_log_level = Some("INFO".to_owned());
        settings
            .type_root_log_levels
            .insert("shell".to_owned(), "DEBUG".to_owned());
        let ctx = context();
        let action = Assembler::new(&settings)
            .action_config(&ctx, &definition())
            .await
            .unwrap();
        assert_eq!(action.get(keys::ROOT_LOG_LEVEL), Some("DEBUG"));
        let launcher = Assembler::new(&settings)
            .launcher_config(&ctx, &definition(), &action)
            .await
            .unwrap();
        assert_eq!(launcher.get(keys::ROOT_LOG_LEVEL), Some("DEBUG"));
    }
}
