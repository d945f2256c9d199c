//! Credential resolution over an action's declarations.

use gantry_core::config::ExecConfig;
use gantry_core::context::Context;
use gantry_core::definition::{ActionDefinition, CredentialDecl};
use gantry_core::keys;
use gantry_core::settings::EngineSettings;
use tracing::{debug, info};

use crate::error::CredentialError;
use crate::provider::ProviderRegistry;
use crate::token::TokenSet;

/// Resolves an action's declared credentials into a token set.
#[derive(Debug, Clone, Copy)]
pub struct CredentialInjector<'a> {
    settings: &'a EngineSettings,
    registry: &'a ProviderRegistry,
}

impl<'a> CredentialInjector<'a> {
    /// Create an injector over the engine settings and a provider
    /// registry.
    #[must_use]
    pub fn new(settings: &'a EngineSettings, registry: &'a ProviderRegistry) -> Self {
        Self { settings, registry }
    }

    /// Resolve every credential the action declares.
    ///
    /// Short-circuits to an empty token set when credential resolution
    /// is disabled for the action or the job. Evaluated declaration
    /// properties are merged into `action_conf` where absent, so the
    /// submitted job sees them as ordinary configuration.
    pub async fn resolve(
        &self,
        ctx: &dyn Context,
        def: &ActionDefinition,
        action_conf: &mut ExecConfig,
    ) -> Result<TokenSet, CredentialError> {
        let mut tokens = TokenSet::new();
        if self.skip_enabled(ctx, action_conf) {
            debug!(action = %def.name, "credential resolution disabled, skipping");
            return Ok(tokens);
        }

        for name in def.credential_names() {
            let decl = ctx
                .workflow()
                .definition
                .credential(name)
                .ok_or_else(|| CredentialError::MissingDeclaration(name.to_owned()))?;
            let evaluated = self.evaluate_declaration(ctx, decl)?;
            let provider = self
                .registry
                .get(&evaluated.kind)
                .ok_or_else(|| CredentialError::MissingProvider(evaluated.kind.clone()))?;
            provider
                .update_credentials(&mut tokens, action_conf, &evaluated, ctx)
                .await?;
            for (key, value) in &evaluated.properties {
                if !action_conf.contains(key) {
                    action_conf.set(key, value);
                }
            }
            info!(action = %def.name, credential = %evaluated.name, kind = %evaluated.kind, "credential resolved");
        }
        Ok(tokens)
    }

    /// Evaluate every templated property of a declaration.
    fn evaluate_declaration(
        &self,
        ctx: &dyn Context,
        decl: &CredentialDecl,
    ) -> Result<CredentialDecl, CredentialError> {
        let mut evaluated = decl.clone();
        for value in evaluated.properties.values_mut() {
            *value = ctx.evaluate(value)?;
        }
        Ok(evaluated)
    }

    /// Skip precedence: action configuration, then job configuration,
    /// then the engine default.
    fn skip_enabled(&self, ctx: &dyn Context, action_conf: &ExecConfig) -> bool {
        match action_conf.get(keys::SKIP_CREDENTIALS) {
            Some("true") => true,
            Some("false") => false,
            _ => match ctx.workflow().conf.get(keys::SKIP_CREDENTIALS) {
                Some("true") => true,
                Some("false") => false,
                _ => self.settings.skip_credentials,
            },
        }
    }
}
