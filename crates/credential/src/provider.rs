//! Provider contract and registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gantry_core::config::ExecConfig;
use gantry_core::context::Context;
use gantry_core::definition::CredentialDecl;

use crate::error::CredentialError;
use crate::token::TokenSet;

/// Acquires authentication tokens for one credential type.
///
/// Implementations are registered by type tag; the declaration passed
/// in has its templated properties already evaluated.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Acquire tokens for `decl` and store them in `tokens`.
    async fn update_credentials(
        &self,
        tokens: &mut TokenSet,
        conf: &ExecConfig,
        decl: &CredentialDecl,
        ctx: &dyn Context,
    ) -> Result<(), CredentialError>;
}

/// Registry of credential providers, keyed by type tag.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn CredentialProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for a type tag, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, provider: Arc<dyn CredentialProvider>) {
        self.providers.insert(kind.into(), provider);
    }

    /// Look up the provider for a type tag.
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn CredentialProvider>> {
        self.providers.get(kind)
    }

    /// Registered type tags.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("kinds", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullProvider;

    #[async_trait]
    impl CredentialProvider for NullProvider {
        async fn update_credentials(
            &self,
            _tokens: &mut TokenSet,
            _conf: &ExecConfig,
            _decl: &CredentialDecl,
            _ctx: &dyn Context,
        ) -> Result<(), CredentialError> {
            Ok(())
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ProviderRegistry::new();
        registry.register("hcat", Arc::new(NullProvider));
        assert!(registry.get("hcat").is_some());
        assert!(registry.get("hbase").is_none());
    }

    #[test]
    fn registration_replaces_previous() {
        let mut registry = ProviderRegistry::new();
        registry.register("hcat", Arc::new(NullProvider));
        registry.register("hcat", Arc::new(NullProvider));
        assert_eq!(registry.kinds().count(), 1);
    }
}
