//! Per-type strategies and their registry.
//!
//! What the original system modelled as action-type subclasses is a
//! small strategy object here: each [`ActionKind`] supplies the per-type
//! inputs the shared lifecycle driver needs, nothing more.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

/// Per-type strategy consulted by the lifecycle driver.
pub trait ActionKind: Send + Sync {
    /// The type tag actions select this kind by.
    fn type_tag(&self) -> &str;

    /// Launcher entry point for this kind.
    fn entry_point(&self) -> &str;

    /// Share library resolved when no configuration names one.
    fn default_sharelib(&self) -> Option<&str> {
        None
    }

    /// Display names of share-library files that are configuration
    /// rather than binaries.
    fn config_file_names(&self) -> &[&str] {
        &[]
    }

    /// Extra environment entries for the launcher container.
    fn extra_env(&self) -> IndexMap<String, String> {
        IndexMap::new()
    }
}

/// Registry of action kinds, keyed by type tag.
#[derive(Default, Clone)]
pub struct KindRegistry {
    kinds: HashMap<String, Arc<dyn ActionKind>>,
}

impl KindRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in kinds.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ShellKind));
        registry
    }

    /// Register a kind under its type tag, replacing any previous one.
    pub fn register(&mut self, kind: Arc<dyn ActionKind>) {
        self.kinds.insert(kind.type_tag().to_owned(), kind);
    }

    /// Look up a kind by type tag.
    pub fn get(&self, type_tag: &str) -> Option<&Arc<dyn ActionKind>> {
        self.kinds.get(type_tag)
    }

    /// Registered type tags.
    pub fn type_tags(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindRegistry")
            .field("type_tags", &self.kinds.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Runs a shell command through the launcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellKind;

impl ActionKind for ShellKind {
    fn type_tag(&self) -> &str {
        "shell"
    }

    fn entry_point(&self) -> &str {
        "gantry-shell-launcher"
    }

    fn default_sharelib(&self) -> Option<&str> {
        Some("shell")
    }

    fn config_file_names(&self) -> &[&str] {
        &["shell-site.json"]
    }

    fn extra_env(&self) -> IndexMap<String, String> {
        IndexMap::from([("GANTRY_ACTION_TYPE".to_owned(), "shell".to_owned())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_resolves_shell() {
        let registry = KindRegistry::with_builtin();
        let kind = registry.get("shell").expect("shell registered");
        assert_eq!(kind.type_tag(), "shell");
        assert_eq!(kind.default_sharelib(), Some("shell"));
        assert!(registry.get("sql").is_none());
    }

    #[test]
    fn registration_replaces_previous() {
        let mut registry = KindRegistry::new();
        registry.register(Arc::new(ShellKind));
        registry.register(Arc::new(ShellKind));
        assert_eq!(registry.type_tags().count(), 1);
    }
}
