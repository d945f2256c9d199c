//! Token container attached to a submission.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered set of acquired authentication tokens, keyed by the alias
/// the provider stored them under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSet {
    tokens: IndexMap<String, String>,
}

impl TokenSet {
    /// Create an empty token set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a token under an alias, replacing any previous one.
    pub fn insert(&mut self, alias: impl Into<String>, token: impl Into<String>) {
        self.tokens.insert(alias.into(), token.into());
    }

    /// Look up a token by alias.
    pub fn get(&self, alias: &str) -> Option<&str> {
        self.tokens.get(alias).map(String::as_str)
    }

    /// Returns `true` if a token is stored under the alias.
    pub fn contains(&self, alias: &str) -> bool {
        self.tokens.contains_key(alias)
    }

    /// Iterate tokens in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of stored tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` when no tokens are stored.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_and_lookup() {
        let mut tokens = TokenSet::new();
        tokens.insert("hcat", "token-1");
        assert!(tokens.contains("hcat"));
        assert_eq!(tokens.get("hcat"), Some("token-1"));
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut tokens = TokenSet::new();
        tokens.insert("z", "1");
        tokens.insert("a", "2");
        let aliases: Vec<&str> = tokens.iter().map(|(k, _)| k).collect();
        assert_eq!(aliases, vec!["z", "a"]);
    }
}
