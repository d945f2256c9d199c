//! Manifest entries and the display-name-keyed manifest.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How an entry is made available to the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Localized into the working directory as a named cache file.
    File,
    /// Localized and unpacked as a named archive.
    Archive,
    /// Placed directly on the execution classpath, not localized by
    /// name.
    ClasspathJar,
}

/// One remote resource to localize for the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Remote URI, without any display-name fragment.
    pub uri: String,
    /// Display name the entry is visible as in the execution
    /// environment. Identity for deduplication.
    pub name: String,
    /// Localization mode.
    pub kind: ResourceKind,
    /// Whether a symlink with the display name is created.
    pub symlink: bool,
}

impl ResourceEntry {
    /// Classify a file URI into a manifest entry.
    ///
    /// The display name is the URI fragment when one is given, else the
    /// base name. Plain `.jar` files without a fragment go on the
    /// classpath; shared objects are localized by name without a
    /// symlink; everything else is localized with a symlink. Spaces in
    /// the path are percent-encoded so the URI survives the cluster's
    /// localization layer.
    #[must_use]
    pub fn file(raw: &str) -> Self {
        let (path, fragment) = split_fragment(raw);
        let uri = path.replace(' ', "%20");
        let base = base_name(path);
        match fragment {
            None if path.ends_with(".jar") => Self {
                uri,
                name: base.to_owned(),
                kind: ResourceKind::ClasspathJar,
                symlink: false,
            },
            fragment if is_shared_object(base) => Self {
                uri,
                name: fragment.unwrap_or(base).to_owned(),
                kind: ResourceKind::File,
                symlink: false,
            },
            fragment => Self {
                uri,
                name: fragment.unwrap_or(base).to_owned(),
                kind: ResourceKind::File,
                symlink: true,
            },
        }
    }

    /// Classify an archive URI into a manifest entry.
    #[must_use]
    pub fn archive(raw: &str) -> Self {
        let (path, fragment) = split_fragment(raw);
        Self {
            uri: path.replace(' ', "%20"),
            name: fragment.unwrap_or(base_name(path)).to_owned(),
            kind: ResourceKind::Archive,
            symlink: true,
        }
    }
}

fn split_fragment(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('#') {
        Some((path, fragment)) if !fragment.is_empty() => (path, Some(fragment)),
        Some((path, _)) => (path, None),
        None => (raw, None),
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_shared_object(base: &str) -> bool {
    base.ends_with(".so") || base.contains(".so.")
}

/// Deduplicated resource set, keyed by display name.
///
/// Iteration preserves insertion order so identical inputs produce an
/// identical localization set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: IndexMap<String, ResourceEntry>,
}

impl Manifest {
    /// Create an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a generically localized entry. The first entry for a display
    /// name wins; returns `false` when the name was already taken.
    pub fn add(&mut self, entry: ResourceEntry) -> bool {
        if self.entries.contains_key(&entry.name) {
            return false;
        }
        self.entries.insert(entry.name.clone(), entry);
        true
    }

    /// Add a share-library-resolved entry, replacing any generically
    /// localized entry with the same display name.
    pub fn add_preferred(&mut self, entry: ResourceEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Look up an entry by display name.
    pub fn get(&self, name: &str) -> Option<&ResourceEntry> {
        self.entries.get(name)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.entries.values()
    }

    /// URIs of the classpath jars, in insertion order.
    pub fn classpath(&self) -> Vec<&str> {
        self.entries
            .values()
            .filter(|e| e.kind == ResourceKind::ClasspathJar)
            .map(|e| e.uri.as_str())
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the manifest holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
