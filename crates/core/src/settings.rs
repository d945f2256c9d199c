//! Immutable engine construction settings.
//!
//! All process-wide tunables are loaded once when the engine is built
//! and passed explicitly to every component; nothing here mutates after
//! construction.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::ExecConfig;

fn default_max_output_size() -> usize {
    2048
}

fn default_max_stats_size() -> usize {
    usize::MAX
}

fn default_queue() -> String {
    "default".to_owned()
}

fn default_launcher_memory_mb() -> u32 {
    2048
}

fn default_launcher_vcores() -> u32 {
    1
}

fn default_system_lib_dir() -> String {
    "gantry".to_owned()
}

fn default_true() -> bool {
    true
}

/// Engine-wide settings, constructed once and shared by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Maximum size of captured action output, in bytes. Larger output
    /// fails the check rather than being truncated silently.
    #[serde(default = "default_max_output_size")]
    pub max_output_size: usize,

    /// Maximum size of the launcher-reported stats blob, in bytes.
    #[serde(default = "default_max_stats_size")]
    pub max_stats_size: usize,

    /// Queue launcher applications are submitted to when the
    /// configuration does not name one.
    #[serde(default = "default_queue")]
    pub default_queue: String,

    /// Memory request for the launcher container, in MB.
    #[serde(default = "default_launcher_memory_mb")]
    pub launcher_memory_mb: u32,

    /// Virtual core request for the launcher container.
    #[serde(default = "default_launcher_vcores")]
    pub launcher_vcores: u32,

    /// Root directory of the versioned share libraries, when deployed.
    #[serde(default)]
    pub sharelib_root: Option<String>,

    /// Name of the system-wide common library directory under the
    /// share-library root.
    #[serde(default = "default_system_lib_dir")]
    pub system_lib_dir: String,

    /// Default for resolving action share libraries from the system
    /// library path when the job does not say otherwise.
    #[serde(default = "default_true")]
    pub use_system_libpath: bool,

    /// When `true`, submissions carry a tag so a restarted launcher's
    /// orphaned children can be found and killed.
    #[serde(default = "default_true")]
    pub kill_child_jobs_on_restart: bool,

    /// Engine-wide default for skipping credential resolution.
    #[serde(default)]
    pub skip_credentials: bool,

    /// Global root log level forwarded to launchers.
    #[serde(default)]
    pub root_log_level: Option<String>,

    /// Per-type root log level, taking precedence over the global one.
    #[serde(default)]
    pub type_root_log_levels: IndexMap<String, String>,

    /// Per-type default configuration layers, applied before any
    /// job-supplied layer.
    #[serde(default)]
    pub type_defaults: IndexMap<String, ExecConfig>,

    /// Per-type share-library name overrides, applied when neither the
    /// action nor the job configuration names one.
    #[serde(default)]
    pub type_sharelibs: IndexMap<String, String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_output_size: default_max_output_size(),
            max_stats_size: default_max_stats_size(),
            default_queue: default_queue(),
            launcher_memory_mb: default_launcher_memory_mb(),
            launcher_vcores: default_launcher_vcores(),
            sharelib_root: None,
            system_lib_dir: default_system_lib_dir(),
            use_system_libpath: true,
            kill_child_jobs_on_restart: true,
            skip_credentials: false,
            root_log_level: None,
            type_root_log_levels: IndexMap::new(),
            type_defaults: IndexMap::new(),
            type_sharelibs: IndexMap::new(),
        }
    }
}

impl EngineSettings {
    /// Default configuration layer for an action type, when configured.
    pub fn defaults_for(&self, kind: &str) -> Option<&ExecConfig> {
        self.type_defaults.get(kind)
    }

    /// Root log level for an action type: per-type first, then global.
    pub fn root_log_level_for(&self, kind: &str) -> Option<&str> {
        self.type_root_log_levels
            .get(kind)
            .or(self.root_log_level.as_ref())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_documented_values() {
        let settings = EngineSettings::default();
        assert_eq!(settings.max_output_size, 2048);
        assert_eq!(settings.default_queue, "default");
        assert_eq!(settings.launcher_memory_mb, 2048);
        assert_eq!(settings.launcher_vcores, 1);
        assert!(settings.use_system_libpath);
        assert!(settings.kill_child_jobs_on_restart);
        assert!(!settings.skip_credentials);
    }

    #[test]
    fn deserializes_from_partial_document() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"default_queue":"etl","launcher_memory_mb":1024}"#).unwrap();
        assert_eq!(settings.default_queue, "etl");
        assert_eq!(settings.launcher_memory_mb, 1024);
        assert_eq!(settings.max_output_size, 2048);
    }

    #[test]
    fn per_type_root_log_level_wins() {
        let mut settings = EngineSettings {
            root_log_level: Some("INFO".to_owned()),
            ..Default::default()
        };
        settings
            .type_root_log_levels
            .insert("shell".to_owned(), "DEBUG".to_owned());
        assert_eq!(settings.root_log_level_for("shell"), Some("DEBUG"));
        assert_eq!(settings.root_log_level_for("sql"), Some("INFO"));
    }
}
