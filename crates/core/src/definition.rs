//! Parsed action and job definition documents.
//!
//! Parsing of the definition document itself belongs to the outer
//! orchestrator; the engine consumes these already-structured forms and
//! only interprets their execution-relevant fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::ExecConfig;

/// The execution-relevant fields of one action's definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Action name within the workflow.
    pub name: String,
    /// Action type tag, resolved against the kind registry.
    pub kind: String,
    /// Paths of external configuration documents, in declaration order.
    /// Relative paths resolve against the application path.
    #[serde(default)]
    pub config_documents: Vec<String>,
    /// Inline configuration block.
    #[serde(default)]
    pub inline_config: ExecConfig,
    /// File declarations; each entry may be a comma-separated list.
    #[serde(default)]
    pub files: Vec<String>,
    /// Archive declarations; each entry may be a comma-separated list.
    #[serde(default)]
    pub archives: Vec<String>,
    /// Comma-separated credential names declared on the action.
    #[serde(default)]
    pub credentials: Option<String>,
    /// Arguments passed to the launcher entry point.
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-action launcher child process options, appended last.
    #[serde(default)]
    pub launcher_opts: Vec<String>,
    /// Whether the action requested output capture.
    #[serde(default)]
    pub capture_output: bool,
}

impl ActionDefinition {
    /// Credential names declared on the action, trimmed, in order.
    pub fn credential_names(&self) -> Vec<&str> {
        self.credentials
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One named credential declaration in the owning job's definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialDecl {
    /// Name the action refers to this credential by.
    pub name: String,
    /// Provider type implementing the acquisition.
    pub kind: String,
    /// Templated property name→value pairs, evaluated against the
    /// job's configuration variables before token acquisition.
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

/// The execution-relevant fields of the owning job's definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    /// Credential declarations available to the job's actions.
    #[serde(default)]
    pub credentials: Vec<CredentialDecl>,
}

impl JobDefinition {
    /// Find a credential declaration by name (case-insensitive, like
    /// the names actions declare).
    pub fn credential(&self, name: &str) -> Option<&CredentialDecl> {
        self.credentials
            .iter()
            .find(|decl| decl.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn credential_names_split_and_trim() {
        let def = ActionDefinition {
            credentials: Some(" hcat , hbase,".to_owned()),
            ..Default::default()
        };
        assert_eq!(def.credential_names(), vec!["hcat", "hbase"]);
    }

    #[test]
    fn credential_names_empty_when_undeclared() {
        assert!(ActionDefinition::default().credential_names().is_empty());
    }

    #[test]
    fn job_credential_lookup_is_case_insensitive() {
        let job = JobDefinition {
            credentials: vec![CredentialDecl {
                name: "HCat".to_owned(),
                kind: "hcat".to_owned(),
                properties: IndexMap::new(),
            }],
        };
        assert!(job.credential("hcat").is_some());
        assert!(job.credential("missing").is_none());
    }

    #[test]
    fn definition_deserializes_with_defaults() {
        let def: ActionDefinition =
            serde_json::from_str(r#"{"name":"step","kind":"shell"}"#).unwrap();
        assert_eq!(def.name, "step");
        assert!(def.files.is_empty());
        assert!(!def.capture_output);
    }
}
