//! In-memory implementations of the collaborator contracts.
//!
//! These back the unit and integration tests of every gantry crate and
//! are usable for local dry runs; nothing here touches a real cluster.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::config::ExecConfig;
use crate::context::{CompletionStatus, Context, EvalError, WorkflowInfo};
use crate::definition::JobDefinition;
use crate::id::{ApplicationId, WorkflowId};
use crate::storage::{Storage, StorageError};

/// In-memory [`Storage`] keyed by full path.
///
/// Directories are implicit: `list` returns every stored path directly
/// under the given prefix.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<IndexMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file synchronously, for test setup.
    pub fn put(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.files.lock().insert(path.to_owned(), data.into());
    }

    /// Snapshot of every stored path.
    pub fn paths(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let files = self.files.lock();
        let dir_prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(files.contains_key(path) || files.keys().any(|p| p.starts_with(&dir_prefix)))
    }

    async fn is_file(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.files.lock().contains_key(path))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_owned()))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        self.files.lock().insert(path.to_owned(), data.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let mut files = self.files.lock();
        let dir_prefix = format!("{}/", path.trim_end_matches('/'));
        files.retain(|p, _| p != path && !p.starts_with(&dir_prefix));
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let mut files = self.files.lock();
        let dir_prefix = format!("{}/", from.trim_end_matches('/'));
        let moved: Vec<(String, Vec<u8>)> = files
            .iter()
            .filter(|(p, _)| p.as_str() == from || p.starts_with(&dir_prefix))
            .map(|(p, data)| {
                let suffix = &p[from.len()..];
                (format!("{to}{suffix}"), data.clone())
            })
            .collect();
        if moved.is_empty() {
            return Err(StorageError::NotFound(from.to_owned()));
        }
        files.retain(|p, _| p != from && !p.starts_with(&dir_prefix));
        for (path, data) in moved {
            files.insert(path, data);
        }
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|p| {
                p.starts_with(&prefix) && !p[prefix.len()..].contains('/')
            })
            .cloned()
            .collect())
    }
}

/// Substitute `${name}` references using the given variables.
///
/// Unknown references fail rather than passing through silently, so a
/// typo in a credential property surfaces at assembly time.
pub fn substitute(input: &str, vars: &IndexMap<String, String>) -> Result<String, EvalError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| EvalError(format!("unterminated reference in {input:?}")))?;
        let name = &after[..end];
        let value = vars
            .get(name)
            .ok_or_else(|| EvalError(format!("undefined variable {name:?}")))?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Recorded mutations a [`TestContext`] observed.
#[derive(Debug, Default)]
pub struct Recorded {
    /// Handle and tracking URL from `set_start_data`.
    pub start_data: Option<(ApplicationId, String)>,
    /// Every `set_external_status` value, in order.
    pub external_statuses: Vec<String>,
    /// Every `set_execution_data` call, in order.
    pub execution_data: Vec<(String, Option<String>)>,
    /// Last stats blob.
    pub stats: Option<String>,
    /// Last child id list.
    pub external_child_ids: Option<String>,
    /// Last structured error.
    pub error_info: Option<(String, String)>,
    /// Final disposition.
    pub end_status: Option<CompletionStatus>,
}

/// An in-memory [`Context`] that records every mutation.
pub struct TestContext {
    workflow: WorkflowInfo,
    proto: ExecConfig,
    execution_dir: String,
    storage: Arc<MemoryStorage>,
    vars: IndexMap<String, String>,
    recorded: Mutex<Recorded>,
}

impl TestContext {
    /// Create a context for the given app path; the workflow's
    /// configuration entries double as evaluation variables.
    pub fn new(app_path: &str, execution_dir: &str) -> Self {
        let workflow = WorkflowInfo {
            id: WorkflowId::new("0000001-wf").expect("static id"),
            app_name: "test-app".to_owned(),
            app_path: app_path.to_owned(),
            user: "tester".to_owned(),
            group_acl: None,
            created_at: Utc::now(),
            definition: JobDefinition::default(),
            conf: ExecConfig::new(),
        };
        let mut vars = IndexMap::new();
        vars.insert("wf:appPath()".to_owned(), app_path.to_owned());
        Self {
            workflow,
            proto: ExecConfig::new(),
            execution_dir: execution_dir.to_owned(),
            storage: Arc::new(MemoryStorage::new()),
            vars,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Replace the workflow metadata.
    #[must_use]
    pub fn with_workflow(mut self, workflow: WorkflowInfo) -> Self {
        self.workflow = workflow;
        self
    }

    /// Set a proto-configuration entry.
    #[must_use]
    pub fn with_proto(mut self, key: &str, value: &str) -> Self {
        self.proto.set(key, value);
        self
    }

    /// Register an evaluation variable, also visible as a job
    /// configuration entry.
    #[must_use]
    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_owned(), value.to_owned());
        self.workflow.conf.set(name, value);
        self
    }

    /// Shared handle to the in-memory storage, for seeding files.
    pub fn storage_handle(&self) -> Arc<MemoryStorage> {
        Arc::clone(&self.storage)
    }

    /// Inspect recorded mutations.
    pub fn recorded(&self) -> parking_lot::MutexGuard<'_, Recorded> {
        self.recorded.lock()
    }

    /// Mutable access to the workflow metadata, for test setup.
    pub fn workflow_mut(&mut self) -> &mut WorkflowInfo {
        &mut self.workflow
    }
}

impl Context for TestContext {
    fn workflow(&self) -> &WorkflowInfo {
        &self.workflow
    }

    fn proto_config(&self) -> &ExecConfig {
        &self.proto
    }

    fn execution_dir(&self) -> &str {
        &self.execution_dir
    }

    fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    fn callback_url(&self, status_token: &str) -> String {
        format!(
            "http://orchestrator.test/callback?id={}&status={status_token}",
            self.workflow.id
        )
    }

    fn evaluate(&self, input: &str) -> Result<String, EvalError> {
        substitute(input, &self.vars)
    }

    fn set_start_data(&self, external_id: &ApplicationId, tracking_url: &str) {
        self.recorded.lock().start_data = Some((*external_id, tracking_url.to_owned()));
    }

    fn set_external_status(&self, status: &str) {
        self.recorded.lock().external_statuses.push(status.to_owned());
    }

    fn set_execution_data(&self, external_status: &str, output: Option<&str>) {
        self.recorded
            .lock()
            .execution_data
            .push((external_status.to_owned(), output.map(str::to_owned)));
    }

    fn set_execution_stats(&self, stats: &str) {
        self.recorded.lock().stats = Some(stats.to_owned());
    }

    fn set_external_child_ids(&self, ids: &str) {
        self.recorded.lock().external_child_ids = Some(ids.to_owned());
    }

    fn set_error_info(&self, code: &str, message: &str) {
        self.recorded.lock().error_info = Some((code.to_owned(), message.to_owned()));
    }

    fn set_end_data(&self, status: CompletionStatus) {
        self.recorded.lock().end_status = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.write("/dir/file", b"data").await.unwrap();
        assert!(storage.exists("/dir/file").await.unwrap());
        assert!(storage.is_file("/dir/file").await.unwrap());
        assert_eq!(storage.read("/dir/file").await.unwrap(), b"data");
        storage.delete("/dir/file").await.unwrap();
        assert!(!storage.exists("/dir/file").await.unwrap());
    }

    #[tokio::test]
    async fn memory_storage_list_is_shallow() {
        let storage = MemoryStorage::new();
        storage.put("/lib/a.jar", b"a".to_vec());
        storage.put("/lib/sub/b.jar", b"b".to_vec());
        let mut listed = storage.list("/lib").await.unwrap();
        listed.sort();
        assert_eq!(listed, vec!["/lib/a.jar"]);
    }

    #[tokio::test]
    async fn memory_storage_rename_moves_tree() {
        let storage = MemoryStorage::new();
        storage.put("/run/1.tmp/.keep", b"".to_vec());
        storage.put("/run/1.tmp/conf.json", b"{}".to_vec());
        storage.rename("/run/1.tmp", "/run/1").await.unwrap();
        assert!(storage.is_file("/run/1/conf.json").await.unwrap());
        assert!(!storage.exists("/run/1.tmp").await.unwrap());
    }

    #[tokio::test]
    async fn memory_storage_delete_removes_tree() {
        let storage = MemoryStorage::new();
        storage.put("/run/1/status.json", b"{}".to_vec());
        storage.put("/run/1/recovery.id", b"x".to_vec());
        storage.delete("/run/1").await.unwrap();
        assert!(!storage.exists("/run/1").await.unwrap());
    }

    #[test]
    fn substitute_replaces_references() {
        let mut vars = IndexMap::new();
        vars.insert("wf:appPath()".to_owned(), "/apps/demo".to_owned());
        let out = substitute("${wf:appPath()}/meta", &vars).unwrap();
        assert_eq!(out, "/apps/demo/meta");
    }

    #[test]
    fn substitute_rejects_undefined() {
        let vars = IndexMap::new();
        assert!(substitute("${missing}", &vars).is_err());
    }

    #[test]
    fn substitute_rejects_unterminated() {
        let vars = IndexMap::new();
        assert!(substitute("${open", &vars).is_err());
    }

    #[test]
    fn context_records_mutations() {
        let ctx = TestContext::new("/apps/demo", "/run/demo/a1");
        ctx.set_external_status("RUNNING");
        ctx.set_error_info("GA018", "bad jar");
        ctx.set_end_data(CompletionStatus::Error);
        let recorded = ctx.recorded();
        assert_eq!(recorded.external_statuses, vec!["RUNNING"]);
        assert_eq!(
            recorded.error_info,
            Some(("GA018".to_owned(), "bad jar".to_owned()))
        );
        assert_eq!(recorded.end_status, Some(CompletionStatus::Error));
    }

    #[test]
    fn evaluate_uses_app_path_variable() {
        let ctx = TestContext::new("/apps/demo", "/run/demo/a1");
        assert_eq!(
            ctx.evaluate("${wf:appPath()}/conf.json").unwrap(),
            "/apps/demo/conf.json"
        );
    }
}
