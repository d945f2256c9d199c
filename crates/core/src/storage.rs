//! Remote storage contract.

use async_trait::async_trait;

/// Errors surfaced by a storage backend.
///
/// The variants deliberately mirror the failure causes the error
/// classifier distinguishes: unreachable backends are transient,
/// permission and quota problems are not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The path does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The invoking user may not access the path.
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// The backend quota for the invoking user is exhausted.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    /// The backend cannot be reached.
    #[error("storage unreachable: {0}")]
    Unreachable(String),
    /// Any other I/O failure.
    #[error("storage i/o error: {0}")]
    Io(String),
}

impl StorageError {
    /// Stable cause label for failure classification.
    #[must_use]
    pub fn cause(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::AccessDenied(_) => "access-denied",
            Self::QuotaExceeded(_) => "quota-exceeded",
            Self::Unreachable(_) => "host-unreachable",
            Self::Io(_) => "io",
        }
    }
}

/// Path-based access to remote storage, authenticated per invoking user.
///
/// Implementations are provided by the orchestrator; the engine only
/// reads configuration documents and libraries, and maintains the
/// recovery record and status artifact in the execution directory.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns `true` if the path exists.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Returns `true` if the path exists and is a regular file.
    async fn is_file(&self, path: &str) -> Result<bool, StorageError>;

    /// Read the full contents of a file.
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Write a file, replacing any existing contents.
    async fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a file or directory tree. Deleting a missing path is not
    /// an error.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Atomically rename a file or directory tree. Used to publish a
    /// fully prepared directory in one step.
    async fn rename(&self, from: &str, to: &str) -> Result<(), StorageError>;

    /// List the entries directly under a directory, as full paths.
    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError>;
}

/// Join a directory and a relative path with exactly one separator.
#[must_use]
pub fn join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
}
