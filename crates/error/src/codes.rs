//! Stable error codes.

/// Host lookup failed; transient.
pub const UNKNOWN_HOST: &str = "GA001";
/// Access denied by the cluster or storage; not retried.
pub const ACCESS_DENIED: &str = "GA002";
/// Storage disk exhausted; not retried.
pub const DISK_EXHAUSTED: &str = "GA003";
/// Storage quota exceeded; not retried.
pub const QUOTA_EXCEEDED: &str = "GA004";
/// Storage backend in read-only maintenance; not retried.
pub const STORAGE_READONLY: &str = "GA005";
/// Connection refused; transient.
pub const CONNECTION_REFUSED: &str = "GA006";
/// Malformed configuration or definition document.
pub const MALFORMED_DOCUMENT: &str = "GA007";
/// Referenced path does not exist.
pub const NOT_FOUND: &str = "GA008";
/// Generic storage or network I/O failure; transient.
pub const IO: &str = "GA009";
/// Disallowed key found in an injected configuration layer.
pub const DISALLOWED_PROPERTY: &str = "GA010";
/// Evaluation of a templated value failed; retried because variable
/// resolution may depend on transient orchestrator state.
pub const EVAL_ERROR: &str = "GA011";
/// Captured action output exceeds the configured limit.
pub const OUTPUT_TOO_LARGE: &str = "GA012";
/// Launcher-reported stats blob exceeds the configured limit.
pub const STATS_TOO_LARGE: &str = "GA013";
/// Recorded handle unknown to the cluster and no status artifact.
pub const UNRECOVERABLE_HANDLE: &str = "GA017";
/// Launcher reported failure without a meaningful error code.
pub const UNKNOWN_LAUNCHER_FAILURE: &str = "GA018";
/// Launcher process crashed before writing an error code.
pub const LAUNCHER_CRASH: &str = "GA019";
/// Declared credential provider type has no registered implementation.
pub const MISSING_PROVIDER: &str = "GA020";
/// Declared credential name has no matching declaration in the job.
pub const MISSING_CREDENTIAL: &str = "GA021";
/// System share library is deployed but empty or missing.
pub const MISSING_SYSTEM_SHARELIB: &str = "GA022";
