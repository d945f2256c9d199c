#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Gantry Launcher
//!
//! The launcher submission protocol and status reconciliation: building
//! the launcher's container specification, submitting it to the cluster
//! resource manager exactly once per logical attempt (surviving a crash
//! between submission and confirmation via a recovery record in the
//! execution directory), and reconciling completion from the cluster's
//! application report and the launcher's self-written status artifact.

pub mod artifact;
pub mod client;
pub mod reconcile;
pub mod spec;
pub mod submit;

#[cfg(test)]
pub(crate) mod testsupport;

pub use artifact::{ArtifactError, ErrorProperties, StatusArtifact, RECOVERY_FILE, STATUS_ARTIFACT};
pub use client::{AppState, ApplicationReport, ClusterClient, ClusterError, FinalStatus};
pub use reconcile::{CheckOutcome, ReconcileError, Reconciler};
pub use spec::SubmissionSpec;
pub use submit::{SubmitError, SubmitProtocol, Submitted};
