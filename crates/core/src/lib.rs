#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Gantry Core
//!
//! Core types and external-collaborator contracts for the Gantry
//! action-execution engine.
//!
//! This crate contains no engine logic. It defines:
//!
//! - [`ActionId`], [`WorkflowId`], [`ApplicationId`] — typed identifiers
//! - [`ExecConfig`] — the ordered key→value execution configuration
//! - [`ActionDefinition`] and [`JobDefinition`] — parsed definition documents
//! - [`Context`] — the orchestrator-owned per-action context contract
//! - [`Storage`] — path-based remote storage contract
//! - [`EngineSettings`] — immutable engine construction settings
//! - [`keys`] — well-known configuration key names
//!
//! The [`testkit`] module provides in-memory implementations of the
//! collaborator contracts for use in tests across the workspace.

pub mod config;
pub mod context;
pub mod definition;
pub mod id;
pub mod keys;
pub mod settings;
pub mod storage;
pub mod testkit;

pub use config::ExecConfig;
pub use context::{ActionInfo, CompletionStatus, Context, EvalError, WorkflowInfo};
pub use definition::{ActionDefinition, CredentialDecl, JobDefinition};
pub use id::{ActionId, ApplicationId, WorkflowId};
pub use settings::EngineSettings;
pub use storage::{Storage, StorageError};
