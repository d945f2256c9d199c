#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Gantry Executor
//!
//! The per-action lifecycle surface the outer orchestrator drives:
//! `start` assembles and submits a launcher, repeated `check` advances
//! the attempt until a terminal outcome, `kill` best-effort terminates
//! the submission and its children, and `end` records the final
//! disposition and cleans up. Every failure leaving this crate is
//! classified, so the orchestrator never sees a raw error.

pub mod executor;
pub mod kind;
pub mod status;

pub use executor::ActionExecutor;
pub use kind::{ActionKind, KindRegistry, ShellKind};
pub use status::ActionStatus;
