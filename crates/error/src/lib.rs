#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Gantry Error Handling
//!
//! The four-kind failure taxonomy of the Gantry engine and the
//! classifier that maps failure causes into it.
//!
//! Every public engine operation funnels unexpected failures through
//! [`Classifier::classify`] before returning, so the outer orchestrator
//! only ever sees a [`ClassifiedError`] whose [`ErrorKind`] tells it
//! whether to retry the attempt, fail the action, or surface a fatal
//! error. Classification is data, not control flow: components return
//! `Result<T, ClassifiedError>` and nothing downstream re-inspects
//! panics or exception chains.

pub mod classifier;
pub mod codes;
pub mod kind;

pub use classifier::Classifier;
pub use kind::{ClassifiedError, ErrorKind};

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, ClassifiedError>;
