#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Gantry Config
//!
//! Assembles the layered execution configuration for an action and for
//! its launcher.
//!
//! Layers apply in fixed precedence: cluster connection defaults, then
//! per-type defaults, then each referenced external configuration
//! document (in declaration order, re-evaluated through a variable
//! substitution pass), then the inline block, then job-submission-time
//! overrides. Every layer is checked against the disallowed-key set
//! immediately after being read and before merge — job-supplied
//! documents may trigger further merges transitively, so checking only
//! the final result is not enough.

pub mod assemble;
pub mod error;

pub use assemble::Assembler;
pub use error::ConfigError;
