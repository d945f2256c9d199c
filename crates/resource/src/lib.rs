#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Gantry Resource
//!
//! Resolves the set of remote files a launcher needs localized into its
//! execution environment: workflow libraries, explicit per-action file
//! and archive declarations, and named share libraries.
//!
//! Entries are identified by display name (the URI fragment when one is
//! given, otherwise the base name); two entries with the same display
//! name are duplicates regardless of their source paths, and a
//! share-library entry replaces a generically localized one.

pub mod builder;
pub mod entry;
pub mod error;

pub use builder::{KindHints, ManifestBuilder};
pub use entry::{Manifest, ResourceEntry, ResourceKind};
pub use error::ResourceError;
