#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Gantry Credential
//!
//! Resolves the credential names an action declares into authentication
//! tokens via pluggable providers, and merges the evaluated declaration
//! properties back into the action configuration so the submitted job
//! sees them as ordinary entries.

pub mod error;
pub mod injector;
pub mod provider;
pub mod token;

pub use error::CredentialError;
pub use injector::CredentialInjector;
pub use provider::{CredentialProvider, ProviderRegistry};
pub use token::TokenSet;
