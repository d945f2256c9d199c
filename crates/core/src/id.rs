//! Typed identifiers for Gantry entities.
//!
//! Action and workflow identifiers are orchestrator-assigned opaque
//! strings; [`ApplicationId`] is the cluster resource manager's handle
//! for a submitted application and has the fixed form
//! `application_<cluster>_<sequence>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors from constructing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    /// The input was empty or contained only whitespace.
    #[error("identifier cannot be empty or whitespace")]
    Empty,
    /// The input does not match the `application_<cluster>_<sequence>` form.
    #[error("malformed application id: {0}")]
    MalformedApplicationId(String),
}

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier, trimming surrounding whitespace.
            pub fn new(raw: &str) -> Result<Self, IdParseError> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(IdParseError::Empty);
                }
                Ok(Self(trimmed.to_owned()))
            }

            /// Return the inner string slice.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(&value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id! {
    /// Identifier of one workflow action, assigned by the orchestrator.
    ActionId
}

opaque_id! {
    /// Identifier of the workflow that owns an action.
    WorkflowId
}

/// Cluster-assigned identifier for a submitted application.
///
/// The resource manager issues these in the form
/// `application_<cluster-timestamp>_<sequence>`; both numeric parts are
/// preserved so identifiers survive round trips through persisted action
/// state.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationId {
    cluster: u64,
    sequence: u32,
}

impl ApplicationId {
    /// Create an application id from its numeric parts.
    #[must_use]
    pub fn new(cluster: u64, sequence: u32) -> Self {
        Self { cluster, sequence }
    }

    /// Parse the cluster's `application_<cluster>_<sequence>` form.
    pub fn parse(raw: &str) -> Result<Self, IdParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdParseError::Empty);
        }
        let malformed = || IdParseError::MalformedApplicationId(trimmed.to_owned());
        let rest = trimmed.strip_prefix("application_").ok_or_else(malformed)?;
        let (cluster, sequence) = rest.split_once('_').ok_or_else(malformed)?;
        Ok(Self {
            cluster: cluster.parse().map_err(|_| malformed())?,
            sequence: sequence.parse().map_err(|_| malformed())?,
        })
    }

    /// The cluster-timestamp component.
    #[must_use]
    pub fn cluster(&self) -> u64 {
        self.cluster
    }

    /// The per-cluster sequence component.
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "application_{}_{:04}", self.cluster, self.sequence)
    }
}

impl FromStr for ApplicationId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ApplicationId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ApplicationId> for String {
    fn from(id: ApplicationId) -> Self {
        id.to_string()
    }
}
