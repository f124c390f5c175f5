//! Error types for optbench
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Every builder error is unrecoverable at the call site: the offending
//! context is left failed and the owning experiment set will refuse to
//! compile. [`Error::kind`] sorts the variants into the three families
//! callers dispatch on.

use crate::builder::ContextKind;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation invoked on a context in the wrong state
    Lifecycle,
    /// Bad input: empty/conflicting values, bounds, monotonicity, empty attribute
    Validation,
    /// Reference to a name that was never declared
    Lookup,
    /// Anything else (configuration, storage)
    Other,
}

/// optbench error types
#[derive(Error, Debug)]
pub enum Error {
    /// Context used outside its allowed state
    #[error("Lifecycle violation in {context} context: {message}")]
    Lifecycle {
        /// Context on which the operation was invoked
        context: ContextKind,
        /// What was attempted
        message: String,
    },

    /// Required input missing, malformed or conflicting
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Consecutive data points violate a dimension's direction
    #[error(
        "Monotonicity violated in dimension '{dimension}' at point {index}: {previous} -> {next} is not {direction}"
    )]
    Monotonicity {
        /// Dimension name
        dimension: String,
        /// Direction contract, human readable
        direction: String,
        /// Index of the rejected point within the run
        index: usize,
        /// Value of the previous point
        previous: String,
        /// Value of the rejected point
        next: String,
    },

    /// Attribute computation returned nothing
    #[error("Attribute {0} produced no result")]
    EmptyAttribute(String),

    /// Name never declared
    #[error("Lookup failed: no {kind} named '{name}'")]
    Lookup {
        /// What was looked up (dimension, instance, property, ...)
        kind: &'static str,
        /// Name that was not found
        name: String,
    },

    /// Builder configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Arrow error while assembling run columns
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Error family of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Lifecycle { .. } => ErrorKind::Lifecycle,
            Self::Validation(_) | Self::Monotonicity { .. } | Self::EmptyAttribute(_) => {
                ErrorKind::Validation
            }
            Self::Lookup { .. } => ErrorKind::Lookup,
            Self::Config(_) | Self::Arrow(_) | Self::Other(_) => ErrorKind::Other,
        }
    }

    pub(crate) fn lifecycle(context: ContextKind, message: impl Into<String>) -> Self {
        Self::Lifecycle {
            context,
            message: message.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn lookup(kind: &'static str, name: impl Into<String>) -> Self {
        Self::Lookup {
            kind,
            name: name.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::lifecycle(ContextKind::Run, "closed").kind(),
            ErrorKind::Lifecycle
        );
        assert_eq!(Error::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(
            Error::EmptyAttribute("A".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(Error::lookup("dimension", "t").kind(), ErrorKind::Lookup);
        assert_eq!(Error::Config("bad".to_string()).kind(), ErrorKind::Other);
    }

    #[test]
    fn test_lifecycle_message_names_context() {
        let err = Error::lifecycle(ContextKind::InstanceRuns, "context already closed");
        let text = err.to_string();
        assert!(text.contains("instance-runs"));
        assert!(text.contains("already closed"));
    }
}
