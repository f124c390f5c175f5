//! Builder configuration
//!
//! Loaded from JSON by the outer layer (loaders, CLI) or assembled with the
//! builder-style setters. Every field has a default, so `{}` is a valid
//! configuration document.

use crate::Result;
use serde::{Deserialize, Serialize};

/// Default number of soft attribute entries a node keeps before purging them
pub const DEFAULT_SOFT_CACHE_LIMIT: usize = 256;

/// Configuration consumed by [`ExperimentSetContext`](crate::builder::ExperimentSetContext)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct BuilderConfig {
    /// Fill omitted features with the generalized sentinel instead of unspecified
    pub generalize_missing_features: bool,
    /// Fill omitted parameters with the generalized sentinel instead of unspecified
    pub generalize_missing_parameters: bool,
    /// Drop interior points whose quality equals their predecessor's
    pub prune_redundant_points: bool,
    /// Construction pool size (0 = one per logical CPU)
    pub worker_threads: usize,
    /// Soft attribute entries per node before the cache purges them
    pub soft_cache_limit: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            generalize_missing_features: false,
            generalize_missing_parameters: false,
            prune_redundant_points: false,
            worker_threads: 0,
            soft_cache_limit: DEFAULT_SOFT_CACHE_LIMIT,
        }
    }
}

impl BuilderConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the document is not
    /// valid JSON or carries fields of the wrong type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use optbench::config::BuilderConfig;
    ///
    /// let config = BuilderConfig::from_json(r#"{"worker_threads": 4}"#)?;
    /// assert_eq!(config.worker_threads, 4);
    /// assert!(!config.prune_redundant_points);
    /// # Ok::<(), optbench::Error>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Fill omitted features with the generalized sentinel.
    #[must_use]
    pub const fn generalize_missing_features(mut self, enabled: bool) -> Self {
        self.generalize_missing_features = enabled;
        self
    }

    /// Fill omitted parameters with the generalized sentinel.
    #[must_use]
    pub const fn generalize_missing_parameters(mut self, enabled: bool) -> Self {
        self.generalize_missing_parameters = enabled;
        self
    }

    /// Enable redundant point pruning on run close.
    #[must_use]
    pub const fn prune_redundant_points(mut self, enabled: bool) -> Self {
        self.prune_redundant_points = enabled;
        self
    }

    /// Set the construction pool size.
    #[must_use]
    pub const fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Set the per-node soft attribute limit.
    #[must_use]
    pub const fn soft_cache_limit(mut self, limit: usize) -> Self {
        self.soft_cache_limit = limit;
        self
    }
}
