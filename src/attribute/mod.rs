//! Attributes: memoized derived values on compiled nodes
//!
//! An [`Attribute`] is a pure function from a compiled node (run, experiment,
//! instance, experiment set, ...) to a derived result. Statistical
//! algorithms (ECDFs, clusterings, fitted models) are written as attributes
//! outside this crate; this module only provides the descriptor trait and
//! the per-node [`AttributeCache`] that memoizes their results.
//!
//! ## Storage policies
//!
//! | Policy | Behaviour |
//! |---|---|
//! | [`StoragePolicy::Never`] | recomputed on every request |
//! | [`StoragePolicy::Permanent`] | computed once, kept for the node's lifetime |
//! | [`StoragePolicy::Soft`] | kept until purged, then recomputed on demand |
//!
//! ## Example
//!
//! ```rust
//! use optbench::attribute::{Attributable, Attribute, StoragePolicy};
//! use optbench::graph::Run;
//!
//! /// Number of points in a run.
//! #[derive(Debug, Clone, PartialEq, Eq, Hash)]
//! struct PointCount;
//!
//! impl Attribute<Run> for PointCount {
//!     type Output = usize;
//!
//!     fn storage(&self) -> StoragePolicy {
//!         StoragePolicy::Permanent
//!     }
//!
//!     fn compute(&self, run: &Run) -> Option<usize> {
//!         Some(run.len())
//!     }
//! }
//! # fn demo(run: &Run) -> optbench::Result<()> {
//! let count = run.get(&PointCount)?;
//! assert_eq!(*count, run.len());
//! # Ok(())
//! # }
//! ```

mod cache;

pub use cache::{AttributeCache, AttributeKey};

use crate::Result;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// How long a computed attribute value is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoragePolicy {
    /// Never cached
    Never,
    /// Cached for the lifetime of the node
    #[default]
    Permanent,
    /// Cached until the cache purges soft entries
    Soft,
}

impl StoragePolicy {
    /// Whether results under this policy enter the cache at all.
    #[must_use]
    pub const fn is_storable(self) -> bool {
        !matches!(self, Self::Never)
    }
}

/// Descriptor of a derived value computable from a node of type `N`.
///
/// The descriptor itself is the cache key: two descriptors that compare
/// equal share one cached result, so parameterized attributes must include
/// their parameters in `Eq`/`Hash`.
pub trait Attribute<N: ?Sized>: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Result type
    type Output: Send + Sync + 'static;

    /// Storage policy of this attribute.
    fn storage(&self) -> StoragePolicy {
        StoragePolicy::Permanent
    }

    /// Compute the value. `None` is reported as an error to the requester.
    ///
    /// Runs while the node's cache cell for this descriptor is locked.
    /// Requesting the same descriptor on the same node from inside `compute`
    /// deadlocks; other descriptors and other nodes are fine.
    fn compute(&self, node: &N) -> Option<Self::Output>;
}

/// A compiled node that carries an attribute cache.
pub trait Attributable {
    /// The node's cache.
    fn attribute_cache(&self) -> &AttributeCache;

    /// Get the value of `attribute` for this node, computing it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyAttribute`](crate::Error::EmptyAttribute) if the
    /// computation produced no result.
    fn get<A: Attribute<Self>>(&self, attribute: &A) -> Result<Arc<A::Output>>
    where
        Self: Sized,
    {
        self.attribute_cache().get_or_compute(self, attribute)
    }
}

macro_rules! impl_attributable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::attribute::Attributable for $ty {
                fn attribute_cache(&self) -> &$crate::attribute::AttributeCache {
                    &self.cache
                }
            }
        )+
    };
}

pub(crate) use impl_attributable;
