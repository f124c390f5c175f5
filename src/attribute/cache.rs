//! Per-node attribute cache using `DashMap`.
//!
//! Each (node, attribute) pair owns one cell. The map is only locked long
//! enough to find or insert the cell; the computation runs under the cell's
//! own mutex, so it never blocks other attributes of the node or other
//! nodes, while concurrent requesters of the same attribute wait for the
//! single computation and all observe the same `Arc`.

use super::{Attribute, StoragePolicy};
use crate::config::DEFAULT_SOFT_CACHE_LIMIT;
use crate::{Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

type StoredValue = Arc<dyn Any + Send + Sync>;

trait KeyIdentity: Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn eq_key(&self, other: &dyn KeyIdentity) -> bool;
    fn hash_key(&self, state: &mut dyn Hasher);
}

impl<T: Any + Eq + Hash + Send + Sync + fmt::Debug> KeyIdentity for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_key(&self, other: &dyn KeyIdentity) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|o| o == self)
    }

    fn hash_key(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

/// Type-erased attribute descriptor used as cache key.
#[derive(Debug)]
pub struct AttributeKey(Box<dyn KeyIdentity>);

impl AttributeKey {
    /// Key for the given descriptor.
    #[must_use]
    pub fn of<A: Any + Clone + Eq + Hash + Send + Sync + fmt::Debug>(attribute: &A) -> Self {
        Self(Box::new(attribute.clone()))
    }
}

impl PartialEq for AttributeKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_key(&*other.0)
    }
}

impl Eq for AttributeKey {}

impl Hash for AttributeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash_key(state);
    }
}

struct CacheCell {
    policy: StoragePolicy,
    value: Mutex<Option<StoredValue>>,
}

/// Memoization cache attached to every compiled node.
pub struct AttributeCache {
    cells: DashMap<AttributeKey, Arc<CacheCell>, FxBuildHasher>,
    soft_limit: usize,
    soft_entries: AtomicUsize,
    generation: AtomicU64,
}

impl AttributeCache {
    /// Create an empty cache that purges soft entries beyond `soft_limit`.
    #[must_use]
    pub fn new(soft_limit: usize) -> Self {
        Self {
            cells: DashMap::with_hasher(FxBuildHasher),
            soft_limit,
            soft_entries: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Number of cached cells (including cells still being computed).
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of soft purges performed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Whether a value for `attribute` is currently published.
    #[must_use]
    pub fn contains<A: Any + Clone + Eq + Hash + Send + Sync + fmt::Debug>(&self, attribute: &A) -> bool {
        let key = AttributeKey::of(attribute);
        let cell = self.cells.get(&key).map(|c| Arc::clone(c.value()));
        cell.is_some_and(|c| c.value.lock().is_some())
    }

    /// Drop every soft entry; they are recomputed on their next request.
    ///
    /// Returns the number of entries removed.
    pub fn purge_soft(&self) -> usize {
        let before = self.cells.len();
        self.cells
            .retain(|_, cell| cell.policy != StoragePolicy::Soft);
        let removed = before.saturating_sub(self.cells.len());
        self.soft_entries.store(0, Ordering::Release);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(removed, generation, "purged soft attribute entries");
        removed
    }

    /// Return the value of `attribute` for `node`, computing and publishing
    /// it when the policy allows storage and no value is published yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyAttribute`] if the computation yields `None`.
    pub fn get_or_compute<N, A: Attribute<N>>(&self, node: &N, attribute: &A) -> Result<Arc<A::Output>> {
        let policy = attribute.storage();
        if !policy.is_storable() {
            return compute(node, attribute).map(Arc::new);
        }

        let key = AttributeKey::of(attribute);
        let existing = self.cells.get(&key).map(|c| Arc::clone(c.value()));
        let cell = match existing {
            Some(cell) => cell,
            None => {
                if policy == StoragePolicy::Soft
                    && self.soft_entries.load(Ordering::Acquire) >= self.soft_limit
                {
                    self.purge_soft();
                }
                // Another requester may have inserted the cell since the lookup
                let entry = self.cells.entry(key).or_insert_with(|| {
                    if policy == StoragePolicy::Soft {
                        self.soft_entries.fetch_add(1, Ordering::AcqRel);
                    }
                    Arc::new(CacheCell {
                        policy,
                        value: Mutex::new(None),
                    })
                });
                Arc::clone(entry.value())
            }
        };

        let mut slot = cell.value.lock();
        if let Some(stored) = slot.as_ref() {
            return downcast(Arc::clone(stored), attribute);
        }
        let computed = match compute(node, attribute) {
            Ok(value) => Arc::new(value),
            Err(e) => {
                drop(slot);
                self.discard(&AttributeKey::of(attribute), &cell);
                return Err(e);
            }
        };
        let stored: StoredValue = computed.clone();
        *slot = Some(stored);
        Ok(computed)
    }

    /// Remove a cell whose computation failed, unless another requester has
    /// filled, replaced or taken it over meanwhile.
    fn discard(&self, key: &AttributeKey, cell: &Arc<CacheCell>) {
        let removed = self
            .cells
            .remove_if(key, |_, current| {
                Arc::ptr_eq(current, cell)
                    && current.value.try_lock().is_some_and(|value| value.is_none())
            })
            .is_some();
        if removed && cell.policy == StoragePolicy::Soft {
            let _ = self
                .soft_entries
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)));
        }
    }
}

fn compute<N, A: Attribute<N>>(node: &N, attribute: &A) -> Result<A::Output> {
    attribute
        .compute(node)
        .ok_or_else(|| Error::EmptyAttribute(format!("{attribute:?}")))
}

fn downcast<N, A: Attribute<N>>(stored: StoredValue, attribute: &A) -> Result<Arc<A::Output>> {
    stored.downcast::<A::Output>().map_err(|_| {
        Error::Other(format!(
            "cached value for attribute {attribute:?} has an unexpected type"
        ))
    })
}

impl Default for AttributeCache {
    fn default() -> Self {
        Self::new(DEFAULT_SOFT_CACHE_LIMIT)
    }
}

impl fmt::Debug for AttributeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeCache")
            .field("entries", &self.cells.len())
            .field("generation", &self.generation())
            .finish()
    }
}
