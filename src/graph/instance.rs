//! Problem instances

use crate::attribute::{impl_attributable, AttributeCache};
use crate::data::Number;
use crate::property::{PropertySet, Setting};
use crate::{Error, Result};
use std::sync::Arc;

/// A benchmark problem instance with its feature setting.
#[derive(Debug)]
pub struct Instance {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) features: Setting,
    pub(crate) lower: Vec<Option<Number>>,
    pub(crate) upper: Vec<Option<Number>>,
    pub(crate) cache: AttributeCache,
}

impl Instance {
    /// Index within the instance set (instances are sorted by name)
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Instance name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional description
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Feature setting, one slot per declared feature
    #[must_use]
    pub const fn features(&self) -> &Setting {
        &self.features
    }

    /// Lower bound override for the dimension at column `dimension`
    #[must_use]
    pub fn lower_bound(&self, dimension: usize) -> Option<Number> {
        self.lower.get(dimension).copied().flatten()
    }

    /// Upper bound override for the dimension at column `dimension`
    #[must_use]
    pub fn upper_bound(&self, dimension: usize) -> Option<Number> {
        self.upper.get(dimension).copied().flatten()
    }

    /// Lower bound overrides indexed by column
    #[must_use]
    pub fn lower_bounds(&self) -> &[Option<Number>] {
        &self.lower
    }

    /// Upper bound overrides indexed by column
    #[must_use]
    pub fn upper_bounds(&self) -> &[Option<Number>] {
        &self.upper
    }
}

/// All instances of an experiment set, sorted by name.
#[derive(Debug)]
pub struct InstanceSet {
    instances: Vec<Instance>,
    features: Arc<PropertySet>,
    pub(crate) cache: AttributeCache,
}

impl InstanceSet {
    /// Sort `instances` by name and assign their indices.
    pub(crate) fn compile(
        mut instances: Vec<Instance>,
        features: Arc<PropertySet>,
        soft_cache_limit: usize,
    ) -> Result<Self> {
        if instances.is_empty() {
            return Err(Error::validation(
                "an experiment set needs at least one instance",
            ));
        }
        instances.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = instances.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(Error::validation(format!(
                "instance '{}' declared twice",
                pair[0].name
            )));
        }
        for (index, instance) in instances.iter_mut().enumerate() {
            instance.index = index;
        }
        Ok(Self {
            instances,
            features,
            cache: AttributeCache::new(soft_cache_limit),
        })
    }

    /// Number of instances
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Always false for a compiled set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances sorted by name
    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Iterate in name order
    pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
        self.instances.iter()
    }

    /// Instance with the given index
    #[must_use]
    pub fn by_index(&self, index: usize) -> Option<&Instance> {
        self.instances.get(index)
    }

    /// Binary search by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Instance> {
        self.instances
            .binary_search_by(|i| i.name.as_str().cmp(name))
            .ok()
            .map(|index| &self.instances[index])
    }

    /// Instance by name.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if no instance has this name.
    pub fn get(&self, name: &str) -> Result<&Instance> {
        self.find(name).ok_or_else(|| Error::lookup("instance", name))
    }

    /// Feature set all instance settings refer to
    #[must_use]
    pub const fn features(&self) -> &Arc<PropertySet> {
        &self.features
    }
}

impl<'a> IntoIterator for &'a InstanceSet {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.iter()
    }
}

impl_attributable!(Instance, InstanceSet);
