//! Compiled properties and property sets

use super::{PropertyKind, PropertyValue, RawValue, Setting};
use crate::attribute::{impl_attributable, AttributeCache};
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A compiled feature or parameter with its interned values.
#[derive(Debug)]
pub struct Property {
    pub(crate) kind: PropertyKind,
    pub(crate) id: usize,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) values: Vec<PropertyValue>,
    pub(crate) lookup: FxHashMap<RawValue, usize>,
    pub(crate) cache: AttributeCache,
}

impl Property {
    /// Feature or parameter
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Dense id, the index of this property in its set
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Property name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional description
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// All interned values, sorted by raw value
    #[must_use]
    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }

    /// Value with the given id
    #[must_use]
    pub fn value_at(&self, id: usize) -> Option<&PropertyValue> {
        self.values.get(id)
    }

    /// Interned value equal to `raw`, after normalization.
    #[must_use]
    pub fn find_value(&self, raw: impl Into<RawValue>) -> Option<&PropertyValue> {
        let raw = raw.into().normalize().ok()?;
        self.lookup.get(&raw).map(|&id| &self.values[id])
    }

    /// Parse `text` and return the interned value it denotes.
    ///
    /// Parsing the same text twice yields the same object.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty text and a lookup error if the
    /// value was never interned for this property.
    pub fn parse(&self, text: &str) -> Result<&PropertyValue> {
        let raw = RawValue::parse(text)?;
        self.lookup
            .get(&raw)
            .map(|&id| &self.values[id])
            .ok_or_else(|| Error::lookup("property value", format!("{}={raw}", self.name)))
    }
}

/// Sorted, immutable set of properties of one kind.
///
/// Properties are sorted by name; their ids are their positions, so lookup by
/// name is a binary search.
#[derive(Debug)]
pub struct PropertySet {
    pub(crate) kind: PropertyKind,
    pub(crate) properties: Vec<Property>,
    pub(crate) cache: AttributeCache,
}

impl PropertySet {
    /// Empty set of the given kind.
    #[must_use]
    pub fn empty(kind: PropertyKind) -> Self {
        Self {
            kind,
            properties: Vec::new(),
            cache: AttributeCache::default(),
        }
    }

    /// Feature or parameter set
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Number of properties
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if no property was declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Properties in id order
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Property with the given id
    #[must_use]
    pub fn by_id(&self, id: usize) -> Option<&Property> {
        self.properties.get(id)
    }

    /// Binary search by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Property> {
        self.properties
            .binary_search_by(|p| p.name.as_str().cmp(name))
            .ok()
            .map(|id| &self.properties[id])
    }

    /// Property by name.
    ///
    /// # Errors
    ///
    /// Returns a lookup error naming the property kind if it was never declared.
    pub fn get(&self, name: &str) -> Result<&Property> {
        self.find(name)
            .ok_or_else(|| Error::lookup(self.kind.as_str(), name))
    }

    /// Build a setting over `set` from interned values.
    ///
    /// # Errors
    ///
    /// See [`Setting::create`].
    pub fn create_setting<'v>(
        set: &Arc<Self>,
        values: impl IntoIterator<Item = &'v PropertyValue>,
        fill_general: bool,
    ) -> Result<Setting> {
        Setting::create(set, values, fill_general)
    }

    /// Whether `value` is the interned object stored at its own ids.
    pub(crate) fn owns(&self, value: &PropertyValue) -> bool {
        self.properties
            .get(value.property)
            .and_then(|p| p.values.get(value.id))
            .is_some_and(|stored| std::ptr::eq(stored, value))
    }
}

impl_attributable!(Property, PropertySet);
