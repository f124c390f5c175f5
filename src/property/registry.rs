//! Mutable property registry used while an experiment set is being built
//!
//! Loaders declare properties and intern values in arbitrary order (and, for
//! parameters, from many threads under the owner's lock). Ids handed out
//! here are provisional: [`PropertyRegistry::compile`] sorts properties by
//! name and values by raw value, and the returned [`Remap`] translates
//! provisional [`ValueKey`]s into the compiled objects.

use super::{Property, PropertyKind, PropertySet, PropertyValue, RawValue, Setting};
use crate::attribute::AttributeCache;
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Provisional handle of an interned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueKey {
    property: usize,
    value: usize,
}

impl ValueKey {
    /// Provisional property id
    #[must_use]
    pub const fn property(&self) -> usize {
        self.property
    }
}

#[derive(Debug)]
struct ValueDraft {
    value: RawValue,
    description: Option<String>,
}

#[derive(Debug)]
struct PropertyDraft {
    name: String,
    description: Option<String>,
    values: Vec<ValueDraft>,
    lookup: FxHashMap<RawValue, usize>,
}

/// Registry of declared properties and their interned values.
#[derive(Debug)]
pub struct PropertyRegistry {
    kind: PropertyKind,
    drafts: Vec<PropertyDraft>,
    by_name: FxHashMap<String, usize>,
}

fn merge_description(
    slot: &mut Option<String>,
    incoming: Option<&str>,
    what: impl FnOnce() -> String,
) -> Result<()> {
    let Some(incoming) = incoming.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(());
    };
    match slot {
        Some(existing) if existing != incoming => Err(Error::validation(format!(
            "conflicting descriptions for {}: '{existing}' and '{incoming}'",
            what()
        ))),
        Some(_) => Ok(()),
        None => {
            *slot = Some(incoming.to_string());
            Ok(())
        }
    }
}

impl PropertyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            kind,
            drafts: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }

    /// Feature or parameter registry
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Number of declared properties
    #[must_use]
    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    /// Check if nothing was declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Declare a property, or merge the description into an existing one.
    ///
    /// Returns the provisional property id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name or a description that
    /// conflicts with the one given earlier.
    pub fn declare(&mut self, name: &str, description: Option<&str>) -> Result<usize> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation(format!(
                "{} name must not be empty",
                self.kind.as_str()
            )));
        }
        let kind = self.kind;
        if let Some(&id) = self.by_name.get(name) {
            merge_description(&mut self.drafts[id].description, description, || {
                format!("{} '{name}'", kind.as_str())
            })?;
            return Ok(id);
        }

        let id = self.drafts.len();
        let mut draft = PropertyDraft {
            name: name.to_string(),
            description: None,
            values: Vec::new(),
            lookup: FxHashMap::default(),
        };
        merge_description(&mut draft.description, description, String::new)?;
        self.drafts.push(draft);
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Intern `value` for the property `name`, declaring the property if needed.
    ///
    /// Interning the same (property, value) twice returns the same key.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty names/values, `NaN`, or
    /// conflicting descriptions.
    pub fn intern(
        &mut self,
        name: &str,
        description: Option<&str>,
        value: RawValue,
        value_description: Option<&str>,
    ) -> Result<ValueKey> {
        let property = self.declare(name, description)?;
        let value = value.normalize()?;
        let draft = &mut self.drafts[property];

        if let Some(&index) = draft.lookup.get(&value) {
            let property_name = draft.name.clone();
            merge_description(
                &mut draft.values[index].description,
                value_description,
                || format!("value '{value}' of '{property_name}'"),
            )?;
            return Ok(ValueKey {
                property,
                value: index,
            });
        }

        let index = draft.values.len();
        let mut entry = ValueDraft {
            value: value.clone(),
            description: None,
        };
        merge_description(&mut entry.description, value_description, String::new)?;
        draft.values.push(entry);
        draft.lookup.insert(value, index);
        Ok(ValueKey {
            property,
            value: index,
        })
    }

    /// Name of the property a key belongs to.
    #[must_use]
    pub fn property_name(&self, key: ValueKey) -> &str {
        &self.drafts[key.property].name
    }

    /// Raw value behind a key.
    #[must_use]
    pub fn raw_value(&self, key: ValueKey) -> &RawValue {
        &self.drafts[key.property].values[key.value].value
    }

    /// Freeze the registry into a sorted [`PropertySet`].
    #[must_use]
    pub fn compile(self, soft_cache_limit: usize) -> (Arc<PropertySet>, Remap) {
        let kind = self.kind;
        let mut order: Vec<usize> = (0..self.drafts.len()).collect();
        order.sort_by(|&a, &b| self.drafts[a].name.cmp(&self.drafts[b].name));

        let mut property_ids = vec![0usize; self.drafts.len()];
        for (final_id, &provisional) in order.iter().enumerate() {
            property_ids[provisional] = final_id;
        }

        let mut value_ids: Vec<Vec<usize>> = self
            .drafts
            .iter()
            .map(|d| vec![0usize; d.values.len()])
            .collect();
        let mut drafts: Vec<Option<PropertyDraft>> = self.drafts.into_iter().map(Some).collect();
        let mut properties = Vec::with_capacity(drafts.len());

        for (final_id, &provisional) in order.iter().enumerate() {
            let Some(draft) = drafts[provisional].take() else {
                continue;
            };
            let mut value_order: Vec<usize> = (0..draft.values.len()).collect();
            value_order.sort_by(|&a, &b| draft.values[a].value.cmp(&draft.values[b].value));

            let mut slots: Vec<Option<ValueDraft>> = draft.values.into_iter().map(Some).collect();
            let mut values = Vec::with_capacity(slots.len());
            let mut lookup = FxHashMap::default();
            for (value_id, &old) in value_order.iter().enumerate() {
                let Some(entry) = slots[old].take() else {
                    continue;
                };
                value_ids[provisional][old] = value_id;
                lookup.insert(entry.value.clone(), value_id);
                values.push(PropertyValue {
                    property: final_id,
                    id: value_id,
                    description: entry.description,
                    value: entry.value,
                });
            }

            properties.push(Property {
                kind,
                id: final_id,
                name: draft.name,
                description: draft.description,
                values,
                lookup,
                cache: AttributeCache::new(soft_cache_limit),
            });
        }

        let set = Arc::new(PropertySet {
            kind,
            properties,
            cache: AttributeCache::new(soft_cache_limit),
        });
        (
            set,
            Remap {
                property_ids,
                value_ids,
            },
        )
    }
}

/// Translation from provisional keys to compiled property values.
#[derive(Debug, Clone)]
pub struct Remap {
    property_ids: Vec<usize>,
    value_ids: Vec<Vec<usize>>,
}

impl Remap {
    /// Compiled value for a provisional key.
    #[must_use]
    pub fn resolve<'s>(&self, set: &'s PropertySet, key: ValueKey) -> &'s PropertyValue {
        let property = self.property_ids[key.property];
        &set.properties[property].values[self.value_ids[key.property][key.value]]
    }

    /// Build the setting for a node from its provisional keys.
    ///
    /// A node that supplied no value at all gets the all-generalized setting
    /// when `fill_general` is set, otherwise the all-unspecified one.
    ///
    /// # Errors
    ///
    /// Propagates [`Setting::create`] errors.
    pub fn setting(
        &self,
        set: &Arc<PropertySet>,
        keys: &[ValueKey],
        fill_general: bool,
    ) -> Result<Setting> {
        if keys.is_empty() {
            return Ok(if fill_general {
                Setting::generalized(set)
            } else {
                Setting::unspecified(set)
            });
        }
        Setting::create(set, keys.iter().map(|&k| self.resolve(set, k)), fill_general)
    }
}
