//! Property settings: one value per declared property
//!
//! A [`Setting`] always has exactly one slot per property of its set. Slots
//! that were not supplied hold an explicit sentinel ([`SettingValue::Generalized`]
//! or [`SettingValue::Unspecified`]) instead of being absent, so settings of
//! runs that only mention one or two parameters remain comparable.

use super::{Property, PropertySet, PropertyValue};
use crate::{Error, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Concrete(usize),
    Generalized,
    Unspecified,
}

/// Value of one setting slot.
#[derive(Debug, Clone, Copy)]
pub enum SettingValue<'a> {
    /// Explicitly supplied interned value
    Concrete(&'a PropertyValue),
    /// Deliberately abstracted away
    Generalized,
    /// Never specified
    Unspecified,
}

impl<'a> SettingValue<'a> {
    /// Interned value, if concrete.
    #[must_use]
    pub const fn as_value(&self) -> Option<&'a PropertyValue> {
        match self {
            Self::Concrete(value) => Some(*value),
            _ => None,
        }
    }

    /// Whether the slot holds an explicit value
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        matches!(self, Self::Concrete(_))
    }

    /// Whether the slot holds the generalized sentinel
    #[must_use]
    pub const fn is_generalized(&self) -> bool {
        matches!(self, Self::Generalized)
    }

    /// Whether the slot holds the unspecified sentinel
    #[must_use]
    pub const fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }
}

impl PartialEq for SettingValue<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Concrete(a), Self::Concrete(b)) => std::ptr::eq(*a, *b),
            (Self::Generalized, Self::Generalized) | (Self::Unspecified, Self::Unspecified) => true,
            _ => false,
        }
    }
}

impl Eq for SettingValue<'_> {}

impl fmt::Display for SettingValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete(value) => fmt::Display::fmt(value, f),
            Self::Generalized => f.write_str("*"),
            Self::Unspecified => f.write_str("?"),
        }
    }
}

/// Fully filled vector of property values, index-aligned with a property set.
#[derive(Debug, Clone)]
pub struct Setting {
    set: Arc<PropertySet>,
    slots: Vec<Slot>,
    generalized: bool,
}

impl Setting {
    /// Build a setting from a partial collection of interned values.
    ///
    /// Omitted properties are filled with [`SettingValue::Generalized`] when
    /// `fill_general` is set, otherwise with [`SettingValue::Unspecified`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if a value does not belong to `set`, if
    /// two different values are supplied for one property, or if no value
    /// is supplied at all.
    pub fn create<'v>(
        set: &Arc<PropertySet>,
        values: impl IntoIterator<Item = &'v PropertyValue>,
        fill_general: bool,
    ) -> Result<Self> {
        let mut slots: Vec<Option<usize>> = vec![None; set.len()];
        let mut explicit = 0usize;

        for value in values {
            if !set.owns(value) {
                return Err(Error::validation(format!(
                    "value '{value}' (property id {}, value id {}) does not belong to this {} set",
                    value.property,
                    value.id,
                    set.kind().as_str()
                )));
            }
            match slots[value.property] {
                Some(existing) if existing != value.id => {
                    let property = &set.properties[value.property];
                    return Err(Error::validation(format!(
                        "conflicting values for {} '{}': '{}' and '{value}'",
                        set.kind().as_str(),
                        property.name,
                        property.values[existing]
                    )));
                }
                Some(_) => {}
                None => {
                    slots[value.property] = Some(value.id);
                    explicit += 1;
                }
            }
        }

        if explicit == 0 {
            return Err(Error::validation(format!(
                "a {} setting must carry at least one explicit value",
                set.kind().as_str()
            )));
        }

        let fill = if fill_general {
            Slot::Generalized
        } else {
            Slot::Unspecified
        };
        let generalized = fill_general && explicit < set.len();
        let slots = slots
            .into_iter()
            .map(|slot| slot.map_or(fill, Slot::Concrete))
            .collect();

        Ok(Self {
            set: Arc::clone(set),
            slots,
            generalized,
        })
    }

    /// Setting where every slot is unspecified.
    ///
    /// Given to nodes that declare no value for any property.
    #[must_use]
    pub fn unspecified(set: &Arc<PropertySet>) -> Self {
        Self {
            set: Arc::clone(set),
            slots: vec![Slot::Unspecified; set.len()],
            generalized: false,
        }
    }

    /// Setting where every slot is generalized.
    ///
    /// Given to nodes that declare no value when missing values are filled
    /// with the generalized sentinel.
    #[must_use]
    pub fn generalized(set: &Arc<PropertySet>) -> Self {
        Self {
            set: Arc::clone(set),
            slots: vec![Slot::Generalized; set.len()],
            generalized: !set.is_empty(),
        }
    }

    /// Owning property set
    #[must_use]
    pub const fn properties(&self) -> &Arc<PropertySet> {
        &self.set
    }

    /// Number of slots (equals the number of properties)
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the property set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether any slot was filled with the generalized sentinel
    #[must_use]
    pub const fn is_generalized(&self) -> bool {
        self.generalized
    }

    /// Number of explicitly supplied slots
    #[must_use]
    pub fn explicit_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Concrete(_)))
            .count()
    }

    /// Slot for the property with id `index`.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<SettingValue<'_>> {
        self.slots.get(index).map(|slot| self.resolve(index, *slot))
    }

    /// Slot for the named property.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the property was never declared.
    pub fn get(&self, name: &str) -> Result<SettingValue<'_>> {
        let property = self.set.get(name)?;
        Ok(self.resolve(property.id, self.slots[property.id]))
    }

    /// Iterate over (property, slot) pairs in property id order.
    pub fn iter(&self) -> impl Iterator<Item = (&Property, SettingValue<'_>)> {
        self.set
            .properties
            .iter()
            .zip(self.slots.iter())
            .map(|(property, slot)| (property, self.resolve(property.id, *slot)))
    }

    /// Whether this setting is at least as general as `other`: every slot is
    /// either the generalized sentinel or equal to `other`'s slot.
    #[must_use]
    pub fn subsumes(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.set, &other.set)
            && self
                .slots
                .iter()
                .zip(other.slots.iter())
                .all(|(mine, theirs)| *mine == Slot::Generalized || mine == theirs)
    }

    fn resolve(&self, property: usize, slot: Slot) -> SettingValue<'_> {
        match slot {
            Slot::Concrete(id) => SettingValue::Concrete(&self.set.properties[property].values[id]),
            Slot::Generalized => SettingValue::Generalized,
            Slot::Unspecified => SettingValue::Unspecified,
        }
    }
}

impl PartialEq for Setting {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.set, &other.set) && self.slots == other.slots
    }
}

impl Eq for Setting {}

impl Hash for Setting {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slots.hash(state);
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (property, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={value}", property.name())?;
        }
        f.write_str("}")
    }
}
