//! Instance context

use super::context::{abandon, guarded, ContextKind, ContextState, Lifecycle, Tracked};
use super::experiment_set::{InstanceDraft, SetShared};
use super::{assign_text, record_key};
use crate::data::{DimensionSet, Number};
use crate::property::{RawValue, ValueKey};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct InstanceState {
    lifecycle: Lifecycle,
    name: Option<String>,
    description: Option<String>,
    features: Vec<ValueKey>,
    lower: Vec<Option<Number>>,
    upper: Vec<Option<Number>>,
}

impl Tracked for InstanceState {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

/// Declares one problem instance: its name, feature values and optional
/// per-dimension bounds that every run on it must respect.
#[derive(Debug)]
pub struct InstanceContext {
    root: Arc<SetShared>,
    dimensions: Arc<DimensionSet>,
    state: Mutex<InstanceState>,
}

impl InstanceContext {
    pub(crate) fn open(root: Arc<SetShared>, dimensions: Arc<DimensionSet>) -> Self {
        let columns = dimensions.len();
        Self {
            root,
            dimensions,
            state: Mutex::new(InstanceState {
                lifecycle: Lifecycle::new(ContextKind::Instance),
                name: None,
                description: None,
                features: Vec::new(),
                lower: vec![None; columns],
                upper: vec![None; columns],
            }),
        }
    }

    fn with_state<T>(&self, op: &str, f: impl FnOnce(&mut InstanceState) -> Result<T>) -> Result<T> {
        guarded(&self.state, Some(&self.root.state), op, f)
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ContextState {
        self.state.lock().lifecycle.state()
    }

    /// Set the name.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error if empty or already
    /// set to something else.
    pub fn set_name(&self, name: &str) -> Result<()> {
        self.with_state("set name", |s| assign_text(&mut s.name, name, "instance name"))
    }

    /// Set the description.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error if empty or already
    /// set to something else.
    pub fn set_description(&self, description: &str) -> Result<()> {
        self.with_state("set description", |s| {
            assign_text(&mut s.description, description, "instance description")
        })
    }

    /// Set a feature value, declaring the feature if needed.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error for empty names or
    /// values, or a second, different value for the same feature.
    pub fn set_feature_value(&self, name: &str, value: impl Into<RawValue>) -> Result<()> {
        self.set_feature_value_described(name, None, value, None)
    }

    /// Set a feature value with descriptions of the feature and the value.
    ///
    /// # Errors
    ///
    /// As [`set_feature_value`](Self::set_feature_value), plus conflicting
    /// descriptions.
    pub fn set_feature_value_described(
        &self,
        name: &str,
        description: Option<&str>,
        value: impl Into<RawValue>,
        value_description: Option<&str>,
    ) -> Result<()> {
        let value = value.into();
        self.with_state("set feature value", |s| {
            let mut registry = self.root.features.lock();
            let key = registry.intern(name, description, value, value_description)?;
            record_key(&mut s.features, key, &registry)
        })
    }

    /// Lower bound of `dimension` for runs on this instance.
    ///
    /// # Errors
    ///
    /// Lookup error for an unknown dimension; validation error if the
    /// dimension's parser rejects the value or a different bound was set.
    pub fn set_lower_bound(&self, dimension: &str, value: impl Into<Number>) -> Result<()> {
        let value = value.into();
        self.with_state("set lower bound", |s| {
            let (index, value) = self.checked_bound(dimension, value)?;
            set_bound(&mut s.lower[index], value, "lower", dimension)
        })
    }

    /// Upper bound of `dimension` for runs on this instance.
    ///
    /// # Errors
    ///
    /// Lookup error for an unknown dimension; validation error if the
    /// dimension's parser rejects the value or a different bound was set.
    pub fn set_upper_bound(&self, dimension: &str, value: impl Into<Number>) -> Result<()> {
        let value = value.into();
        self.with_state("set upper bound", |s| {
            let (index, value) = self.checked_bound(dimension, value)?;
            set_bound(&mut s.upper[index], value, "upper", dimension)
        })
    }

    fn checked_bound(&self, dimension: &str, value: Number) -> Result<(usize, Number)> {
        let dimension = self.dimensions.get(dimension)?;
        let value = dimension.parser().check(value).map_err(|e| {
            Error::validation(format!("bound for dimension '{}': {e}", dimension.name()))
        })?;
        Ok((dimension.index(), value))
    }

    /// Hand the instance to the experiment set.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error if the name is missing
    /// or a lower bound exceeds its upper bound.
    pub fn close(&self) -> Result<()> {
        let root = &self.root;
        self.with_state("close", |s| {
            s.lifecycle.check_closable()?;
            let name = s
                .name
                .clone()
                .ok_or_else(|| Error::validation("instance has no name"))?;
            for (dimension, (lower, upper)) in self.dimensions.iter().zip(s.lower.iter().zip(&s.upper)) {
                if let (Some(lower), Some(upper)) = (lower, upper) {
                    if lower > upper {
                        return Err(Error::validation(format!(
                            "instance '{name}': lower bound {lower} of dimension '{}' exceeds upper bound {upper}",
                            dimension.name()
                        )));
                    }
                }
            }

            debug!(name = %name, features = s.features.len(), "instance closed");
            let draft = InstanceDraft {
                name,
                description: s.description.take(),
                features: std::mem::take(&mut s.features),
                lower: std::mem::take(&mut s.lower),
                upper: std::mem::take(&mut s.upper),
            };
            let mut parent = root.state.lock();
            parent.instance_drafts.push(draft);
            parent.lifecycle_mut().child_finished(None);
            drop(parent);
            s.lifecycle.mark_closed();
            Ok(())
        })
    }
}

fn set_bound(slot: &mut Option<Number>, value: Number, which: &str, dimension: &str) -> Result<()> {
    match slot {
        Some(existing) if *existing != value => Err(Error::validation(format!(
            "{which} bound of dimension '{dimension}' already set to {existing}"
        ))),
        _ => {
            *slot = Some(value);
            Ok(())
        }
    }
}

impl Drop for InstanceContext {
    fn drop(&mut self) {
        abandon(&self.state, Some(&self.root.state));
    }
}
