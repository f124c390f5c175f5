//! Dimension context

use super::context::{abandon, guarded, ContextKind, ContextState, Lifecycle, Tracked};
use super::experiment_set::SetShared;
use super::{assign, assign_text};
use crate::data::{Dimension, DimensionDirection, DimensionType, Parser};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct DimensionState {
    lifecycle: Lifecycle,
    name: Option<String>,
    description: Option<String>,
    parser: Option<Parser>,
    dimension_type: Option<DimensionType>,
    direction: Option<DimensionDirection>,
}

impl Tracked for DimensionState {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

/// Declares one dimension. Name, parser, type and direction are required.
#[derive(Debug)]
pub struct DimensionContext {
    root: Arc<SetShared>,
    state: Mutex<DimensionState>,
}

impl DimensionContext {
    pub(crate) fn open(root: Arc<SetShared>) -> Self {
        Self {
            root,
            state: Mutex::new(DimensionState {
                lifecycle: Lifecycle::new(ContextKind::Dimension),
                name: None,
                description: None,
                parser: None,
                dimension_type: None,
                direction: None,
            }),
        }
    }

    fn with_state<T>(&self, op: &str, f: impl FnOnce(&mut DimensionState) -> Result<T>) -> Result<T> {
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
        self.with_state("set name", |s| assign_text(&mut s.name, name, "dimension name"))
    }

    /// Set the description.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error if empty or already
    /// set to something else.
    pub fn set_description(&self, description: &str) -> Result<()> {
        self.with_state("set description", |s| {
            assign_text(&mut s.description, description, "dimension description")
        })
    }

    /// Set the value parser, which also fixes the storage type.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error if a different parser
    /// was set before.
    pub fn set_parser(&self, parser: Parser) -> Result<()> {
        self.with_state("set parser", |s| assign(&mut s.parser, parser, "dimension parser"))
    }

    /// Set what the dimension measures.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error if a different type was
    /// set before.
    pub fn set_type(&self, dimension_type: DimensionType) -> Result<()> {
        self.with_state("set type", |s| {
            assign(&mut s.dimension_type, dimension_type, "dimension type")
        })
    }

    /// Set the monotonicity contract.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error if a different
    /// direction was set before.
    pub fn set_direction(&self, direction: DimensionDirection) -> Result<()> {
        self.with_state("set direction", |s| {
            assign(&mut s.direction, direction, "dimension direction")
        })
    }

    /// Compile the dimension and append it to the experiment set.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error if a required field is
    /// missing.
    pub fn close(&self) -> Result<()> {
        let root = &self.root;
        self.with_state("close", |s| {
            s.lifecycle.check_closable()?;
            let missing = |field: &str| {
                let name = s.name.as_deref().unwrap_or("<unnamed>");
                Error::validation(format!("dimension '{name}' has no {field}"))
            };
            let name = s.name.clone().ok_or_else(|| missing("name"))?;
            let parser = s.parser.ok_or_else(|| missing("parser"))?;
            let dimension_type = s.dimension_type.ok_or_else(|| missing("type"))?;
            let direction = s.direction.ok_or_else(|| missing("direction"))?;

            let mut parent = root.state.lock();
            let index = parent.dimension_drafts.len();
            let dimension = Dimension::new(
                index,
                name,
                s.description.take(),
                dimension_type,
                direction,
                parser,
                root.config.soft_cache_limit,
            );
            debug!(
                index,
                name = dimension.name(),
                storage = %dimension.storage(),
                "dimension closed"
            );
            parent.dimension_drafts.push(dimension);
            parent.lifecycle_mut().child_finished(None);
            drop(parent);
            s.lifecycle.mark_closed();
            Ok(())
        })
    }
}

impl Drop for DimensionContext {
    fn drop(&mut self) {
        abandon(&self.state, Some(&self.root.state));
    }
}
