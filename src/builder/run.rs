//! Run context

use super::context::{abandon, guarded, ContextKind, ContextState, Lifecycle, Tracked};
use super::experiment_set::SetShared;
use super::instance_runs::InstanceRunsState;
use super::record_key;
use crate::data::{DataFactory, Number};
use crate::graph::Run;
use crate::property::{RawValue, ValueKey};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug)]
struct RunState {
    lifecycle: Lifecycle,
    points: Vec<Vec<Number>>,
    parameters: Vec<ValueKey>,
}

impl Tracked for RunState {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

/// Collects the data points of one run.
///
/// Every point is validated on append: value count, parser bounds, the
/// instance's bound overrides and the direction of every dimension relative
/// to the previous point.
#[derive(Debug)]
pub struct RunContext {
    root: Arc<SetShared>,
    parent: Arc<Mutex<InstanceRunsState>>,
    factory: DataFactory,
    lower: Vec<Option<Number>>,
    upper: Vec<Option<Number>>,
    state: Mutex<RunState>,
}

impl RunContext {
    pub(crate) fn open(
        root: Arc<SetShared>,
        parent: Arc<Mutex<InstanceRunsState>>,
        factory: DataFactory,
        lower: Vec<Option<Number>>,
        upper: Vec<Option<Number>>,
    ) -> Self {
        Self {
            root,
            parent,
            factory,
            lower,
            upper,
            state: Mutex::new(RunState {
                lifecycle: Lifecycle::new(ContextKind::Run),
                points: Vec::new(),
                parameters: Vec::new(),
            }),
        }
    }

    fn with_state<T>(&self, op: &str, f: impl FnOnce(&mut RunState) -> Result<T>) -> Result<T> {
        guarded(&self.state, Some(&*self.parent), op, f)
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ContextState {
        self.state.lock().lifecycle.state()
    }

    /// Number of points appended so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().points.len()
    }

    /// Check if no point was appended yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().points.is_empty()
    }

    /// Declare a parameter without giving it a value.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error for an empty name or a
    /// conflicting description.
    pub fn declare_parameter(&self, name: &str, description: Option<&str>) -> Result<()> {
        self.with_state("declare parameter", |_| {
            self.root.parameters.lock().declare(name, description)?;
            Ok(())
        })
    }

    /// Set a parameter value for this run; it is merged into the owning
    /// experiment's parameter values when the instance-run set closes.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error for empty names or
    /// values, or a second, different value for the same parameter.
    pub fn set_parameter_value(&self, name: &str, value: impl Into<RawValue>) -> Result<()> {
        let value = value.into();
        self.with_state("set parameter value", |s| {
            let mut registry = self.root.parameters.lock();
            let key = registry.intern(name, None, value, None)?;
            record_key(&mut s.parameters, key, &registry)
        })
    }

    /// Append a point written as text, e.g. `"10 20"`.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error for malformed or
    /// out-of-bounds values; [`Error::Monotonicity`] if the point may not
    /// follow the previous one.
    pub fn add_data_point(&self, text: &str) -> Result<()> {
        self.with_state("add data point", |s| {
            let point = self.factory.parse_point(text)?;
            self.append(s, point)
        })
    }

    /// Append a point given as numbers in column order.
    ///
    /// # Errors
    ///
    /// As [`add_data_point`](Self::add_data_point).
    pub fn add_data_point_numbers(&self, values: &[Number]) -> Result<()> {
        self.with_state("add data point", |s| {
            let point = self.factory.check_point(values)?;
            self.append(s, point)
        })
    }

    /// Append a point given as a JSON array or an object keyed by
    /// dimension name.
    ///
    /// # Errors
    ///
    /// As [`add_data_point`](Self::add_data_point), plus a lookup error for
    /// unknown dimension keys.
    pub fn add_data_point_json(&self, value: &serde_json::Value) -> Result<()> {
        self.with_state("add data point", |s| {
            let point = self.factory.point_from_json(value)?;
            self.append(s, point)
        })
    }

    fn append(&self, s: &mut RunState, point: Vec<Number>) -> Result<()> {
        self.factory.check_bounds(&point, &self.lower, &self.upper)?;
        let index = s.points.len();
        if let Some(previous) = s.points.last() {
            self.factory.check_successor(previous, &point, index)?;
        }
        trace!(index, "data point appended");
        s.points.push(point);
        Ok(())
    }

    /// Compile the points into a run and hand it to the instance-run set.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error if no point was
    /// appended or the run's parameter values conflict with its siblings'.
    pub fn close(&self) -> Result<()> {
        let root = &self.root;
        self.with_state("close", |s| {
            s.lifecycle.check_closable()?;
            if s.points.is_empty() {
                return Err(Error::validation("run has no data points"));
            }
            let appended = s.points.len();
            let mut points = std::mem::take(&mut s.points);
            if root.config.prune_redundant_points {
                points = self.factory.prune_redundant(points);
            }
            let columns = self.factory.build_columns(&points)?;
            let run = Run::new(
                Arc::clone(self.factory.dimensions()),
                columns,
                root.config.soft_cache_limit,
            );

            let mut parent = self.parent.lock();
            {
                let registry = root.parameters.lock();
                for &key in &s.parameters {
                    record_key(&mut parent.parameters, key, &registry)?;
                }
            }
            debug!(appended, kept = run.len(), "run closed");
            parent.runs.push(run);
            parent.lifecycle_mut().child_finished(None);
            drop(parent);
            s.lifecycle.mark_closed();
            Ok(())
        })
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        abandon(&self.state, Some(&*self.parent));
    }
}
