//! Experiment context

use super::context::{abandon, guarded, opening, ContextKind, ContextState, Lifecycle, Tracked};
use super::experiment_set::{ExperimentDraft, SetShared};
use super::{assign_text, record_key, InstanceRunsContext};
use crate::data::DataFactory;
use crate::graph::{InstanceRuns, InstanceSet};
use crate::property::{RawValue, ValueKey};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub(crate) struct ExperimentState {
    lifecycle: Lifecycle,
    name: Option<String>,
    description: Option<String>,
    pub(crate) parameters: Vec<ValueKey>,
    pub(crate) instance_runs: Vec<InstanceRuns>,
}

impl Tracked for ExperimentState {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

/// Declares one experiment: an algorithm setup with its parameter values
/// and the instance-run sets measured with it.
///
/// Instance-run sets may be built concurrently from several threads.
#[derive(Debug)]
pub struct ExperimentContext {
    root: Arc<SetShared>,
    factory: DataFactory,
    instances: Arc<InstanceSet>,
    state: Arc<Mutex<ExperimentState>>,
}

impl ExperimentContext {
    pub(crate) fn open(
        root: Arc<SetShared>,
        factory: DataFactory,
        instances: Arc<InstanceSet>,
    ) -> Self {
        Self {
            root,
            factory,
            instances,
            state: Arc::new(Mutex::new(ExperimentState {
                lifecycle: Lifecycle::new(ContextKind::Experiment),
                name: None,
                description: None,
                parameters: Vec::new(),
                instance_runs: Vec::new(),
            })),
        }
    }

    fn with_state<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut ExperimentState) -> Result<T>,
    ) -> Result<T> {
        guarded(&*self.state, Some(&self.root.state), op, f)
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
    /// Lifecycle error if not open or instance-run sets are open; validation
    /// error if empty or already set to something else.
    pub fn set_name(&self, name: &str) -> Result<()> {
        self.with_state("set name", |s| assign_text(&mut s.name, name, "experiment name"))
    }

    /// Set the description.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open or instance-run sets are open; validation
    /// error if empty or already set to something else.
    pub fn set_description(&self, description: &str) -> Result<()> {
        self.with_state("set description", |s| {
            assign_text(&mut s.description, description, "experiment description")
        })
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

    /// Set a parameter value, declaring the parameter if needed.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error for empty names or
    /// values, or a second, different value for the same parameter.
    pub fn set_parameter_value(&self, name: &str, value: impl Into<RawValue>) -> Result<()> {
        self.set_parameter_value_described(name, None, value, None)
    }

    /// Set a parameter value with descriptions of the parameter and the value.
    ///
    /// # Errors
    ///
    /// As [`set_parameter_value`](Self::set_parameter_value), plus
    /// conflicting descriptions.
    pub fn set_parameter_value_described(
        &self,
        name: &str,
        description: Option<&str>,
        value: impl Into<RawValue>,
        value_description: Option<&str>,
    ) -> Result<()> {
        let value = value.into();
        self.with_state("set parameter value", |s| {
            let mut registry = self.root.parameters.lock();
            let key = registry.intern(name, description, value, value_description)?;
            record_key(&mut s.parameters, key, &registry)
        })
    }

    /// Open an instance-run set. Several may be open at once.
    ///
    /// # Errors
    ///
    /// Lifecycle error if the experiment is not open.
    pub fn create_instance_runs(&self) -> Result<InstanceRunsContext> {
        opening(
            &*self.state,
            Some(&self.root.state),
            ContextKind::InstanceRuns,
            |_| Ok(()),
        )?;
        Ok(InstanceRunsContext::open(
            Arc::clone(&self.root),
            Arc::clone(&self.state),
            self.factory.clone(),
            Arc::clone(&self.instances),
        ))
    }

    /// Hand the experiment to the experiment set.
    ///
    /// Instance-run sets over the same instance are merged, keeping their
    /// runs in close order.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open or instance-run sets are open; validation
    /// error if the name is missing, no instance-run set was closed, or an
    /// instance-run set failed.
    pub fn close(&self) -> Result<()> {
        let root = &self.root;
        self.with_state("close", |s| {
            s.lifecycle.check_closable()?;
            let name = s
                .name
                .clone()
                .ok_or_else(|| Error::validation("experiment has no name"))?;
            if s.instance_runs.is_empty() {
                return Err(Error::validation(format!(
                    "experiment '{name}' has no instance-run sets"
                )));
            }

            let limit = root.config.soft_cache_limit;
            let mut collected = std::mem::take(&mut s.instance_runs);
            collected.sort_by_key(|irs| irs.instance);
            let mut merged: Vec<InstanceRuns> = Vec::with_capacity(collected.len());
            for irs in collected {
                match merged.last_mut() {
                    Some(last) if last.instance == irs.instance => last.runs.extend(irs.runs),
                    _ => merged.push(InstanceRuns::new(irs.instance, irs.runs, limit)),
                }
            }

            debug!(
                name = %name,
                instance_runs = merged.len(),
                parameters = s.parameters.len(),
                "experiment closed"
            );
            let draft = ExperimentDraft {
                name,
                description: s.description.take(),
                parameters: std::mem::take(&mut s.parameters),
                instance_runs: merged,
            };
            let mut parent = root.state.lock();
            parent.experiments.push(draft);
            parent.lifecycle_mut().child_finished(None);
            drop(parent);
            s.lifecycle.mark_closed();
            Ok(())
        })
    }
}

impl Drop for ExperimentContext {
    fn drop(&mut self) {
        abandon(&*self.state, Some(&self.root.state));
    }
}
