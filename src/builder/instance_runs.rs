//! Instance-run set context

use super::context::{abandon, guarded, opening, ContextKind, ContextState, Lifecycle, Tracked};
use super::experiment::ExperimentState;
use super::experiment_set::SetShared;
use super::{record_key, RunContext};
use crate::data::DataFactory;
use crate::graph::{InstanceRuns, InstanceSet, Run};
use crate::property::ValueKey;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub(crate) struct InstanceRunsState {
    lifecycle: Lifecycle,
    instance: Option<usize>,
    pub(crate) runs: Vec<Run>,
    pub(crate) parameters: Vec<ValueKey>,
}

impl Tracked for InstanceRunsState {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

/// Collects the runs of one experiment on one instance.
///
/// [`set_instance`](Self::set_instance) must be called before the first
/// run is opened; runs may then be built concurrently.
#[derive(Debug)]
pub struct InstanceRunsContext {
    root: Arc<SetShared>,
    experiment: Arc<Mutex<ExperimentState>>,
    factory: DataFactory,
    instances: Arc<InstanceSet>,
    state: Arc<Mutex<InstanceRunsState>>,
}

impl InstanceRunsContext {
    pub(crate) fn open(
        root: Arc<SetShared>,
        experiment: Arc<Mutex<ExperimentState>>,
        factory: DataFactory,
        instances: Arc<InstanceSet>,
    ) -> Self {
        Self {
            root,
            experiment,
            factory,
            instances,
            state: Arc::new(Mutex::new(InstanceRunsState {
                lifecycle: Lifecycle::new(ContextKind::InstanceRuns),
                instance: None,
                runs: Vec::new(),
                parameters: Vec::new(),
            })),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ContextState {
        self.state.lock().lifecycle.state()
    }

    /// Bind the set to the instance called `name`.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open or runs are open; lookup error for an
    /// unknown instance; validation error if bound to another instance.
    pub fn set_instance(&self, name: &str) -> Result<()> {
        guarded(&*self.state, Some(&*self.experiment), "set instance", |s| {
            let instance = self.instances.get(name)?;
            match s.instance {
                Some(bound) if bound != instance.index() => Err(Error::validation(format!(
                    "instance-run set already bound to instance '{}'",
                    self.instances.by_index(bound).map_or("?", |i| i.name())
                ))),
                _ => {
                    s.instance = Some(instance.index());
                    Ok(())
                }
            }
        })
    }

    /// Open a run. Several may be open at once.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open; validation error if no instance was set.
    pub fn create_run(&self) -> Result<RunContext> {
        let instance = opening(
            &*self.state,
            Some(&*self.experiment),
            ContextKind::Run,
            |s| {
                s.instance.ok_or_else(|| {
                    Error::validation("set_instance must be called before opening runs")
                })
            },
        )?;
        let (lower, upper) = self
            .instances
            .by_index(instance)
            .map(|i| (i.lower_bounds().to_vec(), i.upper_bounds().to_vec()))
            .unwrap_or_default();
        Ok(RunContext::open(
            Arc::clone(&self.root),
            Arc::clone(&self.state),
            self.factory.clone(),
            lower,
            upper,
        ))
    }

    /// Hand the collected runs to the experiment.
    ///
    /// Parameter values given on the runs are merged into the experiment's
    /// parameter values.
    ///
    /// # Errors
    ///
    /// Lifecycle error if not open or runs are open; validation error if no
    /// instance was set, no run was closed, a run failed, or run parameters
    /// conflict with the experiment's.
    pub fn close(&self) -> Result<()> {
        let root = &self.root;
        guarded(&*self.state, Some(&*self.experiment), "close", |s| {
            s.lifecycle.check_closable()?;
            let instance = s
                .instance
                .ok_or_else(|| Error::validation("instance-run set has no instance"))?;
            let instance_name = self.instances.by_index(instance).map_or("?", |i| i.name());
            if s.runs.is_empty() {
                return Err(Error::validation(format!(
                    "instance-run set over '{instance_name}' has no runs"
                )));
            }

            let mut parent = self.experiment.lock();
            {
                let registry = root.parameters.lock();
                for &key in &s.parameters {
                    record_key(&mut parent.parameters, key, &registry)?;
                }
            }
            debug!(
                instance = instance_name,
                runs = s.runs.len(),
                "instance-run set closed"
            );
            let runs = std::mem::take(&mut s.runs);
            parent.instance_runs.push(InstanceRuns::new(
                instance,
                runs,
                root.config.soft_cache_limit,
            ));
            parent.lifecycle_mut().child_finished(None);
            drop(parent);
            s.lifecycle.mark_closed();
            Ok(())
        })
    }
}

impl Drop for InstanceRunsContext {
    fn drop(&mut self) {
        abandon(&*self.state, Some(&*self.experiment));
    }
}
