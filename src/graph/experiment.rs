//! Experiments and instance-run sets

use super::Run;
use crate::attribute::{impl_attributable, AttributeCache};
use crate::property::Setting;

/// All runs of one experiment on one instance.
#[derive(Debug)]
pub struct InstanceRuns {
    pub(crate) experiment: usize,
    pub(crate) index: usize,
    pub(crate) instance: usize,
    pub(crate) runs: Vec<Run>,
    pub(crate) cache: AttributeCache,
}

impl InstanceRuns {
    pub(crate) fn new(instance: usize, runs: Vec<Run>, soft_cache_limit: usize) -> Self {
        Self {
            experiment: 0,
            index: 0,
            instance,
            runs,
            cache: AttributeCache::new(soft_cache_limit),
        }
    }

    /// Index of the owning experiment
    #[must_use]
    pub const fn experiment(&self) -> usize {
        self.experiment
    }

    /// Index within the owning experiment
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Index of the instance the runs were performed on
    #[must_use]
    pub const fn instance(&self) -> usize {
        self.instance
    }

    /// Runs in close order
    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Number of runs
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Always false for a compiled set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Total number of data points over all runs
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.runs.iter().map(Run::len).sum()
    }
}

/// An algorithm setup applied to some instances.
#[derive(Debug)]
pub struct Experiment {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) parameters: Setting,
    pub(crate) instance_runs: Vec<InstanceRuns>,
    pub(crate) cache: AttributeCache,
}

impl Experiment {
    /// Index within the experiment set (experiments are sorted by name)
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Experiment name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional description
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Parameter setting, one slot per declared parameter
    #[must_use]
    pub const fn parameters(&self) -> &Setting {
        &self.parameters
    }

    /// Instance-run sets sorted by instance index
    #[must_use]
    pub fn instance_runs(&self) -> &[InstanceRuns] {
        &self.instance_runs
    }

    /// Instance-run set over the instance with index `instance`.
    #[must_use]
    pub fn instance_runs_for(&self, instance: usize) -> Option<&InstanceRuns> {
        self.instance_runs
            .binary_search_by_key(&instance, |irs| irs.instance)
            .ok()
            .map(|i| &self.instance_runs[i])
    }

    /// Iterate over every run of the experiment.
    pub fn runs(&self) -> impl Iterator<Item = &Run> + '_ {
        self.instance_runs.iter().flat_map(|irs| irs.runs.iter())
    }

    /// Total number of runs
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.instance_runs.iter().map(InstanceRuns::len).sum()
    }
}

impl_attributable!(Experiment, InstanceRuns);
