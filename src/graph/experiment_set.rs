//! The compiled experiment set

use super::{Experiment, Instance, InstanceRuns, InstanceSet, Run, RunId};
use crate::attribute::{impl_attributable, Attributable, AttributeCache};
use crate::data::{Dimension, DimensionSet};
use crate::property::{Property, PropertySet};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Root of the compiled graph.
///
/// Immutable: every node and every back-reference index is fixed once the
/// builder closes. Only the attribute caches change afterwards.
#[derive(Debug)]
pub struct ExperimentSet {
    compiled_at: DateTime<Utc>,
    dimensions: Arc<DimensionSet>,
    instances: Arc<InstanceSet>,
    features: Arc<PropertySet>,
    parameters: Arc<PropertySet>,
    experiments: Vec<Experiment>,
    pub(crate) cache: AttributeCache,
}

impl ExperimentSet {
    /// Sort experiments by name and their instance-run sets by instance,
    /// then fix all back-reference indices.
    pub(crate) fn assemble(
        dimensions: Arc<DimensionSet>,
        instances: Arc<InstanceSet>,
        features: Arc<PropertySet>,
        parameters: Arc<PropertySet>,
        mut experiments: Vec<Experiment>,
        soft_cache_limit: usize,
    ) -> Result<Self> {
        if experiments.is_empty() {
            return Err(Error::validation(
                "an experiment set needs at least one experiment",
            ));
        }
        experiments.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = experiments.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(Error::validation(format!(
                "experiment '{}' declared twice",
                pair[0].name
            )));
        }

        for (e, experiment) in experiments.iter_mut().enumerate() {
            experiment.index = e;
            experiment.instance_runs.sort_by_key(|irs| irs.instance);
            for (i, irs) in experiment.instance_runs.iter_mut().enumerate() {
                irs.experiment = e;
                irs.index = i;
                for (r, run) in irs.runs.iter_mut().enumerate() {
                    run.id = RunId {
                        experiment: e,
                        instance_runs: i,
                        index: r,
                    };
                }
            }
        }

        Ok(Self {
            compiled_at: Utc::now(),
            dimensions,
            instances,
            features,
            parameters,
            experiments,
            cache: AttributeCache::new(soft_cache_limit),
        })
    }

    /// When the builder closed
    #[must_use]
    pub const fn compiled_at(&self) -> DateTime<Utc> {
        self.compiled_at
    }

    /// Dimension set
    #[must_use]
    pub const fn dimensions(&self) -> &Arc<DimensionSet> {
        &self.dimensions
    }

    /// Instance set
    #[must_use]
    pub const fn instances(&self) -> &Arc<InstanceSet> {
        &self.instances
    }

    /// Declared features
    #[must_use]
    pub const fn features(&self) -> &Arc<PropertySet> {
        &self.features
    }

    /// Declared parameters
    #[must_use]
    pub const fn parameters(&self) -> &Arc<PropertySet> {
        &self.parameters
    }

    /// Experiments sorted by name
    #[must_use]
    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    /// Dimension by name.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if no dimension has this name.
    pub fn dimension(&self, name: &str) -> Result<&Dimension> {
        self.dimensions.get(name)
    }

    /// Instance by name.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if no instance has this name.
    pub fn instance(&self, name: &str) -> Result<&Instance> {
        self.instances.get(name)
    }

    /// Experiment by name.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if no experiment has this name.
    pub fn experiment(&self, name: &str) -> Result<&Experiment> {
        self.experiments
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .map(|i| &self.experiments[i])
            .map_err(|_| Error::lookup("experiment", name))
    }

    /// Feature by name.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the feature was never declared.
    pub fn feature(&self, name: &str) -> Result<&Property> {
        self.features.get(name)
    }

    /// Parameter by name.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the parameter was never declared.
    pub fn parameter(&self, name: &str) -> Result<&Property> {
        self.parameters.get(name)
    }

    /// Experiment owning an instance-run set
    #[must_use]
    pub fn owner_of(&self, instance_runs: &InstanceRuns) -> Option<&Experiment> {
        self.experiments.get(instance_runs.experiment)
    }

    /// Instance-run set owning a run
    #[must_use]
    pub fn owner_of_run(&self, run: &Run) -> Option<&InstanceRuns> {
        self.experiments
            .get(run.id.experiment)?
            .instance_runs
            .get(run.id.instance_runs)
    }

    /// Instance an instance-run set was performed on
    #[must_use]
    pub fn instance_of(&self, instance_runs: &InstanceRuns) -> Option<&Instance> {
        self.instances.by_index(instance_runs.instance)
    }

    /// Run by position
    #[must_use]
    pub fn run(&self, id: RunId) -> Option<&Run> {
        self.experiments
            .get(id.experiment)?
            .instance_runs
            .get(id.instance_runs)?
            .runs
            .get(id.index)
    }

    /// Iterate over every instance-run set
    pub fn all_instance_runs(&self) -> impl Iterator<Item = &InstanceRuns> + '_ {
        self.experiments.iter().flat_map(|e| e.instance_runs.iter())
    }

    /// Iterate over every run
    pub fn runs(&self) -> impl Iterator<Item = &Run> + '_ {
        self.experiments.iter().flat_map(Experiment::runs)
    }

    /// Total number of instance-run sets
    #[must_use]
    pub fn instance_runs_count(&self) -> usize {
        self.experiments.iter().map(|e| e.instance_runs.len()).sum()
    }

    /// Total number of runs
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.experiments.iter().map(Experiment::run_count).sum()
    }

    /// Total number of data points
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.runs().map(Run::len).sum()
    }

    /// Drop soft attribute results on every node of the graph.
    ///
    /// Returns the number of purged entries.
    pub fn purge_soft_attributes(&self) -> usize {
        let mut caches: Vec<&AttributeCache> = vec![
            self.attribute_cache(),
            self.dimensions.attribute_cache(),
            self.instances.attribute_cache(),
            self.features.attribute_cache(),
            self.parameters.attribute_cache(),
        ];
        caches.extend(self.dimensions.iter().map(Attributable::attribute_cache));
        caches.extend(self.instances.iter().map(Attributable::attribute_cache));
        caches.extend(self.features.properties().iter().map(Attributable::attribute_cache));
        caches.extend(self.parameters.properties().iter().map(Attributable::attribute_cache));
        for experiment in &self.experiments {
            caches.push(experiment.attribute_cache());
            for irs in &experiment.instance_runs {
                caches.push(irs.attribute_cache());
                caches.extend(irs.runs.iter().map(Attributable::attribute_cache));
            }
        }

        let purged: usize = caches.into_iter().map(AttributeCache::purge_soft).sum();
        debug!(purged, "purged soft attributes");
        purged
    }
}

impl_attributable!(ExperimentSet);
