//! Root context

use super::context::{guarded, opening, ContextKind, ContextState, Lifecycle, Tracked};
use super::{DimensionContext, ExperimentContext, InstanceContext};
use crate::config::BuilderConfig;
use crate::data::{DataFactory, Dimension, DimensionSet, Number};
use crate::graph::{Experiment, ExperimentSet, Instance, InstanceRuns, InstanceSet};
use crate::property::{PropertyKind, PropertyRegistry, ValueKey};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Construction phase of the root context. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Dimensions,
    Instances,
    Experiments,
}

/// A closed instance context awaiting the feature registry freeze.
#[derive(Debug)]
pub(crate) struct InstanceDraft {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) features: Vec<ValueKey>,
    pub(crate) lower: Vec<Option<Number>>,
    pub(crate) upper: Vec<Option<Number>>,
}

/// A closed experiment context awaiting the parameter registry compile.
#[derive(Debug)]
pub(crate) struct ExperimentDraft {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) parameters: Vec<ValueKey>,
    pub(crate) instance_runs: Vec<InstanceRuns>,
}

#[derive(Debug)]
pub(crate) struct SetState {
    lifecycle: Lifecycle,
    phase: Phase,
    pub(crate) dimension_drafts: Vec<Dimension>,
    dimensions: Option<Arc<DimensionSet>>,
    pub(crate) instance_drafts: Vec<InstanceDraft>,
    instances: Option<Arc<InstanceSet>>,
    pub(crate) experiments: Vec<ExperimentDraft>,
}

impl Tracked for SetState {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

/// State shared by the root handle and every descendant context.
#[derive(Debug)]
pub(crate) struct SetShared {
    pub(crate) config: BuilderConfig,
    pub(crate) state: Mutex<SetState>,
    pub(crate) features: Mutex<PropertyRegistry>,
    pub(crate) parameters: Mutex<PropertyRegistry>,
}

impl SetShared {
    /// Compile the dimension drafts, once.
    fn freeze_dimensions(&self, state: &mut SetState) -> Result<Arc<DimensionSet>> {
        if let Some(dimensions) = &state.dimensions {
            return Ok(Arc::clone(dimensions));
        }
        let drafts = std::mem::take(&mut state.dimension_drafts);
        let dimensions = Arc::new(DimensionSet::compile(drafts, self.config.soft_cache_limit)?);
        info!(
            dimensions = dimensions.len(),
            columns = ?dimensions.iter().map(|d| (d.name(), d.storage().as_str())).collect::<Vec<_>>(),
            "dimension set frozen"
        );
        state.dimensions = Some(Arc::clone(&dimensions));
        Ok(dimensions)
    }

    /// Compile the feature registry and the instance drafts, once.
    fn freeze_instances(&self, state: &mut SetState) -> Result<Arc<InstanceSet>> {
        if let Some(instances) = &state.instances {
            return Ok(Arc::clone(instances));
        }
        let registry = std::mem::replace(
            &mut *self.features.lock(),
            PropertyRegistry::new(PropertyKind::Feature),
        );
        let limit = self.config.soft_cache_limit;
        let (features, remap) = registry.compile(limit);

        let instances = std::mem::take(&mut state.instance_drafts)
            .into_iter()
            .map(|draft| {
                let setting = remap
                    .setting(&features, &draft.features, self.config.generalize_missing_features)
                    .map_err(|e| Error::validation(format!("instance '{}': {e}", draft.name)))?;
                Ok(Instance {
                    index: 0,
                    name: draft.name,
                    description: draft.description,
                    features: setting,
                    lower: draft.lower,
                    upper: draft.upper,
                    cache: crate::attribute::AttributeCache::new(limit),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let instances = Arc::new(InstanceSet::compile(instances, Arc::clone(&features), limit)?);
        info!(
            instances = instances.len(),
            features = features.len(),
            "instance set frozen"
        );
        state.instances = Some(Arc::clone(&instances));
        Ok(instances)
    }
}

/// Root builder context.
///
/// Dimensions are declared first, then instances, then experiments; opening
/// the first instance freezes the dimension set and opening the first
/// experiment freezes the instance set and the feature registry.
/// [`close`](Self::close) compiles everything into an [`ExperimentSet`].
///
/// # Example
///
/// ```rust
/// use optbench::builder::ExperimentSetContext;
/// use optbench::data::{DimensionDirection, DimensionType};
///
/// let root = ExperimentSetContext::new();
///
/// let dim = root.create_dimension()?;
/// dim.set_name("fes")?;
/// dim.set_parser("long[1,1000000]".parse()?)?;
/// dim.set_type(DimensionType::FunctionEvaluations)?;
/// dim.set_direction(DimensionDirection::IncreasingStrictly)?;
/// dim.close()?;
///
/// let instance = root.create_instance()?;
/// instance.set_name("sphere-2d")?;
/// instance.set_feature_value("n", 2)?;
/// instance.close()?;
///
/// let experiment = root.create_experiment()?;
/// experiment.set_name("random-search")?;
/// let irs = experiment.create_instance_runs()?;
/// irs.set_instance("sphere-2d")?;
/// let run = irs.create_run()?;
/// run.add_data_point("1")?;
/// run.add_data_point("10")?;
/// run.close()?;
/// irs.close()?;
/// experiment.close()?;
///
/// let set = root.close()?;
/// assert_eq!(set.point_count(), 2);
/// # Ok::<(), optbench::Error>(())
/// ```
#[derive(Debug)]
pub struct ExperimentSetContext {
    shared: Arc<SetShared>,
}

impl Default for ExperimentSetContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentSetContext {
    /// Open a root context with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    /// Open a root context.
    #[must_use]
    pub fn with_config(config: BuilderConfig) -> Self {
        debug!(?config, "experiment set context opened");
        Self {
            shared: Arc::new(SetShared {
                config,
                state: Mutex::new(SetState {
                    lifecycle: Lifecycle::new(ContextKind::ExperimentSet),
                    phase: Phase::Dimensions,
                    dimension_drafts: Vec::new(),
                    dimensions: None,
                    instance_drafts: Vec::new(),
                    instances: None,
                    experiments: Vec::new(),
                }),
                features: Mutex::new(PropertyRegistry::new(PropertyKind::Feature)),
                parameters: Mutex::new(PropertyRegistry::new(PropertyKind::Parameter)),
            }),
        }
    }

    /// Builder configuration in effect
    #[must_use]
    pub fn config(&self) -> &BuilderConfig {
        &self.shared.config
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ContextState {
        self.shared.state.lock().lifecycle().state()
    }

    /// Open a dimension context. Only allowed before the first instance.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the root is not open, has an open
    /// child, or already left the dimension phase.
    pub fn create_dimension(&self) -> Result<DimensionContext> {
        opening(&self.shared.state, None, ContextKind::Dimension, |s| {
            if s.phase > Phase::Dimensions {
                return Err(Error::lifecycle(
                    ContextKind::ExperimentSet,
                    "dimensions must be declared before instances and experiments",
                ));
            }
            Ok(())
        })?;
        Ok(DimensionContext::open(Arc::clone(&self.shared)))
    }

    /// Open an instance context, freezing the dimension set on first use.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the root is not open, has an open child,
    /// or already entered the experiment phase; a validation error if the
    /// dimension set cannot be compiled.
    pub fn create_instance(&self) -> Result<InstanceContext> {
        let dimensions = opening(&self.shared.state, None, ContextKind::Instance, |s| {
            if s.phase > Phase::Instances {
                return Err(Error::lifecycle(
                    ContextKind::ExperimentSet,
                    "instances must be declared before experiments",
                ));
            }
            let dimensions = self.shared.freeze_dimensions(s)?;
            s.phase = Phase::Instances;
            Ok(dimensions)
        })?;
        Ok(InstanceContext::open(Arc::clone(&self.shared), dimensions))
    }

    /// Open an experiment context. Several experiments may be open at once.
    ///
    /// The first experiment freezes the dimension set, the feature registry
    /// and the instance set.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the root is not open or has open
    /// children of another kind; a validation error if the dimension or
    /// instance set cannot be compiled.
    pub fn create_experiment(&self) -> Result<ExperimentContext> {
        let (factory, instances) =
            opening(&self.shared.state, None, ContextKind::Experiment, |s| {
                let dimensions = self.shared.freeze_dimensions(s)?;
                let instances = self.shared.freeze_instances(s)?;
                s.phase = Phase::Experiments;
                Ok((DataFactory::new(dimensions), instances))
            })?;
        Ok(ExperimentContext::open(
            Arc::clone(&self.shared),
            factory,
            instances,
        ))
    }

    /// Declare a feature ahead of any instance using it.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error once the feature registry is frozen, and a
    /// validation error for an empty name or a conflicting description.
    pub fn declare_feature(&self, name: &str, description: Option<&str>) -> Result<()> {
        guarded(&self.shared.state, None, "declare feature", |s| {
            if s.phase == Phase::Experiments {
                return Err(Error::lifecycle(
                    ContextKind::ExperimentSet,
                    format!("feature '{name}' declared after the instance set was frozen"),
                ));
            }
            self.shared.features.lock().declare(name, description)?;
            Ok(())
        })
    }

    /// Declare a parameter ahead of any experiment using it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name or a conflicting
    /// description.
    pub fn declare_parameter(&self, name: &str, description: Option<&str>) -> Result<()> {
        guarded(&self.shared.state, None, "declare parameter", |_| {
            self.shared.parameters.lock().declare(name, description)?;
            Ok(())
        })
    }

    /// The dimension set, once frozen
    #[must_use]
    pub fn dimensions(&self) -> Option<Arc<DimensionSet>> {
        self.shared.state.lock().dimensions.clone()
    }

    /// The instance set, once frozen
    #[must_use]
    pub fn instances(&self) -> Option<Arc<InstanceSet>> {
        self.shared.state.lock().instances.clone()
    }

    /// Compile everything into the experiment set.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the root is not open or children are
    /// still open, and a validation error if a child failed or no dimension,
    /// instance or experiment was declared.
    pub fn close(&self) -> Result<ExperimentSet> {
        let shared = &self.shared;
        guarded(&shared.state, None, "close", |s| {
            s.lifecycle.check_closable()?;
            let dimensions = shared.freeze_dimensions(s)?;
            let instances = shared.freeze_instances(s)?;
            let features = Arc::clone(instances.features());
            let limit = shared.config.soft_cache_limit;

            let registry = std::mem::replace(
                &mut *shared.parameters.lock(),
                PropertyRegistry::new(PropertyKind::Parameter),
            );
            let (parameters, remap) = registry.compile(limit);

            let experiments = std::mem::take(&mut s.experiments)
                .into_iter()
                .map(|draft| {
                    let setting = remap
                        .setting(
                            &parameters,
                            &draft.parameters,
                            shared.config.generalize_missing_parameters,
                        )
                        .map_err(|e| {
                            Error::validation(format!("experiment '{}': {e}", draft.name))
                        })?;
                    Ok(Experiment {
                        index: 0,
                        name: draft.name,
                        description: draft.description,
                        parameters: setting,
                        instance_runs: draft.instance_runs,
                        cache: crate::attribute::AttributeCache::new(limit),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let set = ExperimentSet::assemble(
                dimensions, instances, features, parameters, experiments, limit,
            )?;
            s.lifecycle.mark_closed();
            info!(
                dimensions = set.dimensions().len(),
                instances = set.instances().len(),
                experiments = set.experiments().len(),
                runs = set.run_count(),
                points = set.point_count(),
                "experiment set compiled"
            );
            Ok(set)
        })
    }
}

impl Drop for ExperimentSetContext {
    fn drop(&mut self) {
        super::context::abandon(&self.shared.state, None);
    }
}
