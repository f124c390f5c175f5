//! Compiled experiment graph
//!
//! ```text
//! ExperimentSet
//!  ├── DimensionSet ──< Dimension
//!  ├── InstanceSet  ──< Instance (feature Setting, bound overrides)
//!  ├── features / parameters: Arc<PropertySet>
//!  └──< Experiment (parameter Setting)
//!        └──< InstanceRuns ── instance index
//!              └──< Run (arrow RecordBatch) ──< DataPoint
//! ```
//!
//! Children are owned by their parents. Back-references (a run's experiment,
//! an instance-run set's instance) are plain indices fixed when the builder
//! closes, resolved through [`ExperimentSet`]. Every node implements
//! [`Attributable`](crate::attribute::Attributable).

mod experiment;
mod experiment_set;
mod instance;
mod run;

pub use experiment::{Experiment, InstanceRuns};
pub use experiment_set::ExperimentSet;
pub use instance::{Instance, InstanceSet};
pub use run::{DataPoint, Run, RunId};
