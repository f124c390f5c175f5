//! # optbench: Experiment-Set Builder and Compiler
//!
//! **Version**: 0.1.0
//!
//! optbench ingests benchmark data of optimization algorithms (dimensions,
//! problem instances, experiments, runs, data points, features, parameters)
//! through a nested builder protocol and compiles it into a compact,
//! immutable, cross-referenced in-memory graph with memoized derived values.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke**: Lifecycle state machine rejects out-of-order construction
//! - **Jidoka**: A failed child context stops its parent from compiling
//! - **Muda elimination**: Narrowest lossless column type per dimension,
//!   interned property values shared by every setting
//! - **Heijunka**: Sibling experiments and runs built concurrently on a
//!   fixed-size pool
//!
//! ## Modules
//!
//! | Module | Role |
//! |---|---|
//! | [`builder`] | context stack (experiment set, dimension, instance, experiment, instance runs, run) |
//! | [`property`] | feature/parameter registry, interning, settings |
//! | [`data`] | parsers, storage type lattice, dimensions, columnar runs |
//! | [`graph`] | compiled, immutable experiment set |
//! | [`attribute`] | per-node memoization of derived values |
//!
//! ## Example Usage
//!
//! ```rust
//! use optbench::builder::ExperimentSetContext;
//! use optbench::data::{DimensionDirection, DimensionType, Parser};
//!
//! let root = ExperimentSetContext::new();
//! for (name, parser, kind, direction) in [
//!     ("fes", "long[1,100000]", DimensionType::FunctionEvaluations, DimensionDirection::IncreasingStrictly),
//!     ("best", "double", DimensionType::QualityProblemDependent, DimensionDirection::Decreasing),
//! ] {
//!     let dim = root.create_dimension()?;
//!     dim.set_name(name)?;
//!     dim.set_parser(parser.parse::<Parser>()?)?;
//!     dim.set_type(kind)?;
//!     dim.set_direction(direction)?;
//!     dim.close()?;
//! }
//!
//! let instance = root.create_instance()?;
//! instance.set_name("tsp-att48")?;
//! instance.set_feature_value("n", 48)?;
//! instance.close()?;
//!
//! let experiment = root.create_experiment()?;
//! experiment.set_name("2-opt")?;
//! experiment.set_parameter_value("restarts", true)?;
//! let irs = experiment.create_instance_runs()?;
//! irs.set_instance("tsp-att48")?;
//! let run = irs.create_run()?;
//! run.add_data_point("1 40000")?;
//! run.add_data_point("250 33522")?;
//! run.close()?;
//! irs.close()?;
//! experiment.close()?;
//!
//! let set = root.close()?;
//! let run = set.experiment("2-opt")?.runs().next().expect("one run");
//! assert_eq!(run.len(), 2);
//! # Ok::<(), optbench::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod attribute;
pub mod builder;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod logging;
pub mod property;

pub use error::{Error, ErrorKind, Result};
