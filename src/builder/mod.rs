//! Hierarchical builder stack
//!
//! Toyota Way: Jidoka (a failed child stops its parent from compiling)
//!
//! ## Context tree
//!
//! ```text
//! ExperimentSetContext
//!  ├── DimensionContext      (one at a time, before instances)
//!  ├── InstanceContext       (one at a time, before experiments)
//!  └── ExperimentContext     (concurrent)
//!        └── InstanceRunsContext   (concurrent)
//!              └── RunContext      (concurrent)
//! ```
//!
//! Every context is opened by its parent and is either open, closed or
//! failed. Closing compiles the context into an immutable node and hands it
//! to the parent. An error while open fails the context and is recorded on
//! the parent, whose close then fails as well; so does dropping an open
//! handle.
//!
//! Handles are `Send + Sync`: sibling experiments, instance-run sets and
//! runs can be populated from different threads, for example through a
//! [`ConstructionPool`]. Only registration and interning take locks.

mod context;
mod dimension;
mod experiment;
mod experiment_set;
mod instance;
mod instance_runs;
mod pool;
mod run;

pub use context::{ContextKind, ContextState};
pub use dimension::DimensionContext;
pub use experiment::ExperimentContext;
pub use experiment_set::ExperimentSetContext;
pub use instance::InstanceContext;
pub use instance_runs::InstanceRunsContext;
pub use pool::ConstructionPool;
pub use run::RunContext;

use crate::property::{PropertyRegistry, ValueKey};
use crate::{Error, Result};

/// Record `key` in a node's value list, rejecting a second, different value
/// for the same property.
fn record_key(keys: &mut Vec<ValueKey>, key: ValueKey, registry: &PropertyRegistry) -> Result<()> {
    match keys.iter().find(|k| k.property() == key.property()) {
        Some(&existing) if existing != key => Err(Error::validation(format!(
            "conflicting values for {} '{}': '{}' and '{}'",
            registry.kind(),
            registry.property_name(key),
            registry.raw_value(existing),
            registry.raw_value(key)
        ))),
        Some(_) => Ok(()),
        None => {
            keys.push(key);
            Ok(())
        }
    }
}

/// Set a write-once text field, rejecting empty or conflicting values.
fn assign_text(slot: &mut Option<String>, value: &str, what: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{what} must not be empty")));
    }
    match slot {
        Some(existing) if existing != value => Err(Error::validation(format!(
            "{what} already set to '{existing}', cannot change it to '{value}'"
        ))),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value.to_string());
            Ok(())
        }
    }
}

/// Set a write-once field, rejecting conflicting values.
fn assign<T: PartialEq + std::fmt::Display>(slot: &mut Option<T>, value: T, what: &str) -> Result<()> {
    match slot {
        Some(existing) if *existing != value => Err(Error::validation(format!(
            "{what} already set to '{existing}', cannot change it to '{value}'"
        ))),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}
