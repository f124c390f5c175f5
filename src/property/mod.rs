//! Property registry & value interning
//!
//! Features describe problem instances, parameters describe algorithm
//! configurations. Both are *properties*: named slots with a set of interned
//! values.
//!
//! ## Lifecycle
//!
//! ```text
//! PropertyRegistry (mutable, provisional ids)
//!        │ compile()
//!        ▼
//! Arc<PropertySet> ──< Property ──< PropertyValue
//!        ▲
//!        └── shared by every Setting built from it
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use optbench::property::{PropertyKind, PropertyRegistry, RawValue, Setting};
//!
//! let mut registry = PropertyRegistry::new(PropertyKind::Feature);
//! let scale = registry.intern("scale", Some("problem scale"), RawValue::from(10), None)?;
//! registry.declare("symmetric", None)?;
//!
//! let (features, remap) = registry.compile(64);
//! let setting = remap.setting(&features, &[scale], true)?;
//! assert!(setting.get("symmetric")?.is_generalized());
//! # Ok::<(), optbench::Error>(())
//! ```

mod registry;
mod set;
mod setting;
mod value;

pub use registry::{PropertyRegistry, Remap, ValueKey};
pub use set::{Property, PropertySet};
pub use setting::{Setting, SettingValue};
pub use value::{PropertyValue, RawValue};

use std::fmt;

/// Which kind of property a registry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Describes a problem instance
    Feature,
    /// Describes an algorithm setup
    Parameter,
}

impl PropertyKind {
    /// Lower-case name for messages
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Parameter => "parameter",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
