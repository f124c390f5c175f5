//! Numeric data factory
//!
//! Toyota Way: Poka-Yoke (reject bad points at append time, never at read time)
//!
//! Each dimension declares a [`Parser`] whose bounds fix the column storage
//! type once, when the [`DimensionSet`] compiles. The parser then guards
//! every incoming value, so the chosen type is lossless for the whole
//! experiment set. Runs are packed into arrow `RecordBatch`es sharing the
//! dimension set's schema.
//!
//! ```rust
//! use optbench::data::{NumericType, Parser};
//!
//! let parser: Parser = "long[0,1000]".parse()?;
//! assert_eq!(parser.storage_type(), NumericType::Short);
//! assert!(parser.parse("1001").is_err());
//! # Ok::<(), optbench::Error>(())
//! ```

mod dimension;
mod factory;
mod number;
mod numeric_type;
mod parser;

pub use dimension::{Dimension, DimensionDirection, DimensionSet, DimensionType};
pub use factory::DataFactory;
pub use number::Number;
pub use numeric_type::{NumericType, TypeLattice};
pub use parser::Parser;

pub(crate) use factory::read_value;
