//! Storage type lattice
//!
//! ```text
//! Byte ─▶ Short ─▶ Int ─▶ Long ─┐
//!                               ▼
//!                 Float ─────▶ Double
//! ```
//!
//! A [`TypeLattice`] starts at the narrowest type of its chain and widens
//! along the arrows whenever an observed value does not fit.

use super::Number;
use arrow::datatypes::DataType;
use std::fmt;

/// Column storage type of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericType {
    /// `i8`
    Byte,
    /// `i16`
    Short,
    /// `i32`
    Int,
    /// `i64`
    Long,
    /// `f32`
    Float,
    /// `f64`
    Double,
}

impl NumericType {
    /// Arrow data type of columns of this type
    #[must_use]
    pub fn data_type(self) -> DataType {
        match self {
            Self::Byte => DataType::Int8,
            Self::Short => DataType::Int16,
            Self::Int => DataType::Int32,
            Self::Long => DataType::Int64,
            Self::Float => DataType::Float32,
            Self::Double => DataType::Float64,
        }
    }

    /// Whether values are stored as integers
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Int | Self::Long)
    }

    /// Bytes per value
    #[must_use]
    pub const fn byte_width(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Short => 2,
            Self::Int | Self::Float => 4,
            Self::Long | Self::Double => 8,
        }
    }

    /// Next wider type, `None` at the top of the lattice.
    #[must_use]
    pub const fn widen(self) -> Option<Self> {
        match self {
            Self::Byte => Some(Self::Short),
            Self::Short => Some(Self::Int),
            Self::Int => Some(Self::Long),
            Self::Long | Self::Float => Some(Self::Double),
            Self::Double => None,
        }
    }

    /// Whether `value` is representable without loss.
    #[must_use]
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
    pub fn can_hold(self, value: Number) -> bool {
        match self {
            Self::Byte => value.as_i64().is_some_and(|v| i8::try_from(v).is_ok()),
            Self::Short => value.as_i64().is_some_and(|v| i16::try_from(v).is_ok()),
            Self::Int => value.as_i64().is_some_and(|v| i32::try_from(v).is_ok()),
            Self::Long => value.as_i64().is_some(),
            Self::Float => {
                let v = value.as_f64();
                !v.is_nan() && f64::from(v as f32) == v
            }
            Self::Double => match value {
                Number::Double(v) => !v.is_nan(),
                Number::Long(v) => Number::Double(value.as_f64()).as_i64() == Some(v),
            },
        }
    }

    /// Lower-case type name as used in parser specs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incrementally widened storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLattice {
    current: NumericType,
}

impl TypeLattice {
    /// Start at `start`, the narrowest type considered.
    #[must_use]
    pub const fn starting_at(start: NumericType) -> Self {
        Self { current: start }
    }

    /// Widen until `value` fits. Values that fit nowhere leave the lattice at `Double`.
    pub fn observe(&mut self, value: Number) {
        while !self.current.can_hold(value) {
            match self.current.widen() {
                Some(wider) => self.current = wider,
                None => break,
            }
        }
    }

    /// Current (frozen once observation stops) type
    #[must_use]
    pub const fn current(&self) -> NumericType {
        self.current
    }
}
