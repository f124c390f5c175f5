//! Raw and interned property values

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Un-interned value as supplied by a loader.
///
/// Values are normalized before interning: text is parsed into the narrowest
/// kind it spells (`"true"` → `Bool`, `"100"` → `Integer`, `"1.5"` →
/// `Float`) and integral floats collapse to integers, so `10`, `10.0` and
/// `"10"` all intern to the same value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Integer(i64),
    /// Non-integral floating point number
    Float(f64),
    /// Free text
    Text(String),
}

#[allow(clippy::cast_precision_loss)]
const I64_LOWER: f64 = i64::MIN as f64;
#[allow(clippy::cast_precision_loss)]
const I64_UPPER: f64 = i64::MAX as f64;

impl RawValue {
    /// Parse a textual value into its normalized form.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty text or `NaN`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("property value must not be empty"));
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Ok(Self::Bool(true));
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Ok(Self::Bool(false));
        }
        if let Ok(integer) = trimmed.parse::<i64>() {
            return Ok(Self::Integer(integer));
        }
        if let Ok(float) = trimmed.parse::<f64>() {
            return Self::Float(float).normalize();
        }
        Ok(Self::Text(trimmed.to_string()))
    }

    /// Convert a JSON scalar.
    ///
    /// # Errors
    ///
    /// Returns a validation error for `null`, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_i64().map_or_else(
                || {
                    n.as_f64().map_or_else(
                        || Err(Error::validation(format!("unsupported number {n}"))),
                        |f| Self::Float(f).normalize(),
                    )
                },
                |i| Ok(Self::Integer(i)),
            ),
            serde_json::Value::String(s) => Self::parse(s),
            other => Err(Error::validation(format!(
                "property value must be a scalar, got {other}"
            ))),
        }
    }

    /// Bring the value into canonical form.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty text or `NaN`.
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
    pub fn normalize(self) -> Result<Self> {
        match self {
            Self::Text(text) => Self::parse(&text),
            Self::Float(f) if f.is_nan() => {
                Err(Error::validation("property value must not be NaN"))
            }
            Self::Float(f) if f.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(&f) => {
                Ok(Self::Integer(f as i64))
            }
            other => Ok(other),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Integer(_) | Self::Float(_) => 1,
            Self::Text(_) => 2,
        }
    }

    /// Numeric view, if this is a number.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for RawValue {}

impl Hash for RawValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Bool(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Text(t) => t.hash(state),
        }
    }
}

impl Ord for RawValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (a, b) if a.rank() == 1 && b.rank() == 1 => {
                let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                // Integers sort before floats of the same magnitude
                x.total_cmp(&y)
                    .then_with(|| matches!(a, Self::Float(_)).cmp(&matches!(b, Self::Float(_))))
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for RawValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for RawValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// An interned value of one property.
///
/// Exactly one `PropertyValue` exists per distinct raw value of a property,
/// so two values are the same iff they are the same object
/// (`std::ptr::eq`).
#[derive(Debug)]
pub struct PropertyValue {
    pub(crate) property: usize,
    pub(crate) id: usize,
    pub(crate) description: Option<String>,
    pub(crate) value: RawValue,
}

impl PropertyValue {
    /// Id of the owning property within its property set.
    #[must_use]
    pub const fn property_id(&self) -> usize {
        self.property
    }

    /// Index of this value within its property's value array.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Display name, the textual form of the raw value.
    #[must_use]
    pub fn name(&self) -> String {
        self.value.to_string()
    }

    /// Optional description supplied at interning time.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Underlying raw value.
    #[must_use]
    pub const fn value(&self) -> &RawValue {
        &self.value
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}
