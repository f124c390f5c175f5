//! Numbers flowing from parsers into compiled columns

use std::cmp::Ordering;
use std::fmt;

/// A parsed dimension value: an integer or a floating point number.
///
/// Integer dimensions only ever produce `Long`, floating dimensions only
/// `Double`; comparisons across the two variants are still defined so that
/// bounds given as either kind can be checked.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// Integer value
    Long(i64),
    /// Floating point value (never NaN once parsed)
    Double(f64),
}

#[allow(clippy::cast_precision_loss)]
const I64_LOWER: f64 = i64::MIN as f64;
#[allow(clippy::cast_precision_loss)]
const I64_UPPER: f64 = i64::MAX as f64;

impl Number {
    /// Value as `f64` (may round for very large integers)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Long(v) => v as f64,
            Self::Double(v) => v,
        }
    }

    /// Value as `i64`, if it is integral and in range.
    #[must_use]
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(v),
            Self::Double(v) if v.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(&v) => {
                Some(v as i64)
            }
            Self::Double(_) => None,
        }
    }

    /// Whether the value has no fractional part
    #[must_use]
    pub fn is_integral(self) -> bool {
        self.as_i64().is_some()
    }

    /// Total order over both variants.
    #[must_use]
    pub fn compare(self, other: Self) -> Ordering {
        match (self, other) {
            (Self::Long(a), Self::Long(b)) => a.cmp(&b),
            (a, b) => a.as_f64().total_cmp(&b.as_f64()),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.compare(*other) == Ordering::Equal
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(*other))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Self::Long(i64::from(value))
    }
}

impl From<u32> for Number {
    fn from(value: u32) -> Self {
        Self::Long(i64::from(value))
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<f32> for Number {
    fn from(value: f32) -> Self {
        Self::Double(f64::from(value))
    }
}
