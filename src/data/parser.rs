//! Dimension value parsers
//!
//! A parser fixes the numeric domain of a dimension: integer, single or
//! double precision, plus inclusive bounds. Every value entering a run goes
//! through its dimension's parser, so the declared bounds envelope the whole
//! ingestion stream and determine the column storage type.
//!
//! Parsers can be written as text: `int`, `byte`, `long[0,1000000]`,
//! `double[0,1]`, `float(-1, 1)`.

use super::{Number, NumericType, TypeLattice};
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Numeric domain of a dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parser {
    /// Integers in `[lower, upper]`
    Integer {
        /// Inclusive lower bound
        lower: i64,
        /// Inclusive upper bound
        upper: i64,
    },
    /// Single precision numbers in `[lower, upper]`
    Float {
        /// Inclusive lower bound
        lower: f64,
        /// Inclusive upper bound
        upper: f64,
    },
    /// Double precision numbers in `[lower, upper]`
    Double {
        /// Inclusive lower bound
        lower: f64,
        /// Inclusive upper bound
        upper: f64,
    },
}

impl Parser {
    /// Integer parser over `[lower, upper]`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `lower > upper`.
    pub fn integer(lower: i64, upper: i64) -> Result<Self> {
        if lower > upper {
            return Err(Error::validation(format!(
                "parser lower bound {lower} exceeds upper bound {upper}"
            )));
        }
        Ok(Self::Integer { lower, upper })
    }

    /// Single precision parser over `[lower, upper]`.
    ///
    /// Bounds are rounded to the nearest `f32`, the same rounding applied to
    /// every checked value, so a value written exactly as a bound is accepted.
    ///
    /// # Errors
    ///
    /// Returns a validation error for NaN bounds, `lower > upper`, or bounds
    /// outside the `f32` range.
    pub fn float(lower: f64, upper: f64) -> Result<Self> {
        check_float_bounds(lower, upper)?;
        let limit = f64::from(f32::MAX);
        if lower < -limit || upper > limit {
            return Err(Error::validation(format!(
                "float parser bounds [{lower}, {upper}] exceed the single precision range"
            )));
        }
        Ok(Self::Float {
            lower: round_to_single(lower),
            upper: round_to_single(upper),
        })
    }

    /// Double precision parser over `[lower, upper]`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for NaN bounds or `lower > upper`.
    pub fn double(lower: f64, upper: f64) -> Result<Self> {
        check_float_bounds(lower, upper)?;
        Ok(Self::Double { lower, upper })
    }

    /// Parser covering the full range of a storage type.
    #[must_use]
    pub fn full_range(numeric: NumericType) -> Self {
        match numeric {
            NumericType::Byte => Self::Integer {
                lower: i64::from(i8::MIN),
                upper: i64::from(i8::MAX),
            },
            NumericType::Short => Self::Integer {
                lower: i64::from(i16::MIN),
                upper: i64::from(i16::MAX),
            },
            NumericType::Int => Self::Integer {
                lower: i64::from(i32::MIN),
                upper: i64::from(i32::MAX),
            },
            NumericType::Long => Self::Integer {
                lower: i64::MIN,
                upper: i64::MAX,
            },
            NumericType::Float => Self::Float {
                lower: -f64::from(f32::MAX),
                upper: f64::from(f32::MAX),
            },
            NumericType::Double => Self::Double {
                lower: -f64::MAX,
                upper: f64::MAX,
            },
        }
    }

    /// Inclusive lower bound
    #[must_use]
    pub const fn lower_bound(&self) -> Number {
        match *self {
            Self::Integer { lower, .. } => Number::Long(lower),
            Self::Float { lower, .. } | Self::Double { lower, .. } => Number::Double(lower),
        }
    }

    /// Inclusive upper bound
    #[must_use]
    pub const fn upper_bound(&self) -> Number {
        match *self {
            Self::Integer { upper, .. } => Number::Long(upper),
            Self::Float { upper, .. } | Self::Double { upper, .. } => Number::Double(upper),
        }
    }

    /// Whether values are integers
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Integer { .. })
    }

    /// Narrowest storage type that holds every value this parser accepts.
    #[must_use]
    pub fn storage_type(&self) -> NumericType {
        let mut lattice = match self {
            Self::Integer { .. } => TypeLattice::starting_at(NumericType::Byte),
            // Values are rounded to single precision on entry
            Self::Float { .. } => return NumericType::Float,
            // Bounds say nothing about the precision of values in between
            Self::Double { .. } => return NumericType::Double,
        };
        lattice.observe(self.lower_bound());
        lattice.observe(self.upper_bound());
        lattice.current()
    }

    /// Parse one textual value.
    ///
    /// Integer parsers accept integral values written in float notation
    /// (`"1e3"`, `"7.0"`).
    ///
    /// # Errors
    ///
    /// Returns a validation error if the text is not a number of this
    /// parser's domain or lies outside its bounds.
    pub fn parse(&self, text: &str) -> Result<Number> {
        let token = text.trim();
        if token.is_empty() {
            return Err(Error::validation("empty numeric value"));
        }
        if self.is_integer() {
            if let Ok(v) = token.parse::<i64>() {
                return self.check(Number::Long(v));
            }
        }
        let v = token.parse::<f64>().map_err(|_| {
            Error::validation(format!("cannot parse '{token}' with parser {self}"))
        })?;
        self.check(Number::Double(v))
    }

    /// Validate and coerce an already numeric value into this parser's domain.
    ///
    /// # Errors
    ///
    /// Returns a validation error for NaN, non-integral values of integer
    /// parsers, and values outside the bounds.
    pub fn check(&self, value: Number) -> Result<Number> {
        if value.as_f64().is_nan() {
            return Err(Error::validation("NaN is not a valid dimension value"));
        }
        let coerced = match *self {
            Self::Integer { .. } => value.as_i64().map(Number::Long).ok_or_else(|| {
                Error::validation(format!("value {value} is not an integer ({self})"))
            })?,
            Self::Float { .. } => {
                let narrowed = round_to_single(value.as_f64());
                if narrowed.is_infinite() && value.as_f64().is_finite() {
                    return Err(Error::validation(format!(
                        "value {value} is not representable in single precision"
                    )));
                }
                Number::Double(narrowed)
            }
            Self::Double { .. } => Number::Double(value.as_f64()),
        };
        if coerced < self.lower_bound() || coerced > self.upper_bound() {
            return Err(Error::validation(format!(
                "value {value} outside bounds of parser {self}"
            )));
        }
        Ok(coerced)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round_to_single(value: f64) -> f64 {
    f64::from(value as f32)
}

fn check_float_bounds(lower: f64, upper: f64) -> Result<()> {
    if lower.is_nan() || upper.is_nan() {
        return Err(Error::validation("parser bounds must not be NaN"));
    }
    if lower > upper {
        return Err(Error::validation(format!(
            "parser lower bound {lower} exceeds upper bound {upper}"
        )));
    }
    Ok(())
}

impl fmt::Display for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer { lower, upper } => write!(f, "integer[{lower},{upper}]"),
            Self::Float { lower, upper } => write!(f, "float[{lower},{upper}]"),
            Self::Double { lower, upper } => write!(f, "double[{lower},{upper}]"),
        }
    }
}

impl FromStr for Parser {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (name, bounds) = match spec.find(['[', '(']) {
            Some(open) => {
                let rest = spec[open + 1..].trim_end();
                let body = rest
                    .strip_suffix(']')
                    .or_else(|| rest.strip_suffix(')'))
                    .ok_or_else(|| Error::validation(format!("unterminated bounds in '{spec}'")))?;
                let (lo, hi) = body.split_once(',').ok_or_else(|| {
                    Error::validation(format!("bounds in '{spec}' must be 'lower,upper'"))
                })?;
                (spec[..open].trim(), Some((lo.trim(), hi.trim())))
            }
            None => (spec, None),
        };

        let numeric = match name.to_ascii_lowercase().as_str() {
            "byte" => NumericType::Byte,
            "short" => NumericType::Short,
            "int" => NumericType::Int,
            "long" | "integer" => NumericType::Long,
            "float" => NumericType::Float,
            "double" => NumericType::Double,
            _ => return Err(Error::validation(format!("unknown parser type '{name}'"))),
        };
        let full = Self::full_range(numeric);
        let Some((lo, hi)) = bounds else {
            return Ok(full);
        };

        let bad = |b: &str| Error::validation(format!("invalid bound '{b}' in parser '{spec}'"));
        let parsed = match full {
            Self::Integer { .. } => Self::integer(
                lo.parse().map_err(|_| bad(lo))?,
                hi.parse().map_err(|_| bad(hi))?,
            )?,
            Self::Float { .. } => Self::float(
                lo.parse().map_err(|_| bad(lo))?,
                hi.parse().map_err(|_| bad(hi))?,
            )?,
            Self::Double { .. } => Self::double(
                lo.parse().map_err(|_| bad(lo))?,
                hi.parse().map_err(|_| bad(hi))?,
            )?,
        };
        if parsed.lower_bound() < full.lower_bound() || parsed.upper_bound() > full.upper_bound() {
            return Err(Error::validation(format!(
                "bounds of '{spec}' exceed the {numeric} range"
            )));
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_plain_types() {
        assert_eq!("int".parse::<Parser>().unwrap().storage_type(), NumericType::Int);
        assert_eq!("byte".parse::<Parser>().unwrap().storage_type(), NumericType::Byte);
        assert_eq!("long".parse::<Parser>().unwrap().storage_type(), NumericType::Long);
        assert_eq!("float".parse::<Parser>().unwrap().storage_type(), NumericType::Float);
        assert_eq!("double".parse::<Parser>().unwrap().storage_type(), NumericType::Double);
        assert!("decimal".parse::<Parser>().is_err());
    }

    #[test]
    fn test_bounds_narrow_storage() {
        let parser: Parser = "long[0, 1000]".parse().unwrap();
        assert_eq!(parser.storage_type(), NumericType::Short);
        let parser: Parser = "int(0,100)".parse().unwrap();
        assert_eq!(parser.storage_type(), NumericType::Byte);
        let parser: Parser = "double[0,1]".parse().unwrap();
        assert_eq!(parser.storage_type(), NumericType::Double);
    }

    #[test]
    fn test_bounds_outside_type_rejected() {
        assert!("byte[0,300]".parse::<Parser>().is_err());
        assert!("int[5,1]".parse::<Parser>().is_err());
        assert!("int[0".parse::<Parser>().is_err());
        assert!("int[a,b]".parse::<Parser>().is_err());
    }

    #[test]
    fn test_integer_parse() {
        let parser = Parser::integer(0, 100).unwrap();
        assert_eq!(parser.parse("42").unwrap(), Number::Long(42));
        assert_eq!(parser.parse("1e1").unwrap(), Number::Long(10));
        assert!(matches!(parser.parse("7.0").unwrap(), Number::Long(7)));
        assert!(parser.parse("1.5").is_err());
        assert!(parser.parse("101").is_err());
        assert!(parser.parse("abc").is_err());
        assert!(parser.parse("").is_err());
    }

    #[test]
    fn test_float_parse_rounds_to_single() {
        let parser = Parser::full_range(NumericType::Float);
        let Number::Double(v) = parser.parse("0.1").unwrap() else {
            panic!("float parser must produce doubles");
        };
        assert!((v - f64::from(0.1f32)).abs() < f64::EPSILON);
        assert!(parser.parse("1e300").is_err());
    }

    #[test]
    fn test_float_bounds_match_rounded_values() {
        let parser: Parser = "float[0,0.1]".parse().unwrap();
        assert_eq!(parser.storage_type(), NumericType::Float);
        assert_eq!(parser.upper_bound(), Number::Double(f64::from(0.1f32)));
        assert!(parser.parse("0.1").is_ok());
        assert!(parser.parse("0").is_ok());
        assert!(parser.parse("0.2").is_err());
    }

    #[test]
    fn test_double_parse() {
        let parser = Parser::double(0.0, 1.0).unwrap();
        assert_eq!(parser.parse("0.25").unwrap(), Number::Double(0.25));
        assert!(parser.parse("NaN").is_err());
        assert!(parser.parse("1.5").is_err());
        assert_eq!(parser.check(Number::Long(1)).unwrap(), Number::Double(1.0));
    }

    #[test]
    fn test_display_round_trips() {
        let parser = Parser::integer(-3, 9).unwrap();
        assert_eq!(parser.to_string().parse::<Parser>().unwrap(), parser);
    }
}
