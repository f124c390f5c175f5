//! Numeric data factory
//!
//! Turns textual, numeric or JSON data points into validated rows and packs
//! finished runs into columnar arrow batches in the storage types the
//! dimension set fixed at compile time.

use super::{DimensionSet, Number, NumericType};
use crate::{Error, Result};
use arrow::array::{
    ArrayRef, AsArray, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array, Int8Array,
};
use arrow::datatypes::{Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Validates and packs data points for one dimension set.
#[derive(Debug, Clone)]
pub struct DataFactory {
    dimensions: Arc<DimensionSet>,
}

impl DataFactory {
    /// Create a factory for `dimensions`.
    #[must_use]
    pub const fn new(dimensions: Arc<DimensionSet>) -> Self {
        Self { dimensions }
    }

    /// The dimension set points are validated against
    #[must_use]
    pub const fn dimensions(&self) -> &Arc<DimensionSet> {
        &self.dimensions
    }

    /// Parse a textual point such as `"10 20"`, `"10,20"` or `"10; 20"`.
    ///
    /// # Errors
    ///
    /// Returns a validation error on a wrong value count or any value its
    /// dimension's parser rejects.
    pub fn parse_point(&self, text: &str) -> Result<Vec<Number>> {
        let tokens: Vec<&str> = text
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|t| !t.is_empty())
            .collect();
        self.check_arity(tokens.len(), text)?;
        self.dimensions
            .iter()
            .zip(tokens)
            .map(|(dimension, token)| {
                dimension.parser().parse(token).map_err(|e| {
                    Error::validation(format!("dimension '{}': {e}", dimension.name()))
                })
            })
            .collect()
    }

    /// Validate an already numeric point.
    ///
    /// # Errors
    ///
    /// Returns a validation error on a wrong value count or any value its
    /// dimension's parser rejects.
    pub fn check_point(&self, values: &[Number]) -> Result<Vec<Number>> {
        self.check_arity(values.len(), "numeric point")?;
        self.dimensions
            .iter()
            .zip(values)
            .map(|(dimension, &value)| {
                dimension.parser().check(value).map_err(|e| {
                    Error::validation(format!("dimension '{}': {e}", dimension.name()))
                })
            })
            .collect()
    }

    /// Read a point from JSON: an array in column order, or an object keyed
    /// by dimension name. Numbers may be given as JSON numbers or strings.
    ///
    /// # Errors
    ///
    /// Returns a validation error for other JSON shapes, missing or unknown
    /// dimension keys, and values the parsers reject.
    pub fn point_from_json(&self, value: &serde_json::Value) -> Result<Vec<Number>> {
        use serde_json::Value;

        let cells: Vec<&Value> = match value {
            Value::Array(items) => {
                self.check_arity(items.len(), &value.to_string())?;
                items.iter().collect()
            }
            Value::Object(map) => {
                if let Some(unknown) = map.keys().find(|k| self.dimensions.find(k).is_none()) {
                    return Err(Error::lookup("dimension", unknown.as_str()));
                }
                self.dimensions
                    .iter()
                    .map(|d| {
                        map.get(d.name()).ok_or_else(|| {
                            Error::validation(format!(
                                "data point {value} has no value for dimension '{}'",
                                d.name()
                            ))
                        })
                    })
                    .collect::<Result<_>>()?
            }
            other => {
                return Err(Error::validation(format!(
                    "a data point must be a JSON array or object, got {other}"
                )))
            }
        };

        self.dimensions
            .iter()
            .zip(cells)
            .map(|(dimension, cell)| {
                let parsed = match cell {
                    Value::Number(n) => match n.as_i64() {
                        Some(v) => dimension.parser().check(Number::Long(v)),
                        None => dimension
                            .parser()
                            .parse(&n.to_string()),
                    },
                    Value::String(s) => dimension.parser().parse(s),
                    other => Err(Error::validation(format!("{other} is not a number"))),
                };
                parsed.map_err(|e| {
                    Error::validation(format!("dimension '{}': {e}", dimension.name()))
                })
            })
            .collect()
    }

    /// Check a point against per-instance bound overrides (indexed by column).
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first dimension out of bounds.
    pub fn check_bounds(
        &self,
        point: &[Number],
        lower: &[Option<Number>],
        upper: &[Option<Number>],
    ) -> Result<()> {
        for (dimension, &value) in self.dimensions.iter().zip(point) {
            let i = dimension.index();
            if let Some(bound) = lower.get(i).copied().flatten() {
                if value < bound {
                    return Err(Error::validation(format!(
                        "value {value} of dimension '{}' is below the instance lower bound {bound}",
                        dimension.name()
                    )));
                }
            }
            if let Some(bound) = upper.get(i).copied().flatten() {
                if value > bound {
                    return Err(Error::validation(format!(
                        "value {value} of dimension '{}' is above the instance upper bound {bound}",
                        dimension.name()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check that `next` (the point at `index`) may follow `previous` in every
    /// dimension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Monotonicity`] naming the first violated dimension.
    pub fn check_successor(&self, previous: &[Number], next: &[Number], index: usize) -> Result<()> {
        for ((dimension, &before), &after) in self.dimensions.iter().zip(previous).zip(next) {
            if !dimension.direction().accepts(before, after) {
                return Err(Error::Monotonicity {
                    dimension: dimension.name().to_string(),
                    direction: dimension.direction().to_string(),
                    index,
                    previous: before.to_string(),
                    next: after.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Drop interior points whose solution-quality values equal those of the
    /// preceding kept point. First and last points always survive; without
    /// any solution-quality dimension nothing is dropped.
    #[must_use]
    pub fn prune_redundant(&self, points: Vec<Vec<Number>>) -> Vec<Vec<Number>> {
        let quality: Vec<usize> = self
            .dimensions
            .iter()
            .filter(|d| d.dimension_type().is_solution_quality())
            .map(super::Dimension::index)
            .collect();
        if quality.is_empty() || points.len() <= 2 {
            return points;
        }

        let last = points.len() - 1;
        let mut kept: Vec<Vec<Number>> = Vec::with_capacity(points.len());
        for (i, point) in points.into_iter().enumerate() {
            let redundant = i != last
                && kept
                    .last()
                    .is_some_and(|prev| quality.iter().all(|&q| prev[q] == point[q]));
            if !redundant {
                kept.push(point);
            }
        }
        kept
    }

    /// Pack validated points into one column batch.
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not fit its column type (which the
    /// parsers rule out) or arrow rejects the batch.
    pub fn build_columns(&self, points: &[Vec<Number>]) -> Result<RecordBatch> {
        let columns = self
            .dimensions
            .iter()
            .map(|dimension| {
                let column = points.iter().map(|p| p[dimension.index()]);
                build_column(dimension.storage(), column)
                    .map_err(|e| Error::Other(format!("dimension '{}': {e}", dimension.name())))
            })
            .collect::<Result<Vec<ArrayRef>>>()?;
        Ok(RecordBatch::try_new(Arc::clone(self.dimensions.schema()), columns)?)
    }

    fn check_arity(&self, found: usize, source: &str) -> Result<()> {
        if found == self.dimensions.len() {
            return Ok(());
        }
        Err(Error::validation(format!(
            "data point '{source}' has {found} values, expected {}",
            self.dimensions.len()
        )))
    }
}

fn integral(value: Number) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| Error::Other(format!("{value} is not integral")))
}

fn narrow<T: TryFrom<i64>>(value: Number, storage: NumericType) -> Result<T> {
    T::try_from(integral(value)?)
        .map_err(|_| Error::Other(format!("{value} does not fit {storage}")))
}

#[allow(clippy::cast_possible_truncation)]
fn build_column(
    storage: NumericType,
    values: impl Iterator<Item = Number>,
) -> Result<ArrayRef> {
    Ok(match storage {
        NumericType::Byte => Arc::new(Int8Array::from(
            values.map(|v| narrow::<i8>(v, storage)).collect::<Result<Vec<_>>>()?,
        )),
        NumericType::Short => Arc::new(Int16Array::from(
            values.map(|v| narrow::<i16>(v, storage)).collect::<Result<Vec<_>>>()?,
        )),
        NumericType::Int => Arc::new(Int32Array::from(
            values.map(|v| narrow::<i32>(v, storage)).collect::<Result<Vec<_>>>()?,
        )),
        NumericType::Long => Arc::new(Int64Array::from(
            values.map(integral).collect::<Result<Vec<_>>>()?,
        )),
        NumericType::Float => Arc::new(Float32Array::from(
            values.map(|v| v.as_f64() as f32).collect::<Vec<_>>(),
        )),
        NumericType::Double => Arc::new(Float64Array::from(
            values.map(Number::as_f64).collect::<Vec<_>>(),
        )),
    })
}

/// Read one cell back as a [`Number`].
pub(crate) fn read_value(batch: &RecordBatch, storage: NumericType, row: usize, column: usize) -> Number {
    let array = batch.column(column);
    match storage {
        NumericType::Byte => Number::Long(i64::from(array.as_primitive::<Int8Type>().value(row))),
        NumericType::Short => Number::Long(i64::from(array.as_primitive::<Int16Type>().value(row))),
        NumericType::Int => Number::Long(i64::from(array.as_primitive::<Int32Type>().value(row))),
        NumericType::Long => Number::Long(array.as_primitive::<Int64Type>().value(row)),
        NumericType::Float => {
            Number::Double(f64::from(array.as_primitive::<Float32Type>().value(row)))
        }
        NumericType::Double => Number::Double(array.as_primitive::<Float64Type>().value(row)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dimension, DimensionDirection, DimensionType};
    use arrow::array::Array;
    use serde_json::json;

    fn factory() -> DataFactory {
        let dims = vec![
            Dimension::new(
                0,
                "fes".to_string(),
                None,
                DimensionType::FunctionEvaluations,
                DimensionDirection::IncreasingStrictly,
                "int[0,100]".parse().unwrap(),
                8,
            ),
            Dimension::new(
                1,
                "best".to_string(),
                None,
                DimensionType::QualityProblemDependent,
                DimensionDirection::Decreasing,
                "double".parse().unwrap(),
                8,
            ),
        ];
        DataFactory::new(Arc::new(DimensionSet::compile(dims, 8).unwrap()))
    }

    fn point(a: i64, b: f64) -> Vec<Number> {
        vec![Number::Long(a), Number::Double(b)]
    }

    #[test]
    fn test_parse_point_separators() {
        let f = factory();
        assert_eq!(f.parse_point("10 20").unwrap(), point(10, 20.0));
        assert_eq!(f.parse_point(" 10,\t20.5 ").unwrap(), point(10, 20.5));
        assert_eq!(f.parse_point("10;20").unwrap(), point(10, 20.0));
        assert!(f.parse_point("10").is_err());
        assert!(f.parse_point("10 20 30").is_err());
        let err = f.parse_point("200 1").unwrap_err();
        assert!(err.to_string().contains("fes"));
    }

    #[test]
    fn test_point_from_json() {
        let f = factory();
        assert_eq!(f.point_from_json(&json!([3, 1.5])).unwrap(), point(3, 1.5));
        assert_eq!(
            f.point_from_json(&json!({"best": "2", "fes": 4})).unwrap(),
            point(4, 2.0)
        );
        assert!(f.point_from_json(&json!({"fes": 4})).is_err());
        assert_eq!(
            f.point_from_json(&json!({"fes": 4, "best": 1, "time": 2}))
                .unwrap_err()
                .kind(),
            crate::ErrorKind::Lookup
        );
        assert!(f.point_from_json(&json!("4 1")).is_err());
        assert!(f.point_from_json(&json!([4, true])).is_err());
    }

    #[test]
    fn test_check_successor_names_dimension() {
        let f = factory();
        f.check_successor(&point(1, 5.0), &point(2, 5.0), 1).unwrap();
        let err = f.check_successor(&point(2, 5.0), &point(2, 4.0), 7).unwrap_err();
        match err {
            Error::Monotonicity {
                dimension, index, ..
            } => {
                assert_eq!(dimension, "fes");
                assert_eq!(index, 7);
            }
            other => panic!("unexpected error {other}"),
        }
        let err = f.check_successor(&point(2, 5.0), &point(3, 6.0), 1).unwrap_err();
        assert!(err.to_string().contains("best"));
    }

    #[test]
    fn test_check_bounds() {
        let f = factory();
        let lower = [Some(Number::Long(5)), None];
        let upper = [None, Some(Number::Double(10.0))];
        f.check_bounds(&point(5, 10.0), &lower, &upper).unwrap();
        assert!(f.check_bounds(&point(4, 1.0), &lower, &upper).is_err());
        assert!(f.check_bounds(&point(6, 10.5), &lower, &upper).is_err());
        f.check_bounds(&point(0, 100.0), &[], &[]).unwrap();
    }

    #[test]
    fn test_prune_keeps_improvements_and_last() {
        let f = factory();
        let pruned = f.prune_redundant(vec![
            point(1, 9.0),
            point(2, 9.0),
            point(3, 7.0),
            point(4, 7.0),
            point(5, 7.0),
        ]);
        assert_eq!(pruned, vec![point(1, 9.0), point(3, 7.0), point(5, 7.0)]);
    }

    #[test]
    fn test_build_and_read_columns() {
        let f = factory();
        let batch = f
            .build_columns(&[point(10, 20.0), point(11, 19.0)])
            .unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.column(0).len(), 2);
        assert_eq!(read_value(&batch, NumericType::Byte, 1, 0), Number::Long(11));
        assert_eq!(read_value(&batch, NumericType::Double, 0, 1), Number::Double(20.0));
    }
}
