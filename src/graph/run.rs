//! Runs and data points

use crate::attribute::{impl_attributable, AttributeCache};
use crate::data::{read_value, Dimension, DimensionSet, Number};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Position of a run in the compiled graph.
///
/// All three indices are fixed when the experiment set compiles.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RunId {
    /// Index of the owning experiment
    pub experiment: usize,
    /// Index of the owning instance-run set within its experiment
    pub instance_runs: usize,
    /// Index of the run within its instance-run set
    pub index: usize,
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.experiment, self.instance_runs, self.index)
    }
}

/// One execution of an experiment on an instance: an ordered, monotone
/// sequence of data points stored column-wise.
#[derive(Debug)]
pub struct Run {
    pub(crate) id: RunId,
    pub(crate) dimensions: Arc<DimensionSet>,
    pub(crate) columns: RecordBatch,
    pub(crate) cache: AttributeCache,
}

impl Run {
    pub(crate) fn new(
        dimensions: Arc<DimensionSet>,
        columns: RecordBatch,
        soft_cache_limit: usize,
    ) -> Self {
        Self {
            id: RunId::default(),
            dimensions,
            columns,
            cache: AttributeCache::new(soft_cache_limit),
        }
    }

    /// Position in the compiled graph
    #[must_use]
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// Number of data points
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.num_rows()
    }

    /// Always false for a compiled run
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.num_rows() == 0
    }

    /// Dimension set the columns follow
    #[must_use]
    pub const fn dimensions(&self) -> &Arc<DimensionSet> {
        &self.dimensions
    }

    /// Column batch, one column per dimension
    #[must_use]
    pub const fn columns(&self) -> &RecordBatch {
        &self.columns
    }

    /// Value of point `row` in column `dimension`.
    #[must_use]
    pub fn value(&self, row: usize, dimension: usize) -> Option<Number> {
        let storage = self.dimensions.by_index(dimension)?.storage();
        (row < self.len()).then(|| read_value(&self.columns, storage, row, dimension))
    }

    /// Data point at `row`.
    #[must_use]
    pub fn point(&self, row: usize) -> Option<DataPoint<'_>> {
        (row < self.len()).then_some(DataPoint { run: self, row })
    }

    /// First data point
    #[must_use]
    pub fn first(&self) -> Option<DataPoint<'_>> {
        self.point(0)
    }

    /// Last data point
    #[must_use]
    pub fn last(&self) -> Option<DataPoint<'_>> {
        self.len().checked_sub(1).and_then(|row| self.point(row))
    }

    /// Iterate over the points in order.
    pub fn points(&self) -> impl ExactSizeIterator<Item = DataPoint<'_>> + '_ {
        (0..self.len()).map(move |row| DataPoint { run: self, row })
    }

    /// All values of one column, in point order.
    #[must_use]
    pub fn column_values(&self, dimension: &Dimension) -> Vec<Number> {
        (0..self.len())
            .map(|row| read_value(&self.columns, dimension.storage(), row, dimension.index()))
            .collect()
    }
}

impl_attributable!(Run);

/// A row of a run, viewed across all dimensions.
#[derive(Debug, Clone, Copy)]
pub struct DataPoint<'a> {
    run: &'a Run,
    row: usize,
}

impl<'a> DataPoint<'a> {
    /// Owning run
    #[must_use]
    pub const fn run(&self) -> &'a Run {
        self.run
    }

    /// Position within the run
    #[must_use]
    pub const fn index(&self) -> usize {
        self.row
    }

    /// Number of values (equals the number of dimensions)
    #[must_use]
    pub fn len(&self) -> usize {
        self.run.dimensions.len()
    }

    /// Always false
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.run.dimensions.is_empty()
    }

    /// Value in column `dimension`
    #[must_use]
    pub fn get(&self, dimension: usize) -> Option<Number> {
        self.run.value(self.row, dimension)
    }

    /// All values in column order
    #[must_use]
    pub fn values(&self) -> Vec<Number> {
        self.run
            .dimensions
            .iter()
            .map(|d| read_value(&self.run.columns, d.storage(), self.row, d.index()))
            .collect()
    }
}

impl fmt::Display for DataPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}
