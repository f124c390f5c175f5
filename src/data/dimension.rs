//! Dimensions and the compiled dimension set

use super::{Number, NumericType, Parser};
use crate::attribute::{impl_attributable, AttributeCache};
use crate::{Error, Result};
use arrow::datatypes::{Field, Schema, SchemaRef};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// What a dimension measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionType {
    /// Consumed objective function evaluations
    FunctionEvaluations,
    /// Iterations or generations of the algorithm
    AlgorithmSteps,
    /// Finer-grained steps inside one iteration
    AlgorithmSubSteps,
    /// Elapsed CPU time
    CpuRuntime,
    /// CPU time normalized by a machine benchmark
    NormalizedRuntime,
    /// Solution quality on a scale specific to the problem instance
    QualityProblemDependent,
    /// Solution quality normalized across problem instances
    QualityProblemIndependent,
}

impl DimensionType {
    /// All types in declaration order
    pub const ALL: [Self; 7] = [
        Self::FunctionEvaluations,
        Self::AlgorithmSteps,
        Self::AlgorithmSubSteps,
        Self::CpuRuntime,
        Self::NormalizedRuntime,
        Self::QualityProblemDependent,
        Self::QualityProblemIndependent,
    ];

    /// Whether the dimension measures elapsed time or effort
    #[must_use]
    pub const fn is_time_measure(self) -> bool {
        !self.is_solution_quality()
    }

    /// Whether the dimension measures solution quality
    #[must_use]
    pub const fn is_solution_quality(self) -> bool {
        matches!(
            self,
            Self::QualityProblemDependent | Self::QualityProblemIndependent
        )
    }

    /// Kebab-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FunctionEvaluations => "function-evaluations",
            Self::AlgorithmSteps => "algorithm-steps",
            Self::AlgorithmSubSteps => "algorithm-sub-steps",
            Self::CpuRuntime => "cpu-runtime",
            Self::NormalizedRuntime => "normalized-runtime",
            Self::QualityProblemDependent => "quality-problem-dependent",
            Self::QualityProblemIndependent => "quality-problem-independent",
        }
    }
}

impl fmt::Display for DimensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DimensionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| Error::validation(format!("unknown dimension type '{s}'")))
    }
}

/// Monotonicity contract between consecutive points of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionDirection {
    /// Never decreases
    Increasing,
    /// Always increases
    IncreasingStrictly,
    /// Never increases
    Decreasing,
    /// Always decreases
    DecreasingStrictly,
}

impl DimensionDirection {
    /// Whether `next` may follow `previous`.
    #[must_use]
    pub fn accepts(self, previous: Number, next: Number) -> bool {
        match self {
            Self::Increasing => next >= previous,
            Self::IncreasingStrictly => next > previous,
            Self::Decreasing => next <= previous,
            Self::DecreasingStrictly => next < previous,
        }
    }

    /// Whether equal consecutive values are rejected
    #[must_use]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::IncreasingStrictly | Self::DecreasingStrictly)
    }

    /// Whether values grow along a run
    #[must_use]
    pub const fn is_increasing(self) -> bool {
        matches!(self, Self::Increasing | Self::IncreasingStrictly)
    }

    /// Human readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::IncreasingStrictly => "strictly increasing",
            Self::Decreasing => "decreasing",
            Self::DecreasingStrictly => "strictly decreasing",
        }
    }
}

impl fmt::Display for DimensionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DimensionDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "increasing" => Ok(Self::Increasing),
            "strictly increasing" | "increasing strictly" => Ok(Self::IncreasingStrictly),
            "decreasing" => Ok(Self::Decreasing),
            "strictly decreasing" | "decreasing strictly" => Ok(Self::DecreasingStrictly),
            _ => Err(Error::validation(format!("unknown dimension direction '{s}'"))),
        }
    }
}

/// A compiled dimension: one column of every data point.
#[derive(Debug)]
pub struct Dimension {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) dimension_type: DimensionType,
    pub(crate) direction: DimensionDirection,
    pub(crate) parser: Parser,
    pub(crate) storage: NumericType,
    pub(crate) cache: AttributeCache,
}

impl Dimension {
    pub(crate) fn new(
        index: usize,
        name: String,
        description: Option<String>,
        dimension_type: DimensionType,
        direction: DimensionDirection,
        parser: Parser,
        soft_cache_limit: usize,
    ) -> Self {
        Self {
            index,
            name,
            description,
            dimension_type,
            direction,
            storage: parser.storage_type(),
            parser,
            cache: AttributeCache::new(soft_cache_limit),
        }
    }

    /// Column index, equal to the declaration order
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Dimension name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional description
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// What the dimension measures
    #[must_use]
    pub const fn dimension_type(&self) -> DimensionType {
        self.dimension_type
    }

    /// Monotonicity contract
    #[must_use]
    pub const fn direction(&self) -> DimensionDirection {
        self.direction
    }

    /// Value parser with the declared bounds
    #[must_use]
    pub const fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Column storage type, fixed for the whole experiment set
    #[must_use]
    pub const fn storage(&self) -> NumericType {
        self.storage
    }
}

/// Ordered, immutable set of dimensions sharing one column schema.
#[derive(Debug)]
pub struct DimensionSet {
    dimensions: Vec<Dimension>,
    by_name: Vec<usize>,
    schema: SchemaRef,
    pub(crate) cache: AttributeCache,
}

impl DimensionSet {
    /// Compile dimensions (in declaration order) into a set.
    ///
    /// # Errors
    ///
    /// Returns a validation error if there are no dimensions or two share a
    /// name.
    pub(crate) fn compile(dimensions: Vec<Dimension>, soft_cache_limit: usize) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(Error::validation(
                "an experiment set needs at least one dimension",
            ));
        }
        let mut by_name: Vec<usize> = (0..dimensions.len()).collect();
        by_name.sort_by(|&a, &b| dimensions[a].name.cmp(&dimensions[b].name));
        if let Some(pair) = by_name
            .windows(2)
            .find(|w| dimensions[w[0]].name == dimensions[w[1]].name)
        {
            return Err(Error::validation(format!(
                "dimension '{}' declared twice",
                dimensions[pair[0]].name
            )));
        }

        let fields: Vec<Field> = dimensions
            .iter()
            .map(|d| Field::new(d.name.clone(), d.storage.data_type(), false))
            .collect();

        Ok(Self {
            dimensions,
            by_name,
            schema: Arc::new(Schema::new(fields)),
            cache: AttributeCache::new(soft_cache_limit),
        })
    }

    /// Number of dimensions
    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// Always false for a compiled set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Dimensions in column order
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Iterate in column order
    pub fn iter(&self) -> std::slice::Iter<'_, Dimension> {
        self.dimensions.iter()
    }

    /// Dimension at column `index`
    #[must_use]
    pub fn by_index(&self, index: usize) -> Option<&Dimension> {
        self.dimensions.get(index)
    }

    /// Binary search by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Dimension> {
        self.by_name
            .binary_search_by(|&i| self.dimensions[i].name.as_str().cmp(name))
            .ok()
            .map(|pos| &self.dimensions[self.by_name[pos]])
    }

    /// Dimension by name.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if no dimension has this name.
    pub fn get(&self, name: &str) -> Result<&Dimension> {
        self.find(name)
            .ok_or_else(|| Error::lookup("dimension", name))
    }

    /// Arrow schema shared by every run column batch
    #[must_use]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

impl<'a> IntoIterator for &'a DimensionSet {
    type Item = &'a Dimension;
    type IntoIter = std::slice::Iter<'a, Dimension>;

    fn into_iter(self) -> Self::IntoIter {
        self.dimensions.iter()
    }
}

impl_attributable!(Dimension, DimensionSet);
