//! Tie-break filters over candidate transformations.
//!
//! A lookup usually finds several ways to get from one type to another.
//! Filters narrow the candidates one criterion at a time; the composite
//! filter chains them and stops as soon as a single candidate is left.

use crate::converter::Transformation;
use crate::data_type::DataType;
use crate::type_matching::TypeMatchingVertexesFilter;

/// A pure narrowing step over candidate transformations.
///
/// Implementations keep the relative order of the candidates they retain.
pub trait ConverterFilter: Send + Sync {
    fn filter(
        &self,
        candidates: Vec<Transformation>,
        source: &DataType,
        target: &DataType,
    ) -> Vec<Transformation>;
}

/// Keep the candidates with the fewest converters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformationLengthConverterFilter;

impl ConverterFilter for TransformationLengthConverterFilter {
    fn filter(
        &self,
        candidates: Vec<Transformation>,
        _source: &DataType,
        _target: &DataType,
    ) -> Vec<Transformation> {
        let Some(shortest) = candidates.iter().map(Transformation::chain_length).min() else {
            return candidates;
        };
        candidates
            .into_iter()
            .filter(|c| c.chain_length() == shortest)
            .collect()
    }
}

/// Keep the candidates with the highest weighting (summed over chains).
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityWeightingConverterFilter;

impl ConverterFilter for PriorityWeightingConverterFilter {
    fn filter(
        &self,
        candidates: Vec<Transformation>,
        _source: &DataType,
        _target: &DataType,
    ) -> Vec<Transformation> {
        let Some(heaviest) = candidates.iter().map(Transformation::weighting).max() else {
            return candidates;
        };
        candidates
            .into_iter()
            .filter(|c| c.weighting() == heaviest)
            .collect()
    }
}

/// Keep the candidates whose canonical name sorts first.
///
/// Names are compared converter by converter, so for chains the first hop
/// decides first. Distinct candidates sharing the minimal name all survive;
/// telling them apart is left to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameConverterFilter;

impl ConverterFilter for NameConverterFilter {
    fn filter(
        &self,
        candidates: Vec<Transformation>,
        _source: &DataType,
        _target: &DataType,
    ) -> Vec<Transformation> {
        let Some(first) = candidates
            .iter()
            .map(|c| c.canonical_name())
            .min()
            .map(|name| name.into_iter().map(str::to_owned).collect::<Vec<_>>())
        else {
            return candidates;
        };
        candidates
            .into_iter()
            .filter(|c| c.canonical_name() == first)
            .collect()
    }
}

/// Applies filters in order until at most one candidate remains.
pub struct CompositeConverterFilter {
    filters: Vec<Box<dyn ConverterFilter>>,
}

impl CompositeConverterFilter {
    /// Chain custom filters, applied in the given order.
    pub fn new(filters: Vec<Box<dyn ConverterFilter>>) -> Self {
        Self { filters }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for CompositeConverterFilter {
    /// Shortest chain, then highest weighting, then closest declared types,
    /// then name.
    fn default() -> Self {
        Self::new(vec![
            Box::new(TransformationLengthConverterFilter),
            Box::new(PriorityWeightingConverterFilter),
            Box::new(TypeMatchingVertexesFilter),
            Box::new(NameConverterFilter),
        ])
    }
}

impl ConverterFilter for CompositeConverterFilter {
    fn filter(
        &self,
        mut candidates: Vec<Transformation>,
        source: &DataType,
        target: &DataType,
    ) -> Vec<Transformation> {
        for filter in &self.filters {
            if candidates.len() <= 1 {
                break;
            }
            candidates = filter.filter(candidates, source, target);
        }
        candidates
    }
}

impl std::fmt::Debug for CompositeConverterFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeConverterFilter")
            .field("filters", &self.filters.len())
            .finish()
    }
}
