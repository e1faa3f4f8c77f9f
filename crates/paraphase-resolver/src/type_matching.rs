//! Compatibility matching between requested data types and graph vertices.
//!
//! A request rarely names a type exactly as a converter declared it. The
//! source side may fall back to a more general vertex: a UTF-8 string can be
//! fed to a converter taking any string. The target side may only fall back
//! to a more specific vertex: a converter producing a string of unknown
//! charset cannot satisfy a request for UTF-8.

use crate::converter::Transformation;
use crate::data_type::DataType;
use crate::filter::ConverterFilter;
use crate::graph::TransformationGraph;
use std::cmp::Reverse;

/// Resolves requested types to graph vertices, and ranks candidates by how
/// closely their declared types match a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeMatchingVertexesFilter;

/// How closely a candidate's declared types fit a request. Higher is closer.
///
/// Exact matches count first (2 per side, 1 for a compatible side). Then
/// the most specific declared source wins, then the least specific declared
/// target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchRank {
    exactness: u8,
    source_specificity: usize,
    target_generality: Reverse<usize>,
}

impl TypeMatchingVertexesFilter {
    /// Vertices a search may start from, closest first.
    ///
    /// Every vertex that `source` conforms to: the exact vertex if present,
    /// then more general stand-ins from most to least specific. Ties keep
    /// the order vertices were added.
    pub fn source_vertices<'g>(
        graph: &'g TransformationGraph,
        source: &DataType,
    ) -> Vec<&'g DataType> {
        let mut found: Vec<&DataType> = graph
            .vertices()
            .filter(|vertex| source.conforms_to(vertex))
            .collect();
        found.sort_by_key(|vertex| Reverse((*vertex == source, vertex.specificity())));
        found
    }

    /// Vertices a search may end at, closest first.
    ///
    /// Every vertex that conforms to `target`, so never anything less
    /// specific than requested.
    pub fn target_vertices<'g>(
        graph: &'g TransformationGraph,
        target: &DataType,
    ) -> Vec<&'g DataType> {
        let mut found: Vec<&DataType> = graph
            .vertices()
            .filter(|vertex| vertex.conforms_to(target))
            .collect();
        found.sort_by_key(|vertex| (*vertex != target, vertex.specificity()));
        found
    }

    /// Rank how well a candidate's own declaration fits the request.
    pub fn match_rank(candidate: &Transformation, source: &DataType, target: &DataType) -> MatchRank {
        let decl = candidate.decl();

        let (source_score, source_specificity) = if decl.source_types.contains(source) {
            (2, source.specificity())
        } else {
            decl.source_types
                .iter()
                .filter(|declared| source.conforms_to(declared))
                .map(DataType::specificity)
                .max()
                .map_or((0, 0), |specificity| (1, specificity))
        };

        let target_score = if decl.target_type == *target {
            2
        } else if decl.target_type.conforms_to(target) {
            1
        } else {
            0
        };

        MatchRank {
            exactness: source_score + target_score,
            source_specificity,
            target_generality: Reverse(decl.target_type.specificity()),
        }
    }
}

impl ConverterFilter for TypeMatchingVertexesFilter {
    fn filter(
        &self,
        candidates: Vec<Transformation>,
        source: &DataType,
        target: &DataType,
    ) -> Vec<Transformation> {
        if candidates.len() <= 1 {
            return candidates;
        }

        let Some(best) = candidates
            .iter()
            .map(|c| Self::match_rank(c, source, target))
            .max()
        else {
            return candidates;
        };

        candidates
            .into_iter()
            .filter(|c| Self::match_rank(c, source, target) == best)
            .collect()
    }
}
