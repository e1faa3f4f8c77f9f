//! Lookup: enumerate every way from one data type to another.
//!
//! The lookup resolves both endpoints to the graph vertices compatible with
//! them, then walks every simple path from a start vertex to a goal vertex.
//! It does not rank anything; picking a winner is the filter chain's job.

use crate::converter::{CompositeConverter, ConverterRef, Transformation};
use crate::data_type::DataType;
use crate::graph::TransformationGraph;
use crate::type_matching::TypeMatchingVertexesFilter;
use petgraph::graph::NodeIndex;
use std::collections::HashSet;
use tracing::trace;

/// Default bound on the number of converters in a candidate chain.
pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 10;

/// Exhaustive path search over a [`TransformationGraph`].
pub struct TransformationGraphLookupStrategy<'a> {
    graph: &'a TransformationGraph,
    max_chain_length: usize,
}

/// State of one depth-first walk.
struct Walk {
    goals: HashSet<NodeIndex>,
    path: Vec<ConverterRef>,
    visited: HashSet<NodeIndex>,
    found: Vec<Transformation>,
}

impl<'a> TransformationGraphLookupStrategy<'a> {
    /// Create a lookup over the given graph.
    pub fn new(graph: &'a TransformationGraph) -> Self {
        Self {
            graph,
            max_chain_length: DEFAULT_MAX_CHAIN_LENGTH,
        }
    }

    /// Set the maximum number of converters in a chain.
    pub fn max_chain_length(mut self, length: usize) -> Self {
        self.max_chain_length = length;
        self
    }

    /// Every transformation from `source` to `target`.
    ///
    /// Walks start at every vertex `source` conforms to, closest first, and
    /// end at the first vertex reached that conforms to `target`. Empty when
    /// either side has no compatible vertex. A walk never ends where it
    /// started without leaving, so a request from a type to itself only
    /// finds chains that come back.
    pub fn lookup_converters(&self, source: &DataType, target: &DataType) -> Vec<Transformation> {
        let starts = self.indices(TypeMatchingVertexesFilter::source_vertices(self.graph, source));
        if starts.is_empty() {
            trace!(%source, %target, "no source vertex");
            return Vec::new();
        }
        let goals: HashSet<NodeIndex> = self
            .indices(TypeMatchingVertexesFilter::target_vertices(self.graph, target))
            .into_iter()
            .collect();
        if goals.is_empty() {
            trace!(%source, %target, "no target vertex");
            return Vec::new();
        }

        let mut walk = Walk {
            goals,
            path: Vec::new(),
            visited: HashSet::new(),
            found: Vec::new(),
        };
        for start in starts {
            walk.visited.insert(start);
            self.walk_from(start, &mut walk);
            walk.visited.remove(&start);
        }

        trace!(%source, %target, candidates = walk.found.len(), "lookup finished");
        walk.found
    }

    fn indices(&self, vertices: Vec<&DataType>) -> Vec<NodeIndex> {
        vertices
            .into_iter()
            .filter_map(|vertex| self.graph.index_of(vertex))
            .collect()
    }

    fn walk_from(&self, node: NodeIndex, walk: &mut Walk) {
        if walk.path.len() >= self.max_chain_length {
            return;
        }

        for (next, converter) in self.graph.outgoing(node) {
            walk.path.push(converter.clone());

            if walk.goals.contains(&next) {
                let found = Self::transformation(&walk.path);
                // A converter with several compatible sources shows up once per start.
                if !walk.found.iter().any(|seen| seen.is_same(&found)) {
                    walk.found.push(found);
                }
            } else if walk.visited.insert(next) {
                self.walk_from(next, walk);
                walk.visited.remove(&next);
            }

            walk.path.pop();
        }
    }

    fn transformation(path: &[ConverterRef]) -> Transformation {
        match path {
            [single] => Transformation::Direct(single.clone()),
            chain => Transformation::Composite(CompositeConverter::from_path(chain.to_vec())),
        }
    }
}
