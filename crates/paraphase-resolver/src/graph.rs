//! Transformation graph: data types connected by converters.
//!
//! Vertices are data types, edges are converters. A converter accepting N
//! source types contributes N edges, all labelled with the same converter.
//! Parallel edges between the same pair of types are kept: two converters
//! from XML to JSON are two edges, whatever their names.

use crate::converter::{ConverterRef, RegistrationError, same_converter};
use crate::data_type::DataType;
use indexmap::{IndexMap, IndexSet};
use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use tracing::debug;

/// An edge of the graph: one converter applied to one of its source types.
#[derive(Debug, Clone)]
pub struct TransformationEdge {
    pub source: DataType,
    pub target: DataType,
    pub converter: ConverterRef,
}

/// Directed multigraph of data types linked by converters.
///
/// Uses petgraph's `StableDiGraph` so removing converters never invalidates
/// the indices of unrelated vertices, plus an insertion-ordered index so
/// vertex scans are deterministic.
#[derive(Debug, Clone, Default)]
pub struct TransformationGraph {
    graph: StableDiGraph<DataType, ConverterRef>,
    vertices: IndexMap<DataType, NodeIndex>,
}

impl TransformationGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a converter, creating any missing vertices.
    ///
    /// Returns `false` if this converter instance was already present.
    pub fn add_converter(&mut self, converter: &ConverterRef) -> Result<bool, RegistrationError> {
        let decl = converter.decl();
        decl.validate()?;

        if self.contains_converter(converter) {
            return Ok(false);
        }

        let target = self.ensure_vertex(&decl.target_type);
        let sources: IndexSet<&DataType> = decl.source_types.iter().collect();
        for source_type in &sources {
            let source = self.ensure_vertex(source_type);
            self.graph.add_edge(source, target, converter.clone());
        }

        debug!(
            converter = %decl.name,
            target = %decl.target_type,
            edges = sources.len(),
            "added converter to transformation graph"
        );
        Ok(true)
    }

    /// Remove every edge labelled with this converter instance, then drop
    /// vertices left without edges.
    ///
    /// Returns `false` if the converter was never added.
    pub fn remove_converter(&mut self, converter: &ConverterRef) -> bool {
        let edges: Vec<EdgeIndex> = self
            .graph
            .edge_indices()
            .filter(|&edge| {
                self.graph
                    .edge_weight(edge)
                    .is_some_and(|label| same_converter(label, converter))
            })
            .collect();

        if edges.is_empty() {
            return false;
        }

        let mut touched = IndexSet::new();
        for edge in &edges {
            if let Some((source, target)) = self.graph.edge_endpoints(*edge) {
                touched.insert(source);
                touched.insert(target);
            }
            self.graph.remove_edge(*edge);
        }

        for index in touched {
            if self.is_isolated(index) {
                if let Some(data_type) = self.graph.remove_node(index) {
                    self.vertices.shift_remove(&data_type);
                }
            }
        }

        debug!(
            converter = %converter.decl().name,
            edges = edges.len(),
            "removed converter from transformation graph"
        );
        true
    }

    /// Check if this converter instance labels any edge.
    pub fn contains_converter(&self, converter: &ConverterRef) -> bool {
        converter
            .decl()
            .source_types
            .iter()
            .filter_map(|source| self.vertices.get(source))
            .any(|&index| {
                self.graph
                    .edges_directed(index, Direction::Outgoing)
                    .any(|edge| same_converter(edge.weight(), converter))
            })
    }

    /// All vertices, in the order they were first added.
    pub fn vertices(&self) -> impl Iterator<Item = &DataType> {
        self.vertices.keys()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains_vertex(&self, data_type: &DataType) -> bool {
        self.vertices.contains_key(data_type)
    }

    /// Check if at least one converter leads directly from `source` to `target`.
    pub fn contains_edge(&self, source: &DataType, target: &DataType) -> bool {
        match (self.vertices.get(source), self.vertices.get(target)) {
            (Some(&source), Some(&target)) => self.graph.find_edge(source, target).is_some(),
            _ => false,
        }
    }

    /// Edges leaving `data_type`.
    pub fn edges_from(&self, data_type: &DataType) -> Vec<TransformationEdge> {
        let Some(&index) = self.vertices.get(data_type) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .filter_map(|edge| self.edge_at(edge.id()))
            .collect()
    }

    /// Edges entering or leaving `data_type`. Self-loops appear once.
    pub fn edges_of(&self, data_type: &DataType) -> Vec<TransformationEdge> {
        let Some(&index) = self.vertices.get(data_type) else {
            return Vec::new();
        };
        let ids: IndexSet<EdgeIndex> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .chain(self.graph.edges_directed(index, Direction::Incoming))
            .map(|edge| edge.id())
            .collect();
        ids.into_iter().filter_map(|id| self.edge_at(id)).collect()
    }

    /// Every edge of the graph.
    pub fn edges(&self) -> Vec<TransformationEdge> {
        self.graph
            .edge_indices()
            .filter_map(|id| self.edge_at(id))
            .collect()
    }

    /// The graph's own copy of a vertex equal to `data_type`.
    pub fn vertex(&self, data_type: &DataType) -> Option<&DataType> {
        self.vertices.get_key_value(data_type).map(|(vertex, _)| vertex)
    }

    pub(crate) fn index_of(&self, data_type: &DataType) -> Option<NodeIndex> {
        self.vertices.get(data_type).copied()
    }

    /// Outgoing edges of a vertex as `(next vertex, converter)`.
    pub(crate) fn outgoing(
        &self,
        index: NodeIndex,
    ) -> impl Iterator<Item = (NodeIndex, &ConverterRef)> {
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (edge.target(), edge.weight()))
    }

    fn ensure_vertex(&mut self, data_type: &DataType) -> NodeIndex {
        if let Some(&index) = self.vertices.get(data_type) {
            return index;
        }
        let index = self.graph.add_node(data_type.clone());
        self.vertices.insert(data_type.clone(), index);
        index
    }

    fn is_isolated(&self, index: NodeIndex) -> bool {
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .next()
            .is_none()
            && self
                .graph
                .edges_directed(index, Direction::Incoming)
                .next()
                .is_none()
    }

    fn edge_at(&self, id: EdgeIndex) -> Option<TransformationEdge> {
        let (source, target) = self.graph.edge_endpoints(id)?;
        Some(TransformationEdge {
            source: self.graph.node_weight(source)?.clone(),
            target: self.graph.node_weight(target)?.clone(),
            converter: self.graph.edge_weight(id)?.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ConverterDecl, DeclaredConverter};

    fn xml() -> DataType {
        DataType::of("Xml")
    }

    fn json() -> DataType {
        DataType::of("Json")
    }

    fn input_stream() -> DataType {
        DataType::of("InputStream")
    }

    fn converter(from: &[DataType], to: DataType) -> ConverterRef {
        let decl = from
            .iter()
            .cloned()
            .fold(ConverterDecl::new("", to), ConverterDecl::source);
        DeclaredConverter::new(decl).into_ref()
    }

    fn has_converter(edges: &[TransformationEdge], converter: &ConverterRef) -> bool {
        edges.iter().any(|e| same_converter(&e.converter, converter))
    }

    #[test]
    fn test_add_converter() {
        let xml_to_json = converter(&[xml()], json());
        let mut graph = TransformationGraph::new();

        assert_eq!(graph.add_converter(&xml_to_json), Ok(true));

        assert_eq!(graph.vertex_count(), 2);
        assert!(graph.contains_vertex(&xml()));
        assert!(graph.contains_vertex(&json()));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains_edge(&xml(), &json()));
        assert!(!graph.contains_edge(&json(), &xml()));
    }

    #[test]
    fn test_add_converter_twice_is_noop() {
        let xml_to_json = converter(&[xml()], json());
        let mut graph = TransformationGraph::new();

        graph.add_converter(&xml_to_json).unwrap();
        assert_eq!(graph.add_converter(&xml_to_json), Ok(false));

        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_add_converter_with_multiple_sources() {
        let to_json = converter(&[xml(), input_stream()], json());
        let mut graph = TransformationGraph::new();
        graph.add_converter(&to_json).unwrap();

        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains_edge(&xml(), &json()));
        assert!(graph.contains_edge(&input_stream(), &json()));
        assert!(!graph.contains_edge(&json(), &input_stream()));
    }

    #[test]
    fn test_duplicate_source_types_yield_one_edge() {
        let to_json = converter(&[xml(), xml()], json());
        let mut graph = TransformationGraph::new();
        graph.add_converter(&to_json).unwrap();

        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_add_converter_without_sources_fails() {
        let broken = DeclaredConverter::new(ConverterDecl::new("broken", json())).into_ref();
        let mut graph = TransformationGraph::new();

        assert!(graph.add_converter(&broken).is_err());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_remove_converter() {
        let xml_to_json = converter(&[xml()], json());
        let mut graph = TransformationGraph::new();
        graph.add_converter(&xml_to_json).unwrap();

        assert!(graph.remove_converter(&xml_to_json));

        assert_eq!(graph.vertex_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_remove_converter_with_multiple_sources() {
        let to_json = converter(&[xml(), input_stream()], json());
        let mut graph = TransformationGraph::new();
        graph.add_converter(&to_json).unwrap();
        graph.remove_converter(&to_json);

        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_remove_unknown_converter_is_noop() {
        let xml_to_json = converter(&[xml()], json());
        let lookalike = converter(&[xml()], json());
        let mut graph = TransformationGraph::new();
        graph.add_converter(&xml_to_json).unwrap();

        assert!(!graph.remove_converter(&lookalike));

        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains_edge(&xml(), &json()));
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        let xml_to_json = converter(&[xml()], json());
        let better_xml_to_json = converter(&[xml()], json());
        let mut graph = TransformationGraph::new();
        graph.add_converter(&xml_to_json).unwrap();
        graph.add_converter(&better_xml_to_json).unwrap();

        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.edge_count(), 2);

        let edges = graph.edges_of(&json());
        assert!(has_converter(&edges, &xml_to_json));
        assert!(has_converter(&edges, &better_xml_to_json));
    }

    #[test]
    fn test_remove_one_of_parallel_edges() {
        let first = converter(&[xml()], json());
        let second = converter(&[xml()], json());

        for (removed, kept) in [(&first, &second), (&second, &first)] {
            let mut graph = TransformationGraph::new();
            graph.add_converter(&first).unwrap();
            graph.add_converter(&second).unwrap();

            graph.remove_converter(removed);

            assert_eq!(graph.vertex_count(), 2);
            let edges = graph.edges_of(&json());
            assert_eq!(edges.len(), 1);
            assert!(has_converter(&edges, kept));
        }
    }

    #[test]
    fn test_remove_prunes_only_isolated_vertices() {
        let xml_to_json = converter(&[xml()], json());
        let stream_to_json = converter(&[input_stream()], json());
        let mut graph = TransformationGraph::new();
        graph.add_converter(&xml_to_json).unwrap();
        graph.add_converter(&stream_to_json).unwrap();

        graph.remove_converter(&xml_to_json);

        assert_eq!(graph.vertex_count(), 2);
        assert!(!graph.contains_vertex(&xml()));
        assert!(graph.contains_vertex(&json()));
        assert!(graph.contains_edge(&input_stream(), &json()));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_edges_from() {
        let xml_to_json = converter(&[xml()], json());
        let json_to_xml = converter(&[json()], xml());
        let mut graph = TransformationGraph::new();
        graph.add_converter(&xml_to_json).unwrap();
        graph.add_converter(&json_to_xml).unwrap();

        let edges = graph.edges_from(&xml());
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, json());
        assert!(same_converter(&edges[0].converter, &xml_to_json));

        assert_eq!(graph.edges_of(&xml()).len(), 2);
        assert!(graph.edges_from(&input_stream()).is_empty());
    }

    #[test]
    fn test_vertices_keep_insertion_order() {
        let mut graph = TransformationGraph::new();
        graph.add_converter(&converter(&[xml()], json())).unwrap();
        graph.add_converter(&converter(&[input_stream()], xml())).unwrap();

        let vertices: Vec<_> = graph.vertices().cloned().collect();
        assert_eq!(vertices, vec![json(), xml(), input_stream()]);
    }
}
