//! Thread-safe wrapper around [`TransformationGraph`].

use crate::converter::{ConverterRef, RegistrationError};
use crate::data_type::DataType;
use crate::graph::{TransformationEdge, TransformationGraph};
use parking_lot::{RwLock, RwLockReadGuard};

/// A [`TransformationGraph`] shared between threads.
///
/// Mutations take the write lock, queries the read lock. A path search
/// holds the guard from [`SynchronizedTransformationGraph::read`] for its
/// whole traversal, so it sees the graph either before or after a concurrent
/// mutation, never halfway through one. There is no isolation across
/// separate calls.
#[derive(Debug, Default)]
pub struct SynchronizedTransformationGraph {
    inner: RwLock<TransformationGraph>,
}

impl SynchronizedTransformationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_converter(&self, converter: &ConverterRef) -> Result<bool, RegistrationError> {
        self.inner.write().add_converter(converter)
    }

    pub fn remove_converter(&self, converter: &ConverterRef) -> bool {
        self.inner.write().remove_converter(converter)
    }

    /// Lock the graph for a multi-step read such as a path search.
    pub fn read(&self) -> RwLockReadGuard<'_, TransformationGraph> {
        self.inner.read()
    }

    /// Copy of the current graph.
    pub fn snapshot(&self) -> TransformationGraph {
        self.inner.read().clone()
    }

    pub fn vertices(&self) -> Vec<DataType> {
        self.inner.read().vertices().cloned().collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.read().vertex_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().edge_count()
    }

    pub fn contains_vertex(&self, data_type: &DataType) -> bool {
        self.inner.read().contains_vertex(data_type)
    }

    pub fn contains_edge(&self, source: &DataType, target: &DataType) -> bool {
        self.inner.read().contains_edge(source, target)
    }

    pub fn contains_converter(&self, converter: &ConverterRef) -> bool {
        self.inner.read().contains_converter(converter)
    }

    pub fn edges_from(&self, data_type: &DataType) -> Vec<TransformationEdge> {
        self.inner.read().edges_from(data_type)
    }

    pub fn edges_of(&self, data_type: &DataType) -> Vec<TransformationEdge> {
        self.inner.read().edges_of(data_type)
    }
}

impl From<TransformationGraph> for SynchronizedTransformationGraph {
    fn from(graph: TransformationGraph) -> Self {
        Self {
            inner: RwLock::new(graph),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ConverterDecl, DeclaredConverter};
    use std::sync::Arc;
    use std::thread;

    fn converter(name: String, from: DataType, to: DataType) -> ConverterRef {
        DeclaredConverter::new(ConverterDecl::simple(name, from, to)).into_ref()
    }

    #[test]
    fn test_concurrent_mutation_and_reads() {
        let graph = Arc::new(SynchronizedTransformationGraph::new());
        let hub = DataType::of("Hub");

        let writers: Vec<_> = (0..8)
            .map(|t| {
                let graph = Arc::clone(&graph);
                let hub = hub.clone();
                thread::spawn(move || {
                    let mut added = Vec::new();
                    for i in 0..50 {
                        let c = converter(
                            format!("c{t}-{i}"),
                            DataType::of(format!("T{t}-{i}")),
                            hub.clone(),
                        );
                        graph.add_converter(&c).unwrap();
                        // Every edge must point at live vertices.
                        let snapshot = graph.snapshot();
                        for edge in snapshot.edges() {
                            assert!(snapshot.contains_vertex(&edge.source));
                            assert!(snapshot.contains_vertex(&edge.target));
                        }
                        added.push(c);
                    }
                    for c in added.iter().step_by(2) {
                        assert!(graph.remove_converter(c));
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }

        // 8 threads * 25 survivors, each with its own source vertex, plus the hub.
        assert_eq!(graph.edge_count(), 200);
        assert_eq!(graph.vertex_count(), 201);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let graph = SynchronizedTransformationGraph::new();
        let c = converter("a".into(), DataType::of("A"), DataType::of("B"));
        graph.add_converter(&c).unwrap();

        let snapshot = graph.snapshot();
        graph.remove_converter(&c);

        assert_eq!(snapshot.edge_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }
}
