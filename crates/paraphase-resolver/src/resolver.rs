//! Resolution: pick one transformation for a pair of data types.
//!
//! The resolver keeps the transformation graph in sync with registry events,
//! runs lookups through the filter chain and caches the outcome until the
//! graph changes.

use crate::config::ResolverConfig;
use crate::converter::{ConverterRef, RegistrationError, Transformation};
use crate::data_type::DataType;
use crate::filter::{CompositeConverterFilter, ConverterFilter};
use crate::lookup::TransformationGraphLookupStrategy;
use crate::sync_graph::SynchronizedTransformationGraph;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace, warn};

/// Something the registry added or removed.
#[derive(Debug, Clone)]
pub enum Component {
    /// A converter; these feed the graph.
    Converter(ConverterRef),
    /// Anything else the registry tracks, such as a plain transformer.
    Other { name: String },
}

impl From<ConverterRef> for Component {
    fn from(converter: ConverterRef) -> Self {
        Component::Converter(converter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryAction {
    Added,
    Removed,
}

/// Errors from resolving a transformation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("no transformation from {from} to {to}")]
    NotFound { from: DataType, to: DataType },

    #[error("ambiguous transformation from {from} to {to}: {}", .candidates.join(", "))]
    Ambiguous {
        from: DataType,
        to: DataType,
        candidates: Vec<String>,
    },
}

/// Counters describing resolver activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Resolutions answered from the cache, including cached misses.
    pub cache_hits: usize,
    /// Resolutions that had to search the graph.
    pub cache_misses: usize,
    /// Graph changes that cleared the cache.
    pub invalidations: usize,
    /// Resolutions that ended with several equally good candidates.
    pub ambiguous: usize,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    invalidations: AtomicUsize,
    ambiguous: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ResolverStats {
        ResolverStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            ambiguous: self.ambiguous.load(Ordering::Relaxed),
        }
    }
}

/// Cached outcomes keyed by `(source, target)`. `None` records a miss.
///
/// `generation` moves on every invalidation. A result is only stored if the
/// generation is unchanged since the lookup that produced it started.
#[derive(Debug, Default)]
struct ResolutionCache {
    generation: u64,
    entries: HashMap<(DataType, DataType), Option<Transformation>>,
}

/// Resolves transformations over a graph of registered converters.
#[derive(Debug)]
pub struct GraphTransformerResolver {
    graph: SynchronizedTransformationGraph,
    filter: CompositeConverterFilter,
    cache: RwLock<ResolutionCache>,
    config: ResolverConfig,
    stats: Counters,
}

impl Default for GraphTransformerResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphTransformerResolver {
    /// Create a resolver with default configuration and filters.
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            graph: SynchronizedTransformationGraph::new(),
            filter: CompositeConverterFilter::default(),
            cache: RwLock::new(ResolutionCache::default()),
            config,
            stats: Counters::default(),
        }
    }

    /// Replace the tie-break filter chain.
    pub fn with_filter(mut self, filter: CompositeConverterFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The graph backing this resolver.
    pub fn graph(&self) -> &SynchronizedTransformationGraph {
        &self.graph
    }

    /// React to a registry event.
    ///
    /// Only converters are tracked; other components are ignored. Any
    /// converter event clears the cache, even one that left the graph
    /// unchanged.
    pub fn transformer_change(
        &self,
        component: &Component,
        action: RegistryAction,
    ) -> Result<(), RegistrationError> {
        let Component::Converter(converter) = component else {
            trace!(?component, "ignoring non-converter component");
            return Ok(());
        };

        match action {
            RegistryAction::Added => {
                self.graph.add_converter(converter)?;
            }
            RegistryAction::Removed => {
                self.graph.remove_converter(converter);
            }
        }

        self.invalidate();
        Ok(())
    }

    pub fn register_converter(&self, converter: ConverterRef) -> Result<(), RegistrationError> {
        self.transformer_change(&Component::Converter(converter), RegistryAction::Added)
    }

    /// Remove a converter. Returns whether it was registered; the cache is
    /// cleared either way.
    pub fn unregister_converter(&self, converter: &ConverterRef) -> bool {
        let removed = self.graph.remove_converter(converter);
        self.invalidate();
        removed
    }

    /// Find the single best transformation from `source` to `target`.
    ///
    /// Found and not-found outcomes are cached until the graph changes.
    /// Ambiguous outcomes are not.
    pub fn resolve(
        &self,
        source: &DataType,
        target: &DataType,
    ) -> Result<Transformation, ResolveError> {
        let key = (source.clone(), target.clone());

        let generation = if self.config.cache {
            let cache = self.cache.read();
            if let Some(entry) = cache.entries.get(&key) {
                Counters::bump(&self.stats.cache_hits);
                trace!(%source, %target, found = entry.is_some(), "resolution cache hit");
                return entry.clone().ok_or_else(|| not_found(source, target));
            }
            Some(cache.generation)
        } else {
            None
        };

        Counters::bump(&self.stats.cache_misses);
        trace!(%source, %target, "resolution cache miss");

        let candidates = self.lookup_converters(source, target);
        let mut distinct: Vec<Transformation> = Vec::new();
        for candidate in self.filter.filter(candidates, source, target) {
            if !distinct.iter().any(|kept| kept.is_same(&candidate)) {
                distinct.push(candidate);
            }
        }

        if distinct.len() > 1 {
            Counters::bump(&self.stats.ambiguous);
            let candidates: Vec<String> = distinct.iter().map(ToString::to_string).collect();
            warn!(%source, %target, ?candidates, "ambiguous transformation");
            return Err(ResolveError::Ambiguous {
                from: source.clone(),
                to: target.clone(),
                candidates,
            });
        }

        let resolved = distinct.pop();
        if let Some(generation) = generation {
            self.store(key, generation, resolved.clone());
        }
        resolved.ok_or_else(|| not_found(source, target))
    }

    /// Every candidate transformation, unfiltered and uncached.
    pub fn lookup_converters(&self, source: &DataType, target: &DataType) -> Vec<Transformation> {
        let graph = self.graph.read();
        let lookup = TransformationGraphLookupStrategy::new(&graph)
            .max_chain_length(self.config.max_chain_length);
        lookup.lookup_converters(source, target)
    }

    /// Resolve many pairs in parallel.
    #[cfg(feature = "parallel")]
    pub fn resolve_all(
        &self,
        pairs: &[(DataType, DataType)],
    ) -> Vec<Result<Transformation, ResolveError>> {
        use rayon::prelude::*;

        pairs
            .par_iter()
            .map(|(source, target)| self.resolve(source, target))
            .collect()
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats.snapshot()
    }

    /// Drop every cached resolution.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write();
        cache.generation = cache.generation.wrapping_add(1);
        let dropped = cache.entries.len();
        cache.entries.clear();
        drop(cache);

        Counters::bump(&self.stats.invalidations);
        debug!(dropped, "cleared resolution cache");
    }

    fn store(&self, key: (DataType, DataType), generation: u64, resolved: Option<Transformation>) {
        let mut cache = self.cache.write();
        if cache.generation != generation {
            trace!(source = %key.0, target = %key.1, "graph changed during lookup, not caching");
            return;
        }
        // A concurrent miss may have stored first; keep that instance.
        cache.entries.entry(key).or_insert(resolved);
    }
}

fn not_found(source: &DataType, target: &DataType) -> ResolveError {
    ResolveError::NotFound {
        from: source.clone(),
        to: target.clone(),
    }
}
