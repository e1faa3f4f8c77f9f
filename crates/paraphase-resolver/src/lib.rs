//! Paraphase resolver: pick converter chains between data types.
//!
//! Converters declare which data types they accept and produce. The resolver
//! arranges them in a graph, enumerates every chain from a source type to a
//! target type, and narrows the candidates to a single winner: shortest
//! chain, then highest weighting, then closest declared types, then name.
//!
//! ```
//! use rhi_paraphase_resolver::{ConverterDecl, DataType, DeclaredConverter, GraphTransformerResolver};
//!
//! let resolver = GraphTransformerResolver::new();
//! let stream = DataType::of("InputStream");
//! let xml = DataType::of("Xml");
//! let json = DataType::of("Json");
//!
//! for decl in [
//!     ConverterDecl::simple("xmlToJson", xml.clone(), json.clone()),
//!     ConverterDecl::simple("inputStreamToXml", stream.clone(), xml.clone()),
//! ] {
//!     resolver.register_converter(DeclaredConverter::new(decl).into_ref()).unwrap();
//! }
//!
//! let chain = resolver.resolve(&stream, &json).unwrap();
//! assert_eq!(chain.to_string(), "inputStreamToXml -> xmlToJson");
//! ```

mod config;
mod converter;
mod data_type;
mod filter;
mod graph;
mod lookup;
mod resolver;
mod sync_graph;
mod type_matching;

pub use config::{ConfigError, ConfigFormat, ResolverConfig};
pub use converter::{
    CompositeConverter, Converter, ConverterDecl, ConverterRef, DEFAULT_WEIGHTING,
    DeclaredConverter, RegistrationError, Transformation, same_converter,
};
pub use data_type::{ClassRef, DataType, MediaType, MediaTypeError};
pub use filter::{
    CompositeConverterFilter, ConverterFilter, NameConverterFilter,
    PriorityWeightingConverterFilter, TransformationLengthConverterFilter,
};
pub use graph::{TransformationEdge, TransformationGraph};
pub use lookup::{DEFAULT_MAX_CHAIN_LENGTH, TransformationGraphLookupStrategy};
pub use resolver::{
    Component, GraphTransformerResolver, RegistryAction, ResolveError, ResolverStats,
};
pub use sync_graph::SynchronizedTransformationGraph;
pub use type_matching::TypeMatchingVertexesFilter;
