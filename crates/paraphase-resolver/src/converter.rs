//! Converter declarations and traits.

use crate::data_type::DataType;
use std::fmt;
use std::sync::Arc;

/// Weighting given to converters that don't declare one.
pub const DEFAULT_WEIGHTING: i32 = 1;

/// Declaration of a converter's interface.
///
/// Describes which data types a converter accepts and produces, without
/// containing the actual conversion logic. Names need not be unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterDecl {
    /// Name used for deterministic tie-breaks. May be empty.
    pub name: String,
    /// Data types this converter accepts.
    pub source_types: Vec<DataType>,
    /// Data type this converter produces.
    pub target_type: DataType,
    /// Priority among otherwise equivalent converters; higher wins.
    pub weighting: i32,
}

impl ConverterDecl {
    /// Create a declaration with no source types yet.
    pub fn new(name: impl Into<String>, target_type: DataType) -> Self {
        Self {
            name: name.into(),
            source_types: Vec::new(),
            target_type,
            weighting: DEFAULT_WEIGHTING,
        }
    }

    /// Convenience: single source, single target converter.
    pub fn simple(name: impl Into<String>, source_type: DataType, target_type: DataType) -> Self {
        Self::new(name, target_type).source(source_type)
    }

    /// Add an accepted source type.
    pub fn source(mut self, source_type: DataType) -> Self {
        self.source_types.push(source_type);
        self
    }

    /// Set the weighting.
    pub fn weighting(mut self, weighting: i32) -> Self {
        self.weighting = weighting;
        self
    }

    /// Check that this declaration can be registered.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.source_types.is_empty() {
            return Err(RegistrationError::NoSourceTypes {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Check if this converter accepts `data_type`, either as declared or as
    /// a more specific type.
    pub fn accepts(&self, data_type: &DataType) -> bool {
        self.source_types
            .iter()
            .any(|source| data_type.conforms_to(source))
    }
}

/// Trait implemented by converters.
///
/// The resolver only reads the declaration; invoking the conversion is up to
/// the caller. Converters are compared by identity, not by declaration.
pub trait Converter: Send + Sync + fmt::Debug {
    /// Get the declaration for this converter.
    fn decl(&self) -> &ConverterDecl;
}

/// Shared handle to a registered converter.
pub type ConverterRef = Arc<dyn Converter>;

/// Check if two handles point at the same converter instance.
pub fn same_converter(a: &ConverterRef, b: &ConverterRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// A converter known only by its declaration.
///
/// Useful for planning before implementations are available.
#[derive(Debug, Clone)]
pub struct DeclaredConverter {
    decl: ConverterDecl,
}

impl DeclaredConverter {
    pub fn new(decl: ConverterDecl) -> Self {
        Self { decl }
    }

    /// Wrap into a shareable handle. Every call yields a distinct converter.
    pub fn into_ref(self) -> ConverterRef {
        Arc::new(self)
    }
}

impl From<ConverterDecl> for DeclaredConverter {
    fn from(decl: ConverterDecl) -> Self {
        Self::new(decl)
    }
}

impl Converter for DeclaredConverter {
    fn decl(&self) -> &ConverterDecl {
        &self.decl
    }
}

/// An ordered chain of converters acting as a single converter.
///
/// Clones share the chain; [`CompositeConverter::ptr_eq`] tells them apart
/// from an equal chain assembled separately.
#[derive(Debug, Clone)]
pub struct CompositeConverter {
    inner: Arc<CompositeInner>,
}

#[derive(Debug)]
struct CompositeInner {
    chain: Vec<ConverterRef>,
    decl: ConverterDecl,
}

impl CompositeConverter {
    /// Chain converters end to end.
    ///
    /// Each converter must accept what the previous one produces.
    pub fn new(chain: Vec<ConverterRef>) -> Result<Self, RegistrationError> {
        if chain.len() < 2 {
            return Err(RegistrationError::ChainTooShort(chain.len()));
        }

        for (position, pair) in chain.windows(2).enumerate() {
            let (previous, next) = (pair[0].decl(), pair[1].decl());
            if !next.accepts(&previous.target_type) {
                return Err(RegistrationError::BrokenChain {
                    position: position + 1,
                    previous: previous.name.clone(),
                    next: next.name.clone(),
                    produced: previous.target_type.to_string(),
                });
            }
        }

        Ok(Self::assemble(chain))
    }

    /// Build from consecutive graph edges, which connect by construction.
    pub(crate) fn from_path(chain: Vec<ConverterRef>) -> Self {
        debug_assert!(chain.len() >= 2);
        Self::assemble(chain)
    }

    fn assemble(chain: Vec<ConverterRef>) -> Self {
        let first = chain[0].decl();
        let last = chain[chain.len() - 1].decl();

        let decl = ConverterDecl {
            name: chain
                .iter()
                .map(|c| c.decl().name.as_str())
                .collect::<Vec<_>>()
                .join(","),
            source_types: first.source_types.clone(),
            target_type: last.target_type.clone(),
            weighting: chain
                .iter()
                .fold(0i32, |sum, c| sum.saturating_add(c.decl().weighting)),
        };

        Self {
            inner: Arc::new(CompositeInner { chain, decl }),
        }
    }

    /// Converters in execution order.
    pub fn chain(&self) -> &[ConverterRef] {
        &self.inner.chain
    }

    /// Number of converters in the chain.
    pub fn chain_length(&self) -> usize {
        self.inner.chain.len()
    }

    /// Check if both handles share the same chain allocation.
    pub fn ptr_eq(&self, other: &CompositeConverter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Converter for CompositeConverter {
    fn decl(&self) -> &ConverterDecl {
        &self.inner.decl
    }
}

/// What the resolver hands back: one converter, or a chain of them.
#[derive(Debug, Clone)]
pub enum Transformation {
    Direct(ConverterRef),
    Composite(CompositeConverter),
}

impl Transformation {
    /// Effective declaration. For chains: first sources, last target,
    /// summed weighting.
    pub fn decl(&self) -> &ConverterDecl {
        match self {
            Transformation::Direct(converter) => converter.decl(),
            Transformation::Composite(composite) => composite.decl(),
        }
    }

    pub fn name(&self) -> &str {
        &self.decl().name
    }

    pub fn source_types(&self) -> &[DataType] {
        &self.decl().source_types
    }

    pub fn target_type(&self) -> &DataType {
        &self.decl().target_type
    }

    pub fn weighting(&self) -> i32 {
        self.decl().weighting
    }

    /// Number of converters involved (1 for a direct converter).
    pub fn chain_length(&self) -> usize {
        match self {
            Transformation::Direct(_) => 1,
            Transformation::Composite(composite) => composite.chain_length(),
        }
    }

    /// Converters in execution order.
    pub fn converters(&self) -> &[ConverterRef] {
        match self {
            Transformation::Direct(converter) => std::slice::from_ref(converter),
            Transformation::Composite(composite) => composite.chain(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Transformation::Composite(_))
    }

    /// Names of the converters in order; compared element-wise, so the
    /// first hop decides first.
    pub fn canonical_name(&self) -> Vec<&str> {
        self.converters()
            .iter()
            .map(|c| c.decl().name.as_str())
            .collect()
    }

    /// Check if both run the same converter instances in the same order.
    pub fn is_same(&self, other: &Transformation) -> bool {
        let (ours, theirs) = (self.converters(), other.converters());
        ours.len() == theirs.len()
            && ours
                .iter()
                .zip(theirs)
                .all(|(a, b)| same_converter(a, b))
    }

    /// Check if both are the same instance, e.g. one handed out from a cache.
    ///
    /// Stricter than [`Transformation::is_same`]: two separately assembled
    /// chains of the same converters are not `ptr_eq`.
    pub fn ptr_eq(&self, other: &Transformation) -> bool {
        match (self, other) {
            (Transformation::Direct(a), Transformation::Direct(b)) => same_converter(a, b),
            (Transformation::Composite(a), Transformation::Composite(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// A converter handle for callers that only speak [`Converter`].
    pub fn into_converter(self) -> ConverterRef {
        match self {
            Transformation::Direct(converter) => converter,
            Transformation::Composite(composite) => Arc::new(composite),
        }
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, converter) in self.converters().iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            let decl = converter.decl();
            if decl.name.is_empty() {
                write!(f, "<{} to {}>", source_list(decl), decl.target_type)?;
            } else {
                f.write_str(&decl.name)?;
            }
        }
        Ok(())
    }
}

fn source_list(decl: &ConverterDecl) -> String {
    decl.source_types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

/// Errors from registering converters or assembling chains.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("converter {name:?} declares no source types")]
    NoSourceTypes { name: String },

    #[error("a composite converter needs at least 2 converters, got {0}")]
    ChainTooShort(usize),

    #[error(
        "converter {next:?} at position {position} does not accept {produced} produced by {previous:?}"
    )]
    BrokenChain {
        position: usize,
        previous: String,
        next: String,
        produced: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::ClassRef;

    fn converter(name: &str, from: &str, to: &str, weighting: i32) -> ConverterRef {
        DeclaredConverter::new(
            ConverterDecl::simple(name, DataType::of(from), DataType::of(to)).weighting(weighting),
        )
        .into_ref()
    }

    #[test]
    fn test_simple_converter_decl() {
        let decl = ConverterDecl::simple("xml-to-json", DataType::of("Xml"), DataType::of("Json"));

        assert_eq!(decl.name, "xml-to-json");
        assert_eq!(decl.source_types, vec![DataType::of("Xml")]);
        assert_eq!(decl.weighting, DEFAULT_WEIGHTING);
        assert!(decl.validate().is_ok());
    }

    #[test]
    fn test_decl_without_sources_is_invalid() {
        let decl = ConverterDecl::new("nothing-to-json", DataType::of("Json"));
        assert_eq!(
            decl.validate(),
            Err(RegistrationError::NoSourceTypes {
                name: "nothing-to-json".into()
            })
        );
    }

    #[test]
    fn test_accepts_more_specific_source() {
        let stream = ClassRef::new("InputStream");
        let file_stream = ClassRef::extending("FileInputStream", &stream);
        let decl = ConverterDecl::simple("stream-to-xml", DataType::new(stream), DataType::of("Xml"));

        assert!(decl.accepts(&DataType::new(file_stream)));
        assert!(!decl.accepts(&DataType::of("Json")));
    }

    #[test]
    fn test_composite_decl() {
        let stream_to_xml = converter("streamToXml", "InputStream", "Xml", 2);
        let xml_to_json = converter("xmlToJson", "Xml", "Json", 3);

        let composite =
            CompositeConverter::new(vec![stream_to_xml.clone(), xml_to_json.clone()]).unwrap();

        assert_eq!(composite.chain_length(), 2);
        assert_eq!(composite.decl().name, "streamToXml,xmlToJson");
        assert_eq!(composite.decl().source_types, vec![DataType::of("InputStream")]);
        assert_eq!(composite.decl().target_type, DataType::of("Json"));
        assert_eq!(composite.decl().weighting, 5);
        assert!(same_converter(&composite.chain()[0], &stream_to_xml));
        assert!(same_converter(&composite.chain()[1], &xml_to_json));
    }

    #[test]
    fn test_composite_weighting_saturates() {
        let a = converter("a", "A", "B", i32::MAX);
        let b = converter("b", "B", "C", 10);
        let composite = CompositeConverter::new(vec![a, b]).unwrap();
        assert_eq!(composite.decl().weighting, i32::MAX);
    }

    #[test]
    fn test_composite_needs_two_converters() {
        let only = converter("only", "A", "B", 1);
        assert_eq!(
            CompositeConverter::new(vec![only]).unwrap_err(),
            RegistrationError::ChainTooShort(1)
        );
    }

    #[test]
    fn test_composite_rejects_broken_chain() {
        let a = converter("a", "A", "B", 1);
        let c = converter("c", "C", "D", 1);

        let err = CompositeConverter::new(vec![a, c]).unwrap_err();
        assert!(matches!(err, RegistrationError::BrokenChain { position: 1, .. }));
    }

    #[test]
    fn test_composite_accepts_compatible_link() {
        let utf8_string = DataType::of("String").with_charset("UTF-8");
        let produce = DeclaredConverter::new(ConverterDecl::simple(
            "bytesToUtf8",
            DataType::of("Bytes"),
            utf8_string,
        ))
        .into_ref();
        let consume = converter("stringToXml", "String", "Xml", 1);

        assert!(CompositeConverter::new(vec![produce, consume]).is_ok());
    }

    #[test]
    fn test_transformation_identity() {
        let a = converter("a", "A", "B", 1);
        let b = converter("b", "B", "C", 1);

        let first = Transformation::Composite(CompositeConverter::new(vec![a.clone(), b.clone()]).unwrap());
        let second = Transformation::Composite(CompositeConverter::new(vec![a.clone(), b]).unwrap());

        assert!(first.is_same(&second));
        assert!(!first.ptr_eq(&second));
        assert!(first.ptr_eq(&first.clone()));

        let direct = Transformation::Direct(a.clone());
        assert!(direct.ptr_eq(&Transformation::Direct(a)));
        assert!(!direct.is_same(&first));
    }

    #[test]
    fn test_transformation_accessors() {
        let a = converter("a", "A", "B", 1);
        let b = converter("b", "B", "C", 4);
        let chain = Transformation::Composite(CompositeConverter::new(vec![a, b]).unwrap());

        assert_eq!(chain.chain_length(), 2);
        assert_eq!(chain.weighting(), 5);
        assert_eq!(chain.canonical_name(), vec!["a", "b"]);
        assert_eq!(chain.to_string(), "a -> b");
        assert!(chain.is_composite());

        let converter = chain.into_converter();
        assert_eq!(converter.decl().name, "a,b");
    }

    #[test]
    fn test_display_unnamed() {
        let unnamed = converter("", "A", "B", 1);
        assert_eq!(Transformation::Direct(unnamed).to_string(), "<A to B>");
    }
}
