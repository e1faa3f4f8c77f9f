//! Data types: what a payload is, described by class, media type and charset.
//!
//! Data types are ordered by specificity rather than by graph edges. A type
//! *conforms to* another when it can stand in wherever the other is expected:
//! an `InputStream` of `application/json; charset=UTF-8` conforms to a bare
//! `InputStream`, never the other way around.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

const WILDCARD: &str = "*";

/// The class a payload is represented as.
///
/// Classes form single-inheritance chains through their parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassRef {
    name: Arc<str>,
    parent: Option<Arc<ClassRef>>,
}

impl ClassRef {
    /// Create a root class.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            parent: None,
        }
    }

    /// The universal supertype. Every class is a subtype of it.
    pub fn any() -> Self {
        Self::new(WILDCARD)
    }

    /// Create a class extending `parent`.
    pub fn extending(name: impl Into<Arc<str>>, parent: &ClassRef) -> Self {
        Self {
            name: name.into(),
            parent: Some(Arc::new(parent.clone())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&ClassRef> {
        self.parent.as_deref()
    }

    pub fn is_any(&self) -> bool {
        self.parent.is_none() && &*self.name == WILDCARD
    }

    /// Number of ancestors.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(class) = current {
            depth += 1;
            current = class.parent();
        }
        depth
    }

    /// Check if this class is `other` or one of its descendants.
    pub fn is_subtype_of(&self, other: &ClassRef) -> bool {
        if other.is_any() {
            return true;
        }
        let mut current = Some(self);
        while let Some(class) = current {
            if class == other {
                return true;
            }
            current = class.parent();
        }
        false
    }
}

/// A MIME media type such as `application/json; charset=UTF-8`.
///
/// Primary and sub types are stored lower-case, charsets upper-case.
/// Parameters other than `charset` are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    primary: String,
    sub: String,
    charset: Option<String>,
}

impl MediaType {
    pub fn new(primary: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            primary: primary.into().to_ascii_lowercase(),
            sub: sub.into().to_ascii_lowercase(),
            charset: None,
        }
    }

    /// `*/*`: matches every media type.
    pub fn any() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(normalize_charset(charset.into()));
        self
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn sub(&self) -> &str {
        &self.sub
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn is_wildcard(&self) -> bool {
        self.primary == WILDCARD && self.sub == WILDCARD
    }

    /// Check if this media type satisfies `pattern`.
    ///
    /// Wildcard fields in the pattern match anything. Charsets are not
    /// compared here; [`DataType::conforms_to`] handles them.
    pub fn matches(&self, pattern: &MediaType) -> bool {
        (pattern.primary == WILDCARD || pattern.primary == self.primary)
            && (pattern.sub == WILDCARD || pattern.sub == self.sub)
    }

    fn same_essence(&self, other: &MediaType) -> bool {
        self.primary == other.primary && self.sub == other.sub
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MediaTypeError::Invalid(s.to_string());

        let mut parts = s.split(';');
        let essence = parts.next().unwrap_or_default().trim();
        let (primary, sub) = essence.split_once('/').ok_or_else(invalid)?;
        let (primary, sub) = (primary.trim(), sub.trim());
        if primary.is_empty() || sub.is_empty() || sub.contains('/') {
            return Err(invalid());
        }

        let mut media_type = MediaType::new(primary, sub);
        for param in parts.map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = param.split_once('=').ok_or_else(invalid)?;
            if key.trim().eq_ignore_ascii_case("charset") {
                let value = value.trim().trim_matches('"');
                if value.is_empty() {
                    return Err(invalid());
                }
                media_type = media_type.with_charset(value);
            }
        }
        Ok(media_type)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.primary, self.sub)?;
        if let Some(charset) = &self.charset {
            write!(f, "; charset={}", charset)?;
        }
        Ok(())
    }
}

/// Errors from parsing media types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaTypeError {
    #[error("invalid media type: {0:?}")]
    Invalid(String),
}

/// Descriptor of the type a payload carries.
///
/// The charset of a data type is the explicit override if one was set,
/// otherwise the charset parameter of its media type. Equality and hashing
/// use that effective charset, so `text/plain; charset=UTF-8` and `text/plain`
/// with a `UTF-8` override are the same data type.
#[derive(Debug, Clone)]
pub struct DataType {
    class: ClassRef,
    media_type: Option<MediaType>,
    charset_override: Option<String>,
}

impl DataType {
    pub fn new(class: ClassRef) -> Self {
        Self {
            class,
            media_type: None,
            charset_override: None,
        }
    }

    /// Shorthand for a data type of a root class with no media type.
    pub fn of(name: impl Into<Arc<str>>) -> Self {
        Self::new(ClassRef::new(name))
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }

    /// Parse and set the media type.
    pub fn with_mime(self, media_type: &str) -> Result<Self, MediaTypeError> {
        Ok(self.with_media_type(media_type.parse()?))
    }

    /// Set a charset, overriding any charset carried by the media type.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset_override = Some(normalize_charset(charset.into()));
        self
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    /// The effective charset.
    pub fn charset(&self) -> Option<&str> {
        self.charset_override
            .as_deref()
            .or_else(|| self.media_type.as_ref().and_then(MediaType::charset))
    }

    /// How much this type pins down: class depth, plus one for each
    /// non-wildcard media type field, plus one for a charset.
    ///
    /// If `a` conforms to `b` and they differ, `a` scores higher.
    pub fn specificity(&self) -> usize {
        let media = self.media_type.as_ref().map_or(0, |media| {
            usize::from(media.primary != WILDCARD) + usize::from(media.sub != WILDCARD)
        });
        self.class.depth() + media + usize::from(self.charset().is_some())
    }

    /// Check if this type is more specific than, or equal to, `general`.
    ///
    /// Holds when the class is `general`'s class or a subtype of it, the media
    /// type satisfies `general`'s (wildcards and unset media types accept
    /// anything), and `general` either has no charset or the same one.
    pub fn conforms_to(&self, general: &DataType) -> bool {
        if !self.class.is_subtype_of(&general.class) {
            return false;
        }

        let media_matches = match &general.media_type {
            None => true,
            Some(pattern) if pattern.is_wildcard() => true,
            Some(pattern) => self
                .media_type
                .as_ref()
                .is_some_and(|media| media.matches(pattern)),
        };
        if !media_matches {
            return false;
        }

        match general.charset() {
            None => true,
            Some(charset) => self.charset() == Some(charset),
        }
    }
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
            && match (&self.media_type, &other.media_type) {
                (None, None) => true,
                (Some(a), Some(b)) => a.same_essence(b),
                _ => false,
            }
            && self.charset() == other.charset()
    }
}

impl Eq for DataType {}

impl Hash for DataType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.hash(state);
        if let Some(media) = &self.media_type {
            media.primary.hash(state);
            media.sub.hash(state);
        }
        self.charset().hash(state);
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class.name())?;
        match (&self.media_type, self.charset()) {
            (Some(media), Some(charset)) => {
                write!(f, "[{}/{}; charset={}]", media.primary, media.sub, charset)
            }
            (Some(media), None) => write!(f, "[{}/{}]", media.primary, media.sub),
            (None, Some(charset)) => write!(f, "[charset={}]", charset),
            (None, None) => Ok(()),
        }
    }
}

fn normalize_charset(charset: String) -> String {
    charset.trim().to_ascii_uppercase()
}
