//! Per-content-type metadata extractors.
//!
//! A [`ContentHandler`] turns a file already known to be of some type into a
//! [`Record`] of extra fields. The [`HandlerRegistry`] routes a sniffed type
//! description to the first handler whose [`TypeMatcher`] accepts it.
//!
//! Supporting a new type means writing one handler and registering it:
//!
//! ```
//! use photobase::{HandlerRegistry, Record, TypeMatcher, FILE_TYPE};
//! use std::path::Path;
//!
//! let mut registry = HandlerRegistry::with_defaults();
//! registry.register(TypeMatcher::prefix("PNG"), |_: &Path| {
//!     Record::new().with(FILE_TYPE, "PNG")
//! });
//! assert!(registry.dispatch("PNG image data, 640 x 480").is_some());
//! ```

pub mod jpeg;

pub use jpeg::JpegHandler;

use crate::record::Record;
use std::fmt;
use std::path::Path;

/// Extracts type-specific fields from a file.
///
/// Handlers must not fail the visit: anything they cannot read is left out of
/// the returned record.
pub trait ContentHandler: Send + Sync {
    fn extract(&self, path: &Path) -> Record;
}

impl<F> ContentHandler for F
where
    F: Fn(&Path) -> Record + Send + Sync,
{
    fn extract(&self, path: &Path) -> Record {
        self(path)
    }
}

/// Decides whether a sniffed type description belongs to a handler.
pub enum TypeMatcher {
    Prefix(String),
    Exact(String),
    Predicate(Box<dyn Fn(&str) -> bool + Send + Sync>),
}

impl TypeMatcher {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        TypeMatcher::Prefix(prefix.into())
    }

    pub fn exact(description: impl Into<String>) -> Self {
        TypeMatcher::Exact(description.into())
    }

    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        TypeMatcher::Predicate(Box::new(f))
    }

    pub fn matches(&self, description: &str) -> bool {
        match self {
            TypeMatcher::Prefix(prefix) => description.starts_with(prefix.as_str()),
            TypeMatcher::Exact(exact) => description == exact,
            TypeMatcher::Predicate(f) => f(description),
        }
    }
}

impl fmt::Debug for TypeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeMatcher::Prefix(p) => f.debug_tuple("Prefix").field(p).finish(),
            TypeMatcher::Exact(e) => f.debug_tuple("Exact").field(e).finish(),
            TypeMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Ordered table of handlers. Earlier registrations take precedence.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<(TypeMatcher, Box<dyn ContentHandler>)>,
}

impl HandlerRegistry {
    /// A registry with no handlers: every type is unrecognized.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with the built-in handlers (JPEG).
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(TypeMatcher::prefix("JPEG"), JpegHandler);
        registry
    }

    pub fn register(&mut self, matcher: TypeMatcher, handler: impl ContentHandler + 'static) {
        self.entries.push((matcher, Box::new(handler)));
    }

    pub fn dispatch(&self, description: &str) -> Option<&dyn ContentHandler> {
        self.entries
            .iter()
            .find(|(matcher, _)| matcher.matches(description))
            .map(|(_, handler)| handler.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(matcher, _)| matcher))
            .finish()
    }
}
