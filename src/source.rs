//! Source handles and source providers
//!
//! A [`Source`] is an immutable compilation-unit text plus its line index.
//! Providers map library/part URIs to sources; the compiler never touches the
//! filesystem directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::parser::span::{LineMap, Location, Span};

/// Index of a compilation unit within one compilation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UnitId(pub u32);

impl UnitId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Immutable source text handle
#[derive(Debug, Clone)]
pub struct Source {
    name: Arc<str>,
    text: Arc<str>,
    lines: Arc<LineMap>,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text: String = text.into();
        let lines = LineMap::new(&text);
        Self {
            name: Arc::from(name.into()),
            text: Arc::from(text),
            lines: Arc::new(lines),
        }
    }

    /// Unit identifier used in diagnostics (a path or URI)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn location(&self, offset: usize) -> Location {
        self.lines.location(&self.text, offset)
    }

    pub fn slice(&self, span: Span) -> &str {
        span.source_text(&self.text)
    }
}

/// Resolves URIs named by `#import` / `#source` directives to sources.
pub trait SourceProvider: Sync {
    /// Resolve `uri` relative to the unit named `from` (if any).
    fn resolve_uri(&self, from: Option<&str>, uri: &str) -> String {
        match from.and_then(|f| f.rfind('/').map(|i| &f[..=i])) {
            Some(dir) if !uri.starts_with('/') && !uri.contains(':') => format!("{}{}", dir, uri),
            _ => uri.to_string(),
        }
    }

    /// Load the source named `name` (already resolved)
    fn load(&self, name: &str) -> Result<Source>;
}

/// In-memory provider, mainly for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct MemorySources {
    files: HashMap<String, String>,
}

impl MemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, text: &str) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: &str, text: &str) {
        self.files.insert(name.to_string(), text.to_string());
    }
}

impl SourceProvider for MemorySources {
    fn load(&self, name: &str) -> Result<Source> {
        self.files
            .get(name)
            .map(|text| Source::new(name, text.clone()))
            .ok_or_else(|| Error::SourceNotFound { name: name.to_string() })
    }
}

/// Filesystem provider rooted at a directory
#[derive(Debug, Clone)]
pub struct FileSources {
    root: PathBuf,
}

impl FileSources {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
}

impl SourceProvider for FileSources {
    fn load(&self, name: &str) -> Result<Source> {
        let path = self.root.join(name);
        log::trace!("loading source {}", path.display());
        let text = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::SourceNotFound { name: name.to_string() }
            } else {
                Error::Io(e)
            }
        })?;
        Ok(Source::new(name, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_to_importing_unit() {
        let sources = MemorySources::new();
        assert_eq!(sources.resolve_uri(Some("lib/a.dart"), "b.dart"), "lib/b.dart");
        assert_eq!(sources.resolve_uri(None, "b.dart"), "b.dart");
        assert_eq!(sources.resolve_uri(Some("lib/a.dart"), "dart:core"), "dart:core");
    }

    #[test]
    fn missing_memory_source_is_an_error() {
        let sources = MemorySources::new().with("a.dart", "class A {}");
        assert!(sources.load("a.dart").is_ok());
        assert!(matches!(sources.load("b.dart"), Err(Error::SourceNotFound { .. })));
    }
}
