use std::fmt;

/// Represents a resolved location in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, counted in characters)
    pub column: usize,
    /// Byte offset from start of the unit
    pub offset: usize,
}

impl Location {
    /// Create a new location
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Create a location at the start of a file
    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A compact `(offset, length)` region of one compilation unit.
///
/// Offsets are byte offsets into the unit text; line and column are only
/// computed on demand through a [`LineMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    /// Create a new span
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Create a span covering `start..end`
    pub fn from_to(start: usize, end: usize) -> Self {
        Self { offset: start, len: end.saturating_sub(start) }
    }

    /// Zero-length span at `offset`
    pub fn empty(offset: usize) -> Self {
        Self { offset, len: 0 }
    }

    /// Exclusive end offset
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Smallest span covering both `self` and `other`
    pub fn cover(&self, other: Span) -> Span {
        let start = self.offset.min(other.offset);
        let end = self.end().max(other.end());
        Span::from_to(start, end)
    }

    /// Whether `other` lies entirely within this span
    pub fn contains(&self, other: Span) -> bool {
        other.offset >= self.offset && other.end() <= self.end()
    }

    /// Get the source text for this span
    pub fn source_text<'a>(&self, source: &'a str) -> &'a str {
        if self.offset >= source.len() {
            return "";
        }
        let end = self.end().min(source.len());
        source.get(self.offset..end).unwrap_or("")
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.offset, self.len)
    }
}

/// Trait for types that carry a span
pub trait HasSpan {
    /// Get the span of this item
    fn span(&self) -> Span;
}

impl HasSpan for Span {
    fn span(&self) -> Span {
        *self
    }
}

/// Precomputed line-start index mapping byte offsets to 1-based line/column.
#[derive(Debug, Clone, Default)]
pub struct LineMap {
    line_starts: Vec<usize>,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => line_starts.push(i + 1),
                b'\r' => {
                    // \r\n counts as a single terminator
                    if bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    line_starts.push(i + 1);
                }
                _ => {}
            }
            i += 1;
        }
        Self { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Map a byte offset to a location. Offsets past the end clamp to the end.
    pub fn location(&self, text: &str, offset: usize) -> Location {
        let offset = offset.min(text.len());
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_index];
        let column = text
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        Location::new(line_index + 1, column + 1, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_map_handles_mixed_terminators() {
        let text = "ab\ncd\r\nef\rg";
        let map = LineMap::new(text);
        assert_eq!(map.line_count(), 4);
        assert_eq!(map.location(text, 0), Location::new(1, 1, 0));
        assert_eq!(map.location(text, 4), Location::new(2, 2, 4));
        assert_eq!(map.location(text, 7), Location::new(3, 1, 7));
        assert_eq!(map.location(text, 10), Location::new(4, 1, 10));
    }

    #[test]
    fn columns_count_characters() {
        let text = "é = 1;";
        let map = LineMap::new(text);
        // 'é' is two bytes but one column
        assert_eq!(map.location(text, 2).column, 2);
    }

    #[test]
    fn cover_and_contains() {
        let a = Span::new(2, 3);
        let b = Span::new(10, 1);
        let c = a.cover(b);
        assert_eq!(c, Span::from_to(2, 11));
        assert!(c.contains(a));
        assert!(c.contains(b));
        assert!(!a.contains(b));
    }
}
