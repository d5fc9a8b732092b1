//! Core position types

use serde::{Deserialize, Serialize};

/// A resolved position in source text
///
/// Unlike the raw byte offset, `line` and `column` are 1-based so they can be
/// shown to users unchanged. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// Byte offset from start of source (0-based)
    pub offset: usize,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, in characters)
    pub column: usize,
}

/// A half-open byte range `[start, end)` in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {} is past its end {}", start, end);
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_ordering() {
        let loc1 = Location {
            offset: 0,
            line: 1,
            column: 1,
        };
        let loc2 = Location {
            offset: 5,
            line: 1,
            column: 6,
        };
        let loc3 = Location {
            offset: 10,
            line: 2,
            column: 1,
        };

        assert!(loc1 < loc2);
        assert!(loc2 < loc3);
    }

    #[test]
    fn test_span_len() {
        let span = Span::new(3, 8);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
        assert!(Span::new(4, 4).is_empty());
    }

    #[test]
    fn test_span_into_range() {
        let range: std::ops::Range<usize> = Span::new(2, 7).into();
        assert_eq!(range, 2..7);
    }

    #[test]
    fn test_location_serialization() {
        let loc = Location {
            offset: 12,
            line: 2,
            column: 3,
        };
        let json = serde_json::to_string(&loc).unwrap();
        let back: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(loc, back);
    }
}
