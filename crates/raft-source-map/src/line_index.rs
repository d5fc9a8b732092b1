//! Efficient line information for location lookups

use serde::{Deserialize, Serialize};

/// Precomputed line start offsets for a piece of source text
///
/// The index is built once by scanning the text for `\n`. Every later
/// offset → line lookup is a binary search, so it runs in O(log n) where
/// n is the number of lines.
///
/// Invariant: `line_starts[0] == 0` and the offsets are strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIndex {
    /// Byte offset of the first character of each line
    line_starts: Vec<usize>,

    /// Total length of the text in bytes
    total_length: usize,
}

impl LineIndex {
    /// Create a line index by analyzing content
    ///
    /// # Example
    ///
    /// ```
    /// use raft_source_map::LineIndex;
    ///
    /// let index = LineIndex::new("line 1\nline 2\nline 3");
    /// assert_eq!(index.line_count(), 3);
    /// ```
    pub fn new(content: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                content
                    .bytes()
                    .enumerate()
                    .filter_map(|(idx, byte)| (byte == b'\n').then_some(idx + 1)),
            )
            .collect();

        LineIndex {
            line_starts,
            total_length: content.len(),
        }
    }

    /// Convert a byte offset to a 1-based line number
    ///
    /// A newline character belongs to the line it terminates. Offsets past
    /// the end of the text are clamped to the last line.
    ///
    /// # Example
    ///
    /// ```
    /// use raft_source_map::LineIndex;
    ///
    /// let index = LineIndex::new("hello\nworld");
    /// assert_eq!(index.line_for_offset(5), 1);
    /// assert_eq!(index.line_for_offset(6), 2);
    /// ```
    pub fn line_for_offset(&self, offset: usize) -> usize {
        let offset = offset.min(self.total_length);
        match self.line_starts.binary_search(&offset) {
            // Offset is exactly the first byte of a line
            Ok(idx) => idx + 1,
            // Offset falls inside the line that starts before the insertion point
            Err(idx) => idx,
        }
    }

    /// Byte offset of the first character of a 1-based line
    ///
    /// Returns None for line 0 or lines past the end of the text.
    pub fn offset_for_line(&self, line: usize) -> Option<usize> {
        line.checked_sub(1)
            .and_then(|idx| self.line_starts.get(idx))
            .copied()
    }

    /// Get the total length of the text in bytes
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    /// Get the number of lines in the text
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// All line start offsets, in order
    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }
}
