//! Template source text with its identity

use crate::line_index::LineIndex;
use crate::types::{Location, Span};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The text of one template together with its logical name and optional path
///
/// The line index is built once at construction; a `Source` is immutable
/// afterwards. The name and path are only used for diagnostics and by
/// callers that key compiled output on them.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    code: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(skip)]
    lines: LineIndex,
}

impl Source {
    /// Create an in-memory source with a logical name
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        let code = code.into();
        let lines = LineIndex::new(&code);
        Source {
            code,
            name: name.into(),
            path: None,
            lines,
        }
    }

    /// Create a source backed by a file on disk
    pub fn with_path(
        code: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        let mut source = Self::new(code, name);
        source.path = Some(path.into());
        source
    }

    /// Read a source from disk, naming it after the file
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let code = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self::with_path(code, name, path))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.lines
    }

    /// 1-based line containing a byte offset
    pub fn line_for_offset(&self, offset: usize) -> usize {
        self.lines.line_for_offset(offset)
    }

    /// 1-based column of a byte offset, counted in characters
    pub fn column_for_offset(&self, offset: usize) -> usize {
        let offset = offset.min(self.code.len());
        let line = self.lines.line_for_offset(offset);
        let line_start = self.lines.offset_for_line(line).unwrap_or(0);
        let chars = match self.code.get(line_start..offset) {
            Some(prefix) => prefix.chars().count(),
            // Not on a char boundary; fall back to the byte distance
            None => offset - line_start,
        };
        chars + 1
    }

    /// Byte offset of the first character of a 1-based line
    pub fn offset_for_line(&self, line: usize) -> Option<usize> {
        self.lines.offset_for_line(line)
    }

    /// Resolve a byte offset to a full location
    pub fn location(&self, offset: usize) -> Location {
        Location {
            offset,
            line: self.line_for_offset(offset),
            column: self.column_for_offset(offset),
        }
    }

    /// Text covered by a span, or None if the span is out of bounds or
    /// splits a character
    pub fn slice(&self, span: Span) -> Option<&str> {
        self.code.get(span.start..span.end)
    }

    /// Text of `length` bytes starting at `start`
    pub fn token_text(&self, start: usize, length: usize) -> Option<&str> {
        self.slice(Span::new(start, start + length))
    }
}
