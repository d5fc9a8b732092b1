//! Source tracking for Raft templates
//!
//! This crate wraps template source text and answers the position queries
//! the lexer, parser and diagnostics need: which line and column a byte
//! offset falls on, where a line starts, and which text a token covers.
//!
//! # Overview
//!
//! The core types are:
//! - [`Source`]: Template text plus its logical name and optional path
//! - [`LineIndex`]: Precomputed line start offsets for fast lookups
//! - [`Location`] / [`Span`]: Resolved positions and byte ranges
//!
//! # Example
//!
//! ```rust
//! use raft_source_map::Source;
//!
//! let source = Source::new("Hello\n{{ name }}", "greeting");
//! assert_eq!(source.line_for_offset(6), 2);
//! assert_eq!(source.column_for_offset(9), 4);
//! assert_eq!(source.offset_for_line(2), Some(6));
//! ```

pub mod line_index;
pub mod source;
pub mod types;

// Re-export main types
pub use line_index::LineIndex;
pub use source::Source;
pub use types::{Location, Span};
