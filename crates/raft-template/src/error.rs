/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template lexing, parsing and evaluation.

use raft_source_map::{Source, Span};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Message and source binding carried by syntax and internal errors.
///
/// The rendered form is `<message> in "<name>" at line <N>`, with a trailing
/// `.` or `?` of the raw message moved after the location.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    raw_message: String,
    line: Option<usize>,
    column: Option<usize>,
    span: Option<Span>,
    name: Option<String>,
    path: Option<PathBuf>,
}

impl ErrorContext {
    /// An error message with no source binding.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            raw_message: message.into(),
            line: None,
            column: None,
            span: None,
            name: None,
            path: None,
        }
    }

    /// Bind the error to a span of a source, resolving its line and column.
    pub fn at_span(mut self, span: Span, source: &Source) -> Self {
        self.line = Some(source.line_for_offset(span.start));
        self.column = Some(source.column_for_offset(span.start));
        self.span = Some(span);
        self.in_source(source)
    }

    /// Bind the error to a line of a source without a precise position.
    pub fn at_line(mut self, line: usize, source: &Source) -> Self {
        self.line = Some(line);
        self.in_source(source)
    }

    /// Record which template the error belongs to.
    pub fn in_source(mut self, source: &Source) -> Self {
        self.name = Some(source.name().to_string());
        self.path = source.path().map(Path::to_path_buf);
        self
    }

    pub fn raw_message(&self) -> &str {
        &self.raw_message
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn append_message(&mut self, message: &str) {
        self.raw_message.push_str(message);
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (message, trailing) = match self.raw_message.strip_suffix(['.', '?']) {
            Some(stripped) => (stripped, &self.raw_message[stripped.len()..]),
            None => (self.raw_message.as_str(), ""),
        };

        write!(f, "{}", message)?;
        if let Some(name) = &self.name {
            write!(f, " in \"{}\"", name)?;
        }
        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
        }
        write!(f, "{}", trailing)
    }
}

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template text is not valid template syntax.
    #[error("{0}")]
    Syntax(ErrorContext),

    /// The parser reached a state its grammar declares unreachable.
    #[error("Internal error: {0}")]
    Internal(ErrorContext),

    /// Error evaluating a template with the reference environment.
    #[error("Evaluation error: {message} at line {line}")]
    Evaluation { message: String, line: usize },

    /// A token type was given a second name.
    #[error("Token type {id} is already registered as \"{existing}\"")]
    DuplicateTokenType { id: u16, existing: String },

    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error (e.g., reading a template or config file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// A syntax error at a span of the source.
    pub fn syntax_at(message: impl Into<String>, span: Span, source: &Source) -> Self {
        TemplateError::Syntax(ErrorContext::new(message).at_span(span, source))
    }

    /// A syntax error on a line of the source.
    pub fn syntax_on_line(message: impl Into<String>, line: usize, source: &Source) -> Self {
        TemplateError::Syntax(ErrorContext::new(message).at_line(line, source))
    }

    /// An internal error bound to the source being parsed.
    pub fn internal(message: impl Into<String>, source: &Source) -> Self {
        TemplateError::Internal(ErrorContext::new(message).in_source(source))
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, TemplateError::Syntax(_))
    }

    /// Source binding of a syntax or internal error.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            TemplateError::Syntax(ctx) | TemplateError::Internal(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// The message without the source name and line appended.
    pub fn raw_message(&self) -> String {
        match self {
            TemplateError::Syntax(ctx) | TemplateError::Internal(ctx) => ctx.raw_message.clone(),
            TemplateError::Evaluation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// 1-based line the error refers to, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            TemplateError::Syntax(ctx) | TemplateError::Internal(ctx) => ctx.line,
            TemplateError::Evaluation { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Append text to the message, keeping the line and source binding.
    pub fn append_message(&mut self, text: &str) {
        match self {
            TemplateError::Syntax(ctx) | TemplateError::Internal(ctx) => ctx.append_message(text),
            TemplateError::Evaluation { message, .. } => message.push_str(text),
            TemplateError::Config(message) => message.push_str(text),
            TemplateError::DuplicateTokenType { .. } | TemplateError::Io(_) => {}
        }
    }

    /// Render the error with the offending source span highlighted.
    ///
    /// Errors without a span fall back to their one-line message.
    pub fn render_report(&self, source: &Source, color: bool) -> String {
        match self.context().and_then(|ctx| ctx.span.map(|span| (ctx, span))) {
            Some((ctx, span)) => render_ariadne(self, ctx, span, source, color)
                .unwrap_or_else(|| format!("{}\n", self)),
            None => format!("{}\n", self),
        }
    }
}

fn render_ariadne(
    error: &TemplateError,
    ctx: &ErrorContext,
    span: Span,
    source: &Source,
    color: bool,
) -> Option<String> {
    use ariadne::{Color, Config, Label, Report, ReportKind};

    let id = source
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| source.name().to_string());

    // Zero-width spans (e.g. end of input) still need one column to point at
    let end = span.end.max(span.start + 1).min(source.len().max(span.start));
    let title = match error {
        TemplateError::Internal(_) => format!("Internal error: {}", ctx.raw_message),
        _ => ctx.raw_message.clone(),
    };

    let report = Report::build(ReportKind::Error, id.clone(), span.start)
        .with_config(Config::default().with_color(color))
        .with_message(&title)
        .with_label(
            Label::new((id.clone(), span.start..end))
                .with_message(&ctx.raw_message)
                .with_color(Color::Red),
        )
        .finish();

    let mut output = Vec::new();
    report
        .write((id, ariadne::Source::from(source.code())), &mut output)
        .ok()?;
    String::from_utf8(output).ok()
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
