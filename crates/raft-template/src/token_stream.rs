/*
 * token_stream.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! A cursor over lexed tokens.

use crate::error::{ErrorContext, TemplateError, TemplateResult};
use crate::token::{Token, TokenType, TokenTypeRegistry};
use raft_source_map::{Source, Span};
use std::fmt;

/// Tokens of one template plus a read position.
///
/// The stream always ends with an EOF token, so [`current`](Self::current)
/// is valid for the stream's whole life.
#[derive(Debug, Clone)]
pub struct TokenStream<'s> {
    tokens: Vec<Token>,
    position: usize,
    source: &'s Source,
    types: TokenTypeRegistry,
}

impl<'s> TokenStream<'s> {
    /// Build a stream, appending a synthesized EOF when the tokens lack one.
    pub fn new(mut tokens: Vec<Token>, source: &'s Source, types: TokenTypeRegistry) -> Self {
        if tokens.last().is_none_or(|t| t.ty != TokenType::EOF) {
            tokens.push(Token::spoof(TokenType::EOF, None));
        }
        Self {
            tokens,
            position: 0,
            source,
            types,
        }
    }

    pub fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub fn source(&self) -> &'s Source {
        self.source
    }

    pub fn types(&self) -> &TokenTypeRegistry {
        &self.types
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_end(&self) -> bool {
        self.current().ty == TokenType::EOF
    }

    /// Advance past the current token and return it.
    ///
    /// With `skip_whitespace`, whitespace and newline tokens after it are
    /// skipped too. Advancing past EOF is an error.
    pub fn next(&mut self, skip_whitespace: bool) -> TemplateResult<Token> {
        if self.position + 1 >= self.tokens.len() {
            return Err(self.error_at_current("Unexpected end of template."));
        }
        let token = self.tokens[self.position].clone();
        self.position += 1;
        if skip_whitespace {
            self.skip_whitespace(true);
        }
        Ok(token)
    }

    /// Skip whitespace tokens, and newline tokens when `and_newlines` is set.
    pub fn skip_whitespace(&mut self, and_newlines: bool) {
        loop {
            let ty = self.current().ty;
            let skip = ty == TokenType::WHITESPACE || (and_newlines && ty == TokenType::NEWLINE);
            if !skip || self.position + 1 >= self.tokens.len() {
                break;
            }
            self.position += 1;
        }
    }

    /// Advance only when the current token matches.
    pub fn next_if(&mut self, ty: TokenType, value: Option<&str>) -> TemplateResult<Option<Token>> {
        if self.current().is(ty, value) {
            self.next(true).map(Some)
        } else {
            Ok(None)
        }
    }

    /// The token `n` positions ahead of the current one.
    pub fn peek(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    /// Consume the current token if it matches, otherwise fail with a syntax
    /// error naming what was found and what was expected.
    pub fn expect(
        &mut self,
        ty: TokenType,
        value: Option<&str>,
        message: Option<&str>,
    ) -> TemplateResult<Token> {
        let token = self.current();
        if token.is(ty, value) {
            return self.next(true);
        }

        let mut text = String::new();
        if let Some(message) = message {
            text.push_str(message);
            text.push_str(". ");
        }
        text.push_str(&format!(
            "Unexpected {} \"{}\" ({} expected",
            self.types.long_name(token.ty),
            self.token_text(token),
            self.types.long_name(ty)
        ));
        if let Some(value) = value {
            text.push_str(&format!(" with value \"{}\"", value));
        }
        text.push_str(").");
        Err(self.error_at_current(text))
    }

    /// A syntax error pointing at the current token.
    pub fn error_at_current(&self, message: impl Into<String>) -> TemplateError {
        self.error_at(self.current(), message)
    }

    /// A syntax error pointing at `token`.
    pub fn error_at(&self, token: &Token, message: impl Into<String>) -> TemplateError {
        match token.offset {
            Some(offset) => {
                TemplateError::syntax_at(message, Span::new(offset, offset + token.len), self.source)
            }
            None => {
                let line = self.source.line_for_offset(self.source.len());
                TemplateError::Syntax(ErrorContext::new(message).at_line(line, self.source))
            }
        }
    }

    /// Source text of a token; its value for synthesized tokens.
    fn token_text<'a>(&'a self, token: &'a Token) -> &'a str {
        token
            .offset
            .and_then(|offset| self.source.token_text(offset, token.len))
            .unwrap_or_else(|| token.value())
    }
}

impl fmt::Display for TokenStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            writeln!(f, "{}", token.describe(self.source, &self.types))?;
        }
        Ok(())
    }
}
