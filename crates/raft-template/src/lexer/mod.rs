/*
 * lexer/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template tokenizer.
//!
//! The lexer is a small state machine. Outside of tags (the *data* state) it
//! jumps from one opening delimiter to the next, using positions found by a
//! single regex scan over the whole template. Inside a tag it applies the
//! [`TAG_RULES`](rules::TAG_RULES) in order until the closing delimiter.
//! Comments and code blocks are consumed whole.
//!
//! Every token except EOF covers the source text it came from, and together
//! they cover the template without gaps or overlaps.

mod operator;
mod rules;

pub use operator::{OPERATORS, TrieNode, match_operator};
pub use rules::{Rule, RuleMatch, TAG_RULES, match_string};

use crate::config::{Delimiters, SyntaxConfig};
use crate::error::{TemplateError, TemplateResult};
use crate::token::{Token, TokenType, TokenTypeRegistry};
use crate::token_stream::TokenStream;
use raft_source_map::{Source, Span};
use regex::Regex;

/// A `{# ... #}` comment, trailing newline included.
pub const COMMENT: TokenType = TokenType(TokenType::FIRST_EXTENSION);
/// A host-code passthrough block; the value is the code between delimiters.
///
/// The block ends at the first closing delimiter outside of a quoted string
/// or a `/* */` comment. Heredocs are not recognized.
pub const CODE: TokenType = TokenType(TokenType::FIRST_EXTENSION + 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DelimiterKind {
    Tag,
    Comment,
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    Tag,
    Comment,
    Code,
}

/// Tokenizer for one delimiter configuration.
#[derive(Debug, Clone)]
pub struct Lexer {
    syntax: SyntaxConfig,
    types: TokenTypeRegistry,
    delimiters: Regex,
    comment: Regex,
}

impl Lexer {
    pub fn new(syntax: SyntaxConfig) -> TemplateResult<Self> {
        let mut types = TokenTypeRegistry::new();
        types.register(COMMENT, "COMMENT", Some("comment"))?;
        types.register(CODE, "CODE", Some("code block"))?;

        let mut openers = vec![
            (syntax.tag.open.as_str(), "tag"),
            (syntax.comment.open.as_str(), "comment"),
        ];
        if let Some(code) = &syntax.code {
            openers.push((code.open.as_str(), "code"));
        }
        // Longest first, so a delimiter that prefixes another never shadows it
        openers.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        let alternation = openers
            .iter()
            .map(|(open, group)| format!("(?P<{}>{})", group, regex::escape(open)))
            .collect::<Vec<_>>()
            .join("|");

        let delimiters = compile(&alternation)?;
        let comment = compile(&enclosed(&syntax.comment, r"(?:\r\n|\n)?"))?;

        Ok(Self {
            syntax,
            types,
            delimiters,
            comment,
        })
    }

    pub fn syntax(&self) -> &SyntaxConfig {
        &self.syntax
    }

    pub fn types(&self) -> &TokenTypeRegistry {
        &self.types
    }

    /// Split a template into tokens.
    pub fn tokenize<'s>(&self, source: &'s Source) -> TemplateResult<TokenStream<'s>> {
        let positions = self
            .delimiters
            .captures_iter(source.code())
            .filter_map(|caps| {
                let kind = if caps.name("tag").is_some() {
                    DelimiterKind::Tag
                } else if caps.name("comment").is_some() {
                    DelimiterKind::Comment
                } else {
                    DelimiterKind::Code
                };
                caps.get(0).map(|m| (m.start(), kind))
            })
            .collect();

        let mut run = Run {
            lexer: self,
            source,
            code: source.code(),
            cursor: 0,
            tokens: Vec::new(),
            positions,
            next_position: 0,
            states: vec![State::Data],
            opened_at: 0,
        };
        run.lex()?;

        let mut tokens = run.tokens;
        tokens.push(Token {
            ty: TokenType::EOF,
            value: None,
            offset: Some(source.len()),
            len: 0,
        });
        Ok(TokenStream::new(tokens, source, self.types.clone()))
    }
}

fn compile(pattern: &str) -> TemplateResult<Regex> {
    Regex::new(pattern).map_err(|e| TemplateError::Config(e.to_string()))
}

/// Anchored pattern for a delimited region, capturing its content.
fn enclosed(delimiters: &Delimiters, trailer: &str) -> String {
    format!(
        r"\A{}((?s:.*?)){}{}",
        regex::escape(&delimiters.open),
        regex::escape(&delimiters.close),
        trailer
    )
}

/// Offset of the first `close` in host code that is not inside a quoted
/// string or a `/* */` comment.
fn code_end(code: &str, close: &str) -> Option<usize> {
    let bytes = code.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(close.as_bytes()) {
            return Some(i);
        }
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = code[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |end| i + 2 + end + 2);
            }
            _ => i += 1,
        }
    }
    None
}

/// State of a single `tokenize` call.
struct Run<'a> {
    lexer: &'a Lexer,
    source: &'a Source,
    code: &'a str,
    cursor: usize,
    tokens: Vec<Token>,
    positions: Vec<(usize, DelimiterKind)>,
    next_position: usize,
    states: Vec<State>,
    /// Offset of the delimiter that opened the current tag, comment or code.
    opened_at: usize,
}

impl Run<'_> {
    fn lex(&mut self) -> TemplateResult<()> {
        while let Some(state) = self.states.last().copied() {
            match state {
                State::Data => self.lex_data(),
                State::Tag => self.lex_tag()?,
                State::Comment => self.lex_comment()?,
                State::Code => self.lex_code()?,
            }
        }
        Ok(())
    }

    fn push(&mut self, ty: TokenType, len: usize, value: impl Into<String>) {
        self.tokens.push(Token::new(ty, value, self.cursor, len));
        self.cursor += len;
    }

    fn push_raw(&mut self, end: usize) {
        if end > self.cursor {
            let text = &self.code[self.cursor..end];
            self.push(TokenType::RAW, end - self.cursor, text);
        }
    }

    fn lex_data(&mut self) {
        while self
            .positions
            .get(self.next_position)
            .is_some_and(|(pos, _)| *pos < self.cursor)
        {
            self.next_position += 1;
        }

        let Some(&(pos, kind)) = self.positions.get(self.next_position) else {
            self.push_raw(self.code.len());
            self.states.pop();
            return;
        };
        self.next_position += 1;

        self.push_raw(pos);
        self.opened_at = pos;
        match kind {
            DelimiterKind::Tag => {
                let open = self.lexer.syntax.tag.open.clone();
                self.push(TokenType::TAG_BEGIN, open.len(), open);
                self.states.push(State::Tag);
            }
            DelimiterKind::Comment => self.states.push(State::Comment),
            DelimiterKind::Code => self.states.push(State::Code),
        }
    }

    fn lex_tag(&mut self) -> TemplateResult<()> {
        if self.cursor >= self.code.len() {
            return Err(self.unterminated("tag", &self.lexer.syntax.tag));
        }

        let rest = &self.code[self.cursor..];
        let close = &self.lexer.syntax.tag.close;
        let found = TAG_RULES
            .iter()
            .find_map(|rule| rule.apply(rest, close).filter(|m| m.len > 0));

        match found {
            Some(m) => {
                if m.ty == TokenType::TAG_END {
                    self.states.pop();
                }
                self.push(m.ty, m.len, m.value);
                Ok(())
            }
            None => {
                let ch = rest.chars().next().unwrap_or_default();
                let message = if ch == '\'' {
                    "Unterminated string".to_string()
                } else {
                    format!("Unexpected character \"{}\"", ch)
                };
                let span = Span::new(self.cursor, self.cursor + ch.len_utf8());
                Err(TemplateError::syntax_at(message, span, self.source))
            }
        }
    }

    fn lex_comment(&mut self) -> TemplateResult<()> {
        let delimiters = &self.lexer.syntax.comment;
        let rest = &self.code[self.cursor..];
        let Some(caps) = self.lexer.comment.captures(rest) else {
            return Err(self.unterminated("comment", delimiters));
        };
        let len = caps.get(0).map_or(0, |m| m.end());
        let value = caps.get(1).map_or("", |m| m.as_str()).to_string();
        self.push(COMMENT, len, value);
        self.states.pop();
        Ok(())
    }

    fn lex_code(&mut self) -> TemplateResult<()> {
        let Some(delimiters) = &self.lexer.syntax.code else {
            return Err(TemplateError::internal(
                "Code block without code delimiters",
                self.source,
            ));
        };
        let inner = &self.code[self.cursor + delimiters.open.len()..];
        let Some(end) = code_end(inner, &delimiters.close) else {
            return Err(self.unterminated("code block", delimiters));
        };
        let len = delimiters.open.len() + end + delimiters.close.len();
        self.push(CODE, len, &inner[..end]);
        self.states.pop();
        Ok(())
    }

    fn unterminated(&self, what: &str, delimiters: &Delimiters) -> TemplateError {
        let message = format!(
            "Unterminated {} at end-of-file (\"{}\" started on line {}), expecting \"{}\"",
            what,
            delimiters.open,
            self.source.line_for_offset(self.opened_at),
            delimiters.close
        );
        let end = self.code.len();
        TemplateError::syntax_at(message, Span::new(end, end), self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lexer() -> Lexer {
        Lexer::new(SyntaxConfig::default()).unwrap()
    }

    fn significant(code: &str) -> Vec<(TokenType, String)> {
        let source = Source::new(code, "noname");
        lexer()
            .tokenize(&source)
            .unwrap()
            .tokens()
            .iter()
            .filter(|t| !t.ty.is_whitespace())
            .map(|t| (t.ty, t.value().to_string()))
            .collect()
    }

    fn tok(ty: TokenType, value: &str) -> (TokenType, String) {
        (ty, value.to_string())
    }

    fn assert_reconstructs(code: &str) {
        let source = Source::new(code, "noname");
        let stream = lexer().tokenize(&source).unwrap();
        let mut rebuilt = String::new();
        let mut expected_offset = 0;
        for token in stream.tokens() {
            let offset = token.offset.unwrap();
            assert_eq!(offset, expected_offset, "gap or overlap before {:?}", token);
            rebuilt.push_str(source.token_text(offset, token.len).unwrap());
            expected_offset = offset + token.len;
        }
        assert_eq!(rebuilt, code);
        let eofs = stream.tokens().iter().filter(|t| t.ty == TokenType::EOF).count();
        assert_eq!(eofs, 1);
        assert_eq!(stream.tokens().last().map(|t| t.ty), Some(TokenType::EOF));
    }

    #[test]
    fn test_hello_world() {
        assert_eq!(
            significant("Hello {{ name }}!"),
            vec![
                tok(TokenType::RAW, "Hello "),
                tok(TokenType::TAG_BEGIN, "{{"),
                tok(TokenType::IDENTIFIER, "name"),
                tok(TokenType::TAG_END, "}}"),
                tok(TokenType::RAW, "!"),
                tok(TokenType::EOF, ""),
            ]
        );
    }

    #[test]
    fn test_empty_tag() {
        assert_eq!(
            significant("{{}}"),
            vec![
                tok(TokenType::TAG_BEGIN, "{{"),
                tok(TokenType::TAG_END, "}}"),
                tok(TokenType::EOF, ""),
            ]
        );
    }

    #[test]
    fn test_unicode_identifier() {
        let expected = vec![
            tok(TokenType::TAG_BEGIN, "{{"),
            tok(TokenType::IDENTIFIER, "ยง"),
            tok(TokenType::TAG_END, "}}"),
            tok(TokenType::EOF, ""),
        ];
        assert_eq!(significant("{{ยง}}"), expected);
        assert_eq!(significant("{{ ยง }}"), expected);
    }

    #[test]
    fn test_block_definition() {
        let tokens = significant("{{begin:test}}\n\tABC\n{{end:test}}");
        assert_eq!(
            tokens,
            vec![
                tok(TokenType::TAG_BEGIN, "{{"),
                tok(TokenType::IDENTIFIER, "begin"),
                tok(TokenType::SEPARATOR, ":"),
                tok(TokenType::IDENTIFIER, "test"),
                tok(TokenType::TAG_END, "}}"),
                tok(TokenType::RAW, "\n\tABC\n"),
                tok(TokenType::TAG_BEGIN, "{{"),
                tok(TokenType::IDENTIFIER, "end"),
                tok(TokenType::SEPARATOR, ":"),
                tok(TokenType::IDENTIFIER, "test"),
                tok(TokenType::TAG_END, "}}"),
                tok(TokenType::EOF, ""),
            ]
        );
    }

    #[test]
    fn test_assorted_tokens() {
        let tokens = significant("{{a + b * 'string', 1024--1 && | (-3.14 : abc[123])}}");
        assert_eq!(
            tokens,
            vec![
                tok(TokenType::TAG_BEGIN, "{{"),
                tok(TokenType::IDENTIFIER, "a"),
                tok(TokenType::OPERATOR, "+"),
                tok(TokenType::IDENTIFIER, "b"),
                tok(TokenType::OPERATOR, "*"),
                tok(TokenType::STRING, "string"),
                tok(TokenType::SEPARATOR, ","),
                tok(TokenType::NUMBER, "1024"),
                tok(TokenType::OPERATOR, "--"),
                tok(TokenType::NUMBER, "1"),
                tok(TokenType::OPERATOR, "&&"),
                tok(TokenType::SEPARATOR, "|"),
                tok(TokenType::DELIMITER, "("),
                tok(TokenType::NUMBER, "-3.14"),
                tok(TokenType::SEPARATOR, ":"),
                tok(TokenType::IDENTIFIER, "abc"),
                tok(TokenType::DELIMITER, "["),
                tok(TokenType::NUMBER, "123"),
                tok(TokenType::DELIMITER, "]"),
                tok(TokenType::DELIMITER, ")"),
                tok(TokenType::TAG_END, "}}"),
                tok(TokenType::EOF, ""),
            ]
        );
    }

    #[test]
    fn test_operators() {
        let ops = |code: &str| -> Vec<String> {
            significant(code)
                .into_iter()
                .filter(|(ty, _)| *ty == TokenType::OPERATOR)
                .map(|(_, v)| v)
                .collect()
        };
        assert_eq!(ops("{{??}}"), vec!["??"]);
        assert_eq!(ops("{{?:}}"), vec!["?:"]);
        assert_eq!(ops("{{and or}}"), vec!["and", "or"]);
        assert_eq!(ops("{{> <= ==}}"), vec![">", "<=", "=="]);
        assert_eq!(ops("{{a&&b>=c}}"), vec!["&&", ">="]);
    }

    #[test]
    fn test_comment_absorbs_one_newline() {
        let source = Source::new("{# note #}\nX", "noname");
        let stream = lexer().tokenize(&source).unwrap();
        let tokens = stream.tokens();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].ty, COMMENT);
        assert_eq!(tokens[0].value(), " note ");
        assert_eq!(tokens[0].len, 11);
        assert_eq!(tokens[1], Token::new(TokenType::RAW, "X", 11, 1));
        assert_eq!(tokens[2].ty, TokenType::EOF);

        // Only one newline is absorbed
        assert_eq!(
            significant("{# a #}\r\n\nX"),
            vec![
                tok(COMMENT, " a "),
                tok(TokenType::RAW, "\nX"),
                tok(TokenType::EOF, ""),
            ]
        );
    }

    #[test]
    fn test_code_block() {
        assert_eq!(
            significant("A<?php echo $x; ?>B{{ y }}"),
            vec![
                tok(TokenType::RAW, "A"),
                tok(CODE, " echo $x; "),
                tok(TokenType::RAW, "B"),
                tok(TokenType::TAG_BEGIN, "{{"),
                tok(TokenType::IDENTIFIER, "y"),
                tok(TokenType::TAG_END, "}}"),
                tok(TokenType::EOF, ""),
            ]
        );
    }

    #[test]
    fn test_code_block_skips_quoted_close() {
        assert_eq!(
            significant(r#"<?php echo '?>', "\"?>"; /* ?> */ ?>B"#),
            vec![
                tok(CODE, r#" echo '?>', "\"?>"; /* ?> */ "#),
                tok(TokenType::RAW, "B"),
                tok(TokenType::EOF, ""),
            ]
        );
        assert_eq!(
            code_end("echo 'é'; ?>", "?>"),
            Some("echo 'é'; ".len())
        );
        assert_eq!(code_end("echo '?>", "?>"), None);
    }

    #[test]
    fn test_unterminated_code_block() {
        let source = Source::new("a\n<?php echo 'x'", "t");
        let err = Lexer::new(SyntaxConfig::default())
            .unwrap()
            .tokenize(&source)
            .unwrap_err();
        assert_eq!(
            err.raw_message(),
            "Unterminated code block at end-of-file (\"<?php\" started on line 2), expecting \"?>\""
        );
    }

    #[test]
    fn test_delimiters_inside_strings_and_comments() {
        assert_eq!(
            significant("{{ '{{' }}{# {{ #}z"),
            vec![
                tok(TokenType::TAG_BEGIN, "{{"),
                tok(TokenType::STRING, "{{"),
                tok(TokenType::TAG_END, "}}"),
                tok(COMMENT, " {{ "),
                tok(TokenType::RAW, "z"),
                tok(TokenType::EOF, ""),
            ]
        );
    }

    #[test]
    fn test_custom_delimiters() {
        let mut syntax = SyntaxConfig::default();
        syntax.tag = Delimiters::new("<%", "%>");
        syntax.code = None;
        let lexer = Lexer::new(syntax).unwrap();
        let source = Source::new("a {{ b }} <% c %>", "noname");
        let stream = lexer.tokenize(&source).unwrap();
        let kinds: Vec<_> = stream
            .tokens()
            .iter()
            .filter(|t| !t.ty.is_whitespace())
            .map(|t| (t.ty, t.value().to_string()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                tok(TokenType::RAW, "a {{ b }} "),
                tok(TokenType::TAG_BEGIN, "<%"),
                tok(TokenType::IDENTIFIER, "c"),
                tok(TokenType::TAG_END, "%>"),
                tok(TokenType::EOF, ""),
            ]
        );
    }

    #[test]
    fn test_spans_reconstruct_input() {
        assert_reconstructs("");
        assert_reconstructs("plain text only");
        assert_reconstructs("Hello {{ name }}!");
        assert_reconstructs("{{ a\r\n  + 'b\\'c' }}\n{# x #}\n<?php $y ?>{{begin:t}}z{{end:t}}");
        assert_reconstructs("{{\ta ?? b ~ 'x' }}{{}}tail\n");
    }

    #[test]
    fn test_unterminated_tag() {
        let source = Source::new("{{", "noname");
        let err = lexer().tokenize(&source).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unterminated tag at end-of-file (\"{{\" started on line 1), expecting \"}}\" in \"noname\" at line 1"
        );
    }

    #[test]
    fn test_unterminated_comment() {
        let source = Source::new("{# test\n   test", "noname");
        let err = lexer().tokenize(&source).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unterminated comment at end-of-file (\"{#\" started on line 1), expecting \"#}\" in \"noname\" at line 2"
        );
    }

    #[test]
    fn test_unexpected_character() {
        let source = Source::new("ok\n{{ a @ b }}", "noname");
        let err = lexer().tokenize(&source).unwrap_err();
        assert!(err.is_syntax());
        assert_eq!(err.raw_message(), "Unexpected character \"@\"");
        assert_eq!(err.line(), Some(2));

        let source = Source::new("{{ 'abc }}", "noname");
        let err = lexer().tokenize(&source).unwrap_err();
        assert_eq!(err.raw_message(), "Unterminated string");
    }

    #[test]
    fn test_registry_names_extensions() {
        let lexer = lexer();
        assert_eq!(lexer.types().name(COMMENT), "COMMENT");
        assert_eq!(lexer.types().long_name(CODE), "code block");
    }
}
