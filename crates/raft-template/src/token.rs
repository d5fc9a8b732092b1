/*
 * token.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tokens and the token type registry.
//!
//! Token types are an open set of `u16` tags. The built-in types cover the
//! lexical classes every template has; extensions (the lexer's comment and
//! code tokens, for instance) live at [`TokenType::FIRST_EXTENSION`] and up
//! and are named through a [`TokenTypeRegistry`].

use crate::error::{TemplateError, TemplateResult};
use raft_source_map::Source;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// The type tag of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TokenType(pub u16);

impl TokenType {
    /// End of the template. Exactly one per stream, always last.
    pub const EOF: TokenType = TokenType(0);
    /// Text outside of tags, copied to the output.
    pub const RAW: TokenType = TokenType(1);
    /// Opening tag delimiter.
    pub const TAG_BEGIN: TokenType = TokenType(2);
    /// Closing tag delimiter.
    pub const TAG_END: TokenType = TokenType(3);
    /// Horizontal whitespace inside a tag.
    pub const WHITESPACE: TokenType = TokenType(4);
    /// One or more line breaks inside a tag.
    pub const NEWLINE: TokenType = TokenType(5);
    pub const IDENTIFIER: TokenType = TokenType(6);
    /// Single-quoted string; the value has its quotes stripped.
    pub const STRING: TokenType = TokenType(7);
    pub const NUMBER: TokenType = TokenType(8);
    /// Grouping characters `( ) [ ]`.
    pub const DELIMITER: TokenType = TokenType(9);
    pub const OPERATOR: TokenType = TokenType(10);
    /// Punctuation `? : , . |`.
    pub const SEPARATOR: TokenType = TokenType(11);

    /// First tag available to extensions.
    pub const FIRST_EXTENSION: u16 = 100;

    pub fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_EXTENSION
    }

    pub fn is_whitespace(self) -> bool {
        self == Self::WHITESPACE || self == Self::NEWLINE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TypeNames {
    short: String,
    long: Option<String>,
}

/// Display names for token types.
///
/// A registry starts out with the built-in types. Each type may be named
/// once; naming it again is an error rather than a silent override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTypeRegistry {
    names: BTreeMap<TokenType, TypeNames>,
}

impl Default for TokenTypeRegistry {
    fn default() -> Self {
        let mut registry = Self {
            names: BTreeMap::new(),
        };
        let builtins = [
            (TokenType::EOF, "EOF", "end of template"),
            (TokenType::RAW, "RAW", "text data"),
            (TokenType::TAG_BEGIN, "BEGIN", "begin of tag"),
            (TokenType::TAG_END, "END", "end of tag"),
            (TokenType::WHITESPACE, "WHITESPACE", "whitespace"),
            (TokenType::NEWLINE, "NEWLINE", "newline"),
            (TokenType::IDENTIFIER, "IDENTIFIER", "identifier"),
            (TokenType::STRING, "STRING", "string"),
            (TokenType::NUMBER, "NUMBER", "number"),
            (TokenType::DELIMITER, "DELIMITER", "delimiter"),
            (TokenType::OPERATOR, "OPERATOR", "operator"),
            (TokenType::SEPARATOR, "SEPARATOR", "separator"),
        ];
        for (ty, short, long) in builtins {
            registry.names.insert(
                ty,
                TypeNames {
                    short: short.to_string(),
                    long: Some(long.to_string()),
                },
            );
        }
        registry
    }
}

impl TokenTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name a token type.
    pub fn register(
        &mut self,
        ty: TokenType,
        short: impl Into<String>,
        long: Option<&str>,
    ) -> TemplateResult<()> {
        if let Some(existing) = self.names.get(&ty) {
            return Err(TemplateError::DuplicateTokenType {
                id: ty.0,
                existing: existing.short.clone(),
            });
        }
        self.names.insert(
            ty,
            TypeNames {
                short: short.into(),
                long: long.map(str::to_string),
            },
        );
        Ok(())
    }

    /// Short upper-case name, e.g. `IDENTIFIER`.
    pub fn name(&self, ty: TokenType) -> Cow<'_, str> {
        match self.names.get(&ty) {
            Some(names) => Cow::Borrowed(names.short.as_str()),
            None => Cow::Owned(format!("TYPE{}", ty.0)),
        }
    }

    /// Name used in diagnostics, e.g. `end of tag`.
    pub fn long_name(&self, ty: TokenType) -> Cow<'_, str> {
        match self.names.get(&ty) {
            Some(TypeNames {
                long: Some(long), ..
            }) => Cow::Borrowed(long.as_str()),
            _ => self.name(ty),
        }
    }
}

/// A lexical unit.
///
/// A token without an offset is synthesized ("spoof") and has no position
/// in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub ty: TokenType,
    pub value: Option<String>,
    pub offset: Option<usize>,
    /// Length of the token's span in the source, in bytes.
    pub len: usize,
}

impl Token {
    /// A token read from the source at `offset`.
    pub fn new(ty: TokenType, value: impl Into<String>, offset: usize, len: usize) -> Self {
        Self {
            ty,
            value: Some(value.into()),
            offset: Some(offset),
            len,
        }
    }

    /// A synthesized token that does not come from the source.
    pub fn spoof(ty: TokenType, value: Option<&str>) -> Self {
        Self {
            ty,
            value: value.map(str::to_string),
            offset: None,
            len: 0,
        }
    }

    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    /// Test the type and, when given, the value.
    pub fn is(&self, ty: TokenType, value: Option<&str>) -> bool {
        self.ty == ty && value.is_none_or(|v| self.value.as_deref() == Some(v))
    }

    /// Test against any of several types.
    pub fn is_any(&self, types: &[TokenType]) -> bool {
        types.contains(&self.ty)
    }

    pub fn is_spoof(&self) -> bool {
        self.offset.is_none()
    }

    /// 1-based line in `source`, or `None` for a synthesized token.
    pub fn line(&self, source: &Source) -> Option<usize> {
        self.offset.map(|offset| source.line_for_offset(offset))
    }

    /// 1-based column in `source`, or `None` for a synthesized token.
    pub fn column(&self, source: &Source) -> Option<usize> {
        self.offset.map(|offset| source.column_for_offset(offset))
    }

    /// One-line description such as `  1,  7 IDENTIFIER name`.
    pub fn describe(&self, source: &Source, types: &TokenTypeRegistry) -> String {
        let name = types.name(self.ty);
        let position = match (self.line(source), self.column(source)) {
            (Some(line), Some(column)) => format!("{:3},{:3}", line, column),
            _ => "  -,  -".to_string(),
        };
        match &self.value {
            Some(value) => format!("{} {} {}", position, name, value),
            None => format!("{} {}", position, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_names() {
        let types = TokenTypeRegistry::new();
        assert_eq!(types.name(TokenType::TAG_BEGIN), "BEGIN");
        assert_eq!(types.long_name(TokenType::TAG_END), "end of tag");
        assert_eq!(types.name(TokenType(250)), "TYPE250");
        assert!(TokenType::SEPARATOR.is_builtin());
        assert!(!TokenType(TokenType::FIRST_EXTENSION).is_builtin());
    }

    #[test]
    fn test_register_extension() {
        let mut types = TokenTypeRegistry::new();
        types.register(TokenType(120), "MACRO", None).unwrap();
        assert_eq!(types.name(TokenType(120)), "MACRO");
        assert_eq!(types.long_name(TokenType(120)), "MACRO");
    }

    #[test]
    fn test_register_twice_fails() {
        let mut types = TokenTypeRegistry::new();
        let err = types
            .register(TokenType::STRING, "TEXT", Some("text"))
            .unwrap_err();
        assert!(matches!(
            err,
            TemplateError::DuplicateTokenType { id: 7, ref existing } if existing == "STRING"
        ));
    }

    #[test]
    fn test_is() {
        let token = Token::new(TokenType::OPERATOR, "==", 3, 2);
        assert!(token.is(TokenType::OPERATOR, None));
        assert!(token.is(TokenType::OPERATOR, Some("==")));
        assert!(!token.is(TokenType::OPERATOR, Some("=")));
        assert!(token.is_any(&[TokenType::SEPARATOR, TokenType::OPERATOR]));
    }

    #[test]
    fn test_position_and_description() {
        let source = Source::new("ab\ncd {{ x }}", "t");
        let types = TokenTypeRegistry::new();
        let token = Token::new(TokenType::IDENTIFIER, "x", 9, 1);
        assert_eq!(token.line(&source), Some(2));
        assert_eq!(token.column(&source), Some(7));
        assert_eq!(token.describe(&source, &types), "  2,  7 IDENTIFIER x");

        let spoof = Token::spoof(TokenType::EOF, None);
        assert!(spoof.is_spoof());
        assert_eq!(spoof.line(&source), None);
        assert_eq!(spoof.describe(&source, &types), "  -,  - EOF");
    }
}
