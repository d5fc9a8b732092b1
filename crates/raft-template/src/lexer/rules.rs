/*
 * rules.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Matchers for the tokens found inside a tag.

use super::operator::match_operator;
use crate::token::TokenType;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A[\t\p{Zs}]+").unwrap());
static NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A(?:\r\n|\r|\n)+").unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\A[+-]?(?:0|[1-9][0-9]*)(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?").unwrap()
});
static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A[_\p{L}][_\p{L}\p{N}]*").unwrap());

const SEPARATORS: &[char] = &['?', ':', ',', '.', '|'];
const DELIMITERS: &[char] = &['(', ')', '[', ']'];

/// A token recognized at the lexer's cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub ty: TokenType,
    /// Bytes of source consumed.
    pub len: usize,
    /// Token value; differs from the consumed text only for strings.
    pub value: String,
}

impl RuleMatch {
    fn spanning(ty: TokenType, input: &str, len: usize) -> Self {
        Self {
            ty,
            len,
            value: input[..len].to_string(),
        }
    }
}

/// A tag-state matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Whitespace,
    Newline,
    TagEnd,
    Number,
    Operator,
    Separator,
    String,
    Delimiter,
    Identifier,
}

/// Rules in the order they are tried. The first one that consumes input wins.
pub const TAG_RULES: [Rule; 9] = [
    Rule::Whitespace,
    Rule::Newline,
    Rule::TagEnd,
    Rule::Number,
    Rule::Operator,
    Rule::Separator,
    Rule::String,
    Rule::Delimiter,
    Rule::Identifier,
];

impl Rule {
    /// Try this rule at the start of `input`; `tag_close` is the closing
    /// tag delimiter.
    pub fn apply(self, input: &str, tag_close: &str) -> Option<RuleMatch> {
        let regex_match = |re: &Regex, ty| {
            re.find(input)
                .map(|m| RuleMatch::spanning(ty, input, m.end()))
        };
        let char_match = |set: &[char], ty| {
            input
                .chars()
                .next()
                .filter(|c| set.contains(c))
                .map(|c| RuleMatch::spanning(ty, input, c.len_utf8()))
        };

        match self {
            Rule::Whitespace => regex_match(&WHITESPACE, TokenType::WHITESPACE),
            Rule::Newline => regex_match(&NEWLINE, TokenType::NEWLINE),
            Rule::TagEnd => input
                .starts_with(tag_close)
                .then(|| RuleMatch::spanning(TokenType::TAG_END, input, tag_close.len())),
            Rule::Number => regex_match(&NUMBER, TokenType::NUMBER),
            Rule::Operator => match_operator(input)
                .map(|len| RuleMatch::spanning(TokenType::OPERATOR, input, len)),
            Rule::Separator => char_match(SEPARATORS, TokenType::SEPARATOR),
            Rule::String => match_string(input).map(|len| RuleMatch {
                ty: TokenType::STRING,
                len,
                value: input[1..len - 1].to_string(),
            }),
            Rule::Delimiter => char_match(DELIMITERS, TokenType::DELIMITER),
            Rule::Identifier => regex_match(&IDENTIFIER, TokenType::IDENTIFIER),
        }
    }
}

/// Length of a single-quoted string at the start of `input`, quotes included.
///
/// A quote closes the string when it is preceded by an even number of
/// consecutive backslashes.
pub fn match_string(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'\'') {
        return None;
    }

    let mut backslashes = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        match b {
            b'\\' => backslashes += 1,
            b'\'' if backslashes % 2 == 0 => return Some(i + 1),
            _ => backslashes = 0,
        }
    }
    None
}
