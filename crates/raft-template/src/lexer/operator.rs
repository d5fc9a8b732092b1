/*
 * operator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Operator recognition by prefix trie.

/// One character of an operator spelling.
///
/// A node is `terminal` when the path from the root to it spells a complete
/// operator. Non-terminal nodes only lead to longer operators, so `?` and `|`
/// on their own are left to the separator rule.
#[derive(Debug)]
pub struct TrieNode {
    pub ch: char,
    pub terminal: bool,
    pub children: &'static [TrieNode],
}

macro_rules! op {
    ($ch:literal) => {
        TrieNode {
            ch: $ch,
            terminal: true,
            children: &[],
        }
    };
    ($ch:literal, $terminal:literal, [$($child:expr),* $(,)?]) => {
        TrieNode {
            ch: $ch,
            terminal: $terminal,
            children: &[$($child),*],
        }
    };
}

/// Every operator the lexer knows, as a trie over its characters.
pub static OPERATORS: &[TrieNode] = &[
    op!('=', true, [op!('=')]),
    op!('+', true, [op!('+')]),
    op!('-', true, [op!('-')]),
    op!('*', true, [op!('*')]),
    op!('/'),
    op!('%'),
    op!('<', true, [op!('=')]),
    op!('>', true, [op!('=')]),
    op!('!', true, [op!('=')]),
    op!('&', false, [op!('&')]),
    op!('|', false, [op!('|')]),
    op!('?', false, [op!('?'), op!(':')]),
    op!('~'),
    op!('a', false, [op!('n', false, [op!('d')])]),
    op!('o', false, [op!('r')]),
    op!('n', false, [op!('o', false, [op!('t')])]),
];

/// Length in bytes of the longest operator at the start of `input`.
///
/// Word operators (`and`, `or`, `not`) only match when they are not the
/// prefix of a longer identifier.
pub fn match_operator(input: &str) -> Option<usize> {
    let mut nodes = OPERATORS;
    let mut matched = None;

    for (i, ch) in input.char_indices() {
        let Some(node) = nodes.iter().find(|n| n.ch == ch) else {
            break;
        };
        if node.terminal {
            matched = Some(i + ch.len_utf8());
        }
        nodes = node.children;
        if nodes.is_empty() {
            break;
        }
    }

    let end = matched?;
    let is_word = input[..end].chars().all(char::is_alphabetic);
    if is_word && input[end..].chars().next().is_some_and(is_identifier_char) {
        return None;
    }
    Some(end)
}

pub(crate) fn is_identifier_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_match() {
        assert_eq!(match_operator("&&"), Some(2));
        assert_eq!(match_operator(">="), Some(2));
        assert_eq!(match_operator(">"), Some(1));
        assert_eq!(match_operator("==="), Some(2));
        assert_eq!(match_operator("**2"), Some(2));
        assert_eq!(match_operator("??x"), Some(2));
        assert_eq!(match_operator("?:"), Some(2));
        assert_eq!(match_operator("--1"), Some(2));
    }

    #[test]
    fn test_non_terminal_prefixes() {
        assert_eq!(match_operator("&"), None);
        assert_eq!(match_operator("| x"), None);
        assert_eq!(match_operator("?"), None);
        assert_eq!(match_operator("a"), None);
        assert_eq!(match_operator("an"), None);
    }

    #[test]
    fn test_word_operators() {
        assert_eq!(match_operator("and b"), Some(3));
        assert_eq!(match_operator("or)"), Some(2));
        assert_eq!(match_operator("not x"), Some(3));
        assert_eq!(match_operator("android"), None);
        assert_eq!(match_operator("order"), None);
        assert_eq!(match_operator("note"), None);
        assert_eq!(match_operator("and_x"), None);
    }

    #[test]
    fn test_every_operator_has_terminal_path() {
        fn check(nodes: &[TrieNode]) {
            for node in nodes {
                assert!(node.terminal || !node.children.is_empty(), "dead end at {:?}", node.ch);
                check(node.children);
            }
        }
        check(OPERATORS);
    }
}
