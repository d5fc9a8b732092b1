/*
 * parser/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template parser.
//!
//! Turns a [`TokenStream`] into a [`Template`]. Text and code blocks become
//! nodes directly; each tag holds either a command (`name:argument`) or an
//! expression:
//!
//! - `{{ template:layout }}` selects how the template is compiled
//! - `{{ begin:name }}` ... `{{ end:name }}` defines a block
//! - `{{ block:name }}` displays a block defined elsewhere
//! - `{{ expr }}` outputs the value of `expr`; `{{ a = expr }}` assigns

pub mod expression;

pub use expression::{Associativity, ExpressionParser, OperatorInfo, binary_operator, unary_operator};

use crate::ast::{Block, Expression, Node, Template, TemplateKind};
use crate::config::Limits;
use crate::error::{TemplateError, TemplateResult};
use crate::lexer::{CODE, COMMENT};
use crate::token::{Token, TokenType};
use crate::token_stream::TokenStream;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

/// Single-quoted strings are matched so that `$` inside them is left alone.
static CODE_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'(?:[^'\\]|\\.)*'|\$([A-Za-z_\x{80}-\x{10FFFF}][A-Za-z0-9_\x{80}-\x{10FFFF}]*)")
        .unwrap()
});

/// A block between its `begin:` and `end:` tags.
#[derive(Debug)]
struct OpenBlock {
    name: String,
    line: usize,
    nodes: Vec<Node>,
}

/// Recursive-descent template parser.
#[derive(Debug, Default)]
pub struct Parser {
    limits: Limits,
    kind: Option<TemplateKind>,
    blocks: BTreeMap<String, usize>,
    open_blocks: Vec<OpenBlock>,
    nodes: Vec<Node>,
}

impl Parser {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Parse a whole template.
    pub fn parse(&mut self, mut stream: TokenStream<'_>) -> TemplateResult<Template> {
        self.kind = None;
        self.blocks.clear();
        self.open_blocks.clear();
        self.nodes.clear();

        loop {
            stream.skip_whitespace(true);
            let token = stream.current().clone();
            let line = token.line(stream.source()).unwrap_or(1);

            match token.ty {
                TokenType::EOF => {
                    if let Some(open) = self.open_blocks.last() {
                        return Err(TemplateError::syntax_on_line(
                            format!(
                                "The block '{}' defined on line {} was never closed.",
                                open.name, open.line
                            ),
                            line,
                            stream.source(),
                        ));
                    }
                    break;
                }
                TokenType::RAW => {
                    stream.next(false)?;
                    self.add_node(Node::Raw {
                        text: token.value().to_string(),
                        line,
                    });
                }
                TokenType::TAG_BEGIN => {
                    if let Some(node) = self.parse_tag(&mut stream)? {
                        self.add_node(node);
                    }
                }
                ty if ty == CODE => {
                    stream.next(false)?;
                    self.add_node(Node::RawPassthrough {
                        code: rewrite_code_variables(token.value()),
                        line,
                    });
                }
                ty if ty == COMMENT => {
                    stream.next(false)?;
                }
                ty => {
                    return Err(TemplateError::internal(
                        format!("Invalid token: {}", stream.types().name(ty)),
                        stream.source(),
                    ));
                }
            }
        }

        Ok(Template {
            name: stream.source().name().to_string(),
            kind: self.kind.unwrap_or_default(),
            body: std::mem::take(&mut self.nodes),
            blocks: std::mem::take(&mut self.blocks),
        })
    }

    /// Parse one `{{ ... }}` tag, returning the node it produces, if any.
    fn parse_tag(&mut self, stream: &mut TokenStream<'_>) -> TemplateResult<Option<Node>> {
        let begin = stream.next(true)?;
        if stream.current().ty == TokenType::TAG_END {
            return Err(stream.error_at(&begin, "Empty tag."));
        }

        let node = if is_command(stream) {
            self.parse_command(stream)?
        } else {
            let line = stream.current().line(stream.source()).unwrap_or(1);
            let expression =
                ExpressionParser::new(stream, self.limits.max_expression_depth).parse(0)?;
            Some(statement(expression, line))
        };

        stream.expect(TokenType::TAG_END, None, None)?;
        Ok(node)
    }

    fn parse_command(&mut self, stream: &mut TokenStream<'_>) -> TemplateResult<Option<Node>> {
        let command = stream.expect(TokenType::IDENTIFIER, None, None)?;
        stream.expect(TokenType::SEPARATOR, Some(":"), None)?;
        let hint = format!("The {} command needs a name", command.value());
        let argument = stream.expect(TokenType::IDENTIFIER, None, Some(hint.as_str()))?;
        let name = argument.value().to_string();
        let line = command.line(stream.source()).unwrap_or(1);

        match command.value() {
            "template" => {
                if line != 1 {
                    return Err(stream.error_at(
                        &command,
                        "The template command must appear on the first line.",
                    ));
                }
                if self.kind.is_some() {
                    return Err(
                        stream.error_at(&command, "The template command may only appear once.")
                    );
                }
                let kind = TemplateKind::from_name(&name).ok_or_else(|| {
                    stream.error_at(
                        &argument,
                        format!(
                            "Unknown template kind '{}', expected 'template' or 'layout'.",
                            name
                        ),
                    )
                })?;
                self.kind = Some(kind);
                Ok(None)
            }
            "begin" => {
                let first_line = self.blocks.get(&name).copied().or_else(|| {
                    self.open_blocks
                        .iter()
                        .find(|open| open.name == name)
                        .map(|open| open.line)
                });
                if let Some(first_line) = first_line {
                    return Err(stream.error_at(
                        &argument,
                        format!(
                            "The block '{}' has already been defined on line {}.",
                            name, first_line
                        ),
                    ));
                }
                if self.open_blocks.len() >= self.limits.max_block_depth {
                    return Err(stream.error_at(
                        &command,
                        format!(
                            "Blocks are nested too deeply (limit {}).",
                            self.limits.max_block_depth
                        ),
                    ));
                }
                tracing::trace!(block = %name, line, "opening block");
                self.open_blocks.push(OpenBlock {
                    name,
                    line,
                    nodes: Vec::new(),
                });
                Ok(None)
            }
            "end" => {
                let Some(open) = self.open_blocks.pop() else {
                    return Err(stream.error_at(
                        &argument,
                        format!("Unexpected end of block '{}', no block is open.", name),
                    ));
                };
                if open.name != name {
                    return Err(stream.error_at(
                        &argument,
                        format!(
                            "End of block mismatch, expected '{}' defined on line {} but found '{}'.",
                            open.name, open.line, name
                        ),
                    ));
                }
                tracing::trace!(block = %name, line = open.line, "closing block");
                self.blocks.insert(name.clone(), open.line);
                Ok(Some(Node::BlockReference {
                    name: name.clone(),
                    definition: Some(Block {
                        name,
                        body: open.nodes,
                        line: open.line,
                    }),
                    line: open.line,
                }))
            }
            "block" => Ok(Some(Node::BlockReference {
                name,
                definition: None,
                line,
            })),
            other => Err(stream.error_at(&command, format!("Unknown command '{}'.", other))),
        }
    }

    fn add_node(&mut self, node: Node) {
        match self.open_blocks.last_mut() {
            Some(open) => open.nodes.push(node),
            None => self.nodes.push(node),
        }
    }
}

/// `IDENTIFIER ':'`, allowing whitespace before the colon.
fn is_command(stream: &TokenStream<'_>) -> bool {
    if stream.current().ty != TokenType::IDENTIFIER {
        return false;
    }
    (1..)
        .map_while(|n| stream.peek(n))
        .find(|token: &&Token| !token.ty.is_whitespace())
        .is_some_and(|token| token.is(TokenType::SEPARATOR, Some(":")))
}

/// Assignments stand alone; any other expression is written to the output.
fn statement(expression: Expression, line: usize) -> Node {
    if expression.does_assign() {
        Node::Expression { expression, line }
    } else {
        Node::Output { expression, line }
    }
}

/// Point `$name` references in host code at the template's variable table.
pub fn rewrite_code_variables(code: &str) -> String {
    CODE_VARIABLE
        .replace_all(code, |caps: &Captures| match caps.get(1) {
            Some(name) if name.as_str() != "this" => format!("$this->vars['{}']", name.as_str()),
            _ => caps[0].to_string(),
        })
        .into_owned()
}
