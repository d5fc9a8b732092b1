/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST types.
//!
//! A parsed template is a [`Template`] holding a list of [`Node`]s. Blocks
//! are owned by the [`Node::BlockReference`] that defines them, so the tree
//! has no back-references.

use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// How the compiled template is wrapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// Compiled into a closure assigned to `$template`.
    #[default]
    Template,
    /// Compiled as top-level code.
    Layout,
}

impl TemplateKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "template" => Some(TemplateKind::Template),
            "layout" => Some(TemplateKind::Layout),
            _ => None,
        }
    }
}

/// Root of a parsed template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    /// Logical name of the source the template was parsed from.
    pub name: String,
    pub kind: TemplateKind,
    pub body: Vec<Node>,
    /// Every block defined in the template, with its definition line.
    pub blocks: BTreeMap<String, usize>,
}

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// Literal text copied to the output.
    Raw { text: String, line: usize },

    /// Host code emitted verbatim into the compiled template.
    RawPassthrough { code: String, line: usize },

    /// `{{ expr }}`: an expression whose value is written to the output.
    Output { expression: Expression, line: usize },

    /// `{{ a = expr }}`: an expression evaluated for its side effect.
    Expression { expression: Expression, line: usize },

    /// `{{ block:name }}`, or the place a `begin:`/`end:` pair defined a block.
    BlockReference {
        name: String,
        definition: Option<Block>,
        line: usize,
    },
}

impl Node {
    /// 1-based line the node starts on.
    pub fn line(&self) -> usize {
        match self {
            Node::Raw { line, .. }
            | Node::RawPassthrough { line, .. }
            | Node::Output { line, .. }
            | Node::Expression { line, .. }
            | Node::BlockReference { line, .. } => *line,
        }
    }
}

/// A named block body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub name: String,
    pub body: Vec<Node>,
    /// Line of the `begin:` tag.
    pub line: usize,
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    Constant(Value),
    Variable(String),
    Binary {
        operator: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
}

impl Expression {
    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Expression::Constant(value.into())
    }

    pub fn binary(operator: BinaryOperator, lhs: Expression, rhs: Expression) -> Self {
        Expression::Binary {
            operator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(operator: UnaryOperator, operand: Expression) -> Self {
        Expression::Unary {
            operator,
            operand: Box::new(operand),
        }
    }

    /// Whether evaluating this expression stores a variable.
    pub fn does_assign(&self) -> bool {
        matches!(
            self,
            Expression::Binary {
                operator: BinaryOperator::Assign,
                ..
            }
        )
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Expression::Variable(_))
    }

    /// Whether this expression is an operator application.
    pub fn is_operation(&self) -> bool {
        matches!(self, Expression::Binary { .. } | Expression::Unary { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOperator {
    Assign,
    NullCoalesce,
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Concat,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

impl BinaryOperator {
    /// Spelling in generated code.
    pub fn php(self) -> &'static str {
        match self {
            BinaryOperator::Assign => "=",
            BinaryOperator::NullCoalesce => "??",
            BinaryOperator::Or => "||",
            BinaryOperator::And => "&&",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Concat => ".",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOperator {
    Not,
    Negate,
    Plus,
}

impl UnaryOperator {
    pub fn php(self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Negate => "-",
            UnaryOperator::Plus => "+",
        }
    }
}
