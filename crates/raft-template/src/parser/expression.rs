/*
 * parser/expression.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Expression parsing by precedence climbing.

use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::error::{TemplateError, TemplateResult};
use crate::token::{Token, TokenType};
use crate::token_stream::TokenStream;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// Binding of a binary operator. Higher precedence binds tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorInfo {
    pub precedence: u8,
    pub associativity: Associativity,
    pub operator: BinaryOperator,
}

const fn info(precedence: u8, associativity: Associativity, operator: BinaryOperator) -> OperatorInfo {
    OperatorInfo {
        precedence,
        associativity,
        operator,
    }
}

use Associativity::{Left, Right};

/// Binary operators by lexeme.
pub static BINARY_OPERATORS: &[(&str, OperatorInfo)] = &[
    ("=", info(10, Left, BinaryOperator::Assign)),
    ("??", info(20, Right, BinaryOperator::NullCoalesce)),
    ("or", info(30, Left, BinaryOperator::Or)),
    ("||", info(30, Left, BinaryOperator::Or)),
    ("and", info(40, Left, BinaryOperator::And)),
    ("&&", info(40, Left, BinaryOperator::And)),
    ("==", info(60, Left, BinaryOperator::Equal)),
    ("!=", info(60, Left, BinaryOperator::NotEqual)),
    ("<", info(60, Left, BinaryOperator::Less)),
    (">", info(60, Left, BinaryOperator::Greater)),
    ("<=", info(60, Left, BinaryOperator::LessEqual)),
    (">=", info(60, Left, BinaryOperator::GreaterEqual)),
    ("~", info(80, Left, BinaryOperator::Concat)),
    ("+", info(100, Left, BinaryOperator::Add)),
    ("-", info(100, Left, BinaryOperator::Subtract)),
    ("*", info(110, Left, BinaryOperator::Multiply)),
    ("/", info(110, Left, BinaryOperator::Divide)),
    ("%", info(110, Left, BinaryOperator::Modulo)),
    ("**", info(130, Right, BinaryOperator::Power)),
];

/// Prefix operators by lexeme.
pub static UNARY_OPERATORS: &[(&str, UnaryOperator)] = &[
    ("!", UnaryOperator::Not),
    ("not", UnaryOperator::Not),
    ("-", UnaryOperator::Negate),
    ("+", UnaryOperator::Plus),
];

/// Precedence a prefix operator binds its operand with.
pub const UNARY_PRECEDENCE: u8 = 120;

pub fn binary_operator(lexeme: &str) -> Option<&'static OperatorInfo> {
    BINARY_OPERATORS
        .iter()
        .find(|(l, _)| *l == lexeme)
        .map(|(_, info)| info)
}

pub fn unary_operator(lexeme: &str) -> Option<UnaryOperator> {
    UNARY_OPERATORS
        .iter()
        .find(|(l, _)| *l == lexeme)
        .map(|(_, op)| *op)
}

/// Parses one expression from a token stream positioned at its first token.
pub struct ExpressionParser<'p, 's> {
    stream: &'p mut TokenStream<'s>,
    max_depth: usize,
    depth: usize,
}

impl<'p, 's> ExpressionParser<'p, 's> {
    pub fn new(stream: &'p mut TokenStream<'s>, max_depth: usize) -> Self {
        Self {
            stream,
            max_depth,
            depth: 0,
        }
    }

    /// Parse an expression whose binary operators bind at least as tightly
    /// as `min_precedence`.
    pub fn parse(&mut self, min_precedence: u8) -> TemplateResult<Expression> {
        self.parse_sized(min_precedence).map(|(expression, _)| expression)
    }

    /// Parse an expression along with the height of its tree. Both the
    /// recursion depth and the height are bounded by `max_depth`, so operator
    /// chains folded in a loop are limited like nested ones.
    fn parse_sized(&mut self, min_precedence: u8) -> TemplateResult<(Expression, usize)> {
        if self.depth >= self.max_depth {
            return Err(self.too_deep(self.stream.current()));
        }
        self.depth += 1;
        let result = self
            .parse_primary()
            .and_then(|(lhs, height)| self.parse_binary(lhs, height, min_precedence));
        self.depth -= 1;
        result
    }

    fn parse_binary(
        &mut self,
        mut lhs: Expression,
        mut height: usize,
        min_precedence: u8,
    ) -> TemplateResult<(Expression, usize)> {
        loop {
            let token = self.stream.current().clone();
            let (info, signed_number) = match token.ty {
                TokenType::OPERATOR => match binary_operator(token.value()) {
                    Some(info) => (info, None),
                    None => break,
                },
                // `a -1` lexes the sign into the number; read it as `a - 1`
                TokenType::NUMBER => match split_sign(token.value()) {
                    Some((sign, digits)) => match binary_operator(sign) {
                        Some(info) => (info, Some(digits.to_string())),
                        None => break,
                    },
                    None => break,
                },
                _ => break,
            };
            if info.precedence < min_precedence {
                break;
            }

            if info.operator == BinaryOperator::Assign && !lhs.is_variable() {
                return Err(self.stream.error_at(
                    &token,
                    "Cannot assign to an expression, the left side of \"=\" must be a variable.",
                ));
            }

            let next_min = match info.associativity {
                Associativity::Left => info.precedence + 1,
                Associativity::Right => info.precedence,
            };
            self.stream.next(true)?;
            let (rhs, rhs_height) = match signed_number {
                Some(digits) => {
                    let operand = self.number(&token, &digits)?;
                    self.parse_binary(operand, 1, next_min)?
                }
                None => self.parse_sized(next_min)?,
            };
            height = self.grow(height.max(rhs_height), &token)?;
            lhs = Expression::binary(info.operator, lhs, rhs);
        }
        Ok((lhs, height))
    }

    fn parse_primary(&mut self) -> TemplateResult<(Expression, usize)> {
        let token = self.stream.current().clone();
        match token.ty {
            TokenType::OPERATOR => match unary_operator(token.value()) {
                Some(operator) => {
                    self.stream.next(true)?;
                    let (operand, height) = self.parse_sized(UNARY_PRECEDENCE)?;
                    let height = self.grow(height, &token)?;
                    Ok((Expression::unary(operator, operand), height))
                }
                None => Err(self.unexpected(&token)),
            },
            TokenType::IDENTIFIER => {
                self.stream.next(true)?;
                if self.stream.current().is(TokenType::DELIMITER, Some("(")) {
                    return Err(self.stream.error_at(
                        &token,
                        format!("Unknown function \"{}\".", token.value()),
                    ));
                }
                Ok((identifier(token.value()), 1))
            }
            TokenType::NUMBER => {
                self.stream.next(true)?;
                Ok((self.number(&token, token.value())?, 1))
            }
            TokenType::STRING => self.parse_strings(),
            TokenType::DELIMITER if token.value() == "(" => {
                self.stream.next(true)?;
                let inner = self.parse_sized(0)?;
                self.stream.expect(
                    TokenType::DELIMITER,
                    Some(")"),
                    Some("An opened parenthesis is not properly closed"),
                )?;
                Ok(inner)
            }
            _ => Err(self.unexpected(&token)),
        }
    }

    /// Adjacent strings are joined into a concatenation.
    fn parse_strings(&mut self) -> TemplateResult<(Expression, usize)> {
        let first = self.stream.next(true)?;
        let mut expr = Expression::Constant(Value::String(unescape(first.value())));
        let mut height = 1;
        while let Some(next) = self.stream.next_if(TokenType::STRING, None)? {
            height = self.grow(height, &next)?;
            let rhs = Expression::Constant(Value::String(unescape(next.value())));
            expr = Expression::binary(BinaryOperator::Concat, expr, rhs);
        }
        Ok((expr, height))
    }

    /// Height of a node over a subtree of `height`, if still within bounds.
    fn grow(&self, height: usize, token: &Token) -> TemplateResult<usize> {
        if height >= self.max_depth {
            return Err(self.too_deep(token));
        }
        Ok(height + 1)
    }

    fn too_deep(&self, token: &Token) -> TemplateError {
        self.stream.error_at(
            token,
            format!("Expression is nested too deeply (limit {}).", self.max_depth),
        )
    }

    fn number(&self, token: &Token, text: &str) -> TemplateResult<Expression> {
        parse_number(text)
            .map(Expression::Constant)
            .ok_or_else(|| self.stream.error_at(token, format!("Invalid number \"{}\".", text)))
    }

    fn unexpected(&self, token: &Token) -> TemplateError {
        let what = self.stream.types().long_name(token.ty);
        if token.ty == TokenType::TAG_END || token.ty == TokenType::EOF {
            self.stream
                .error_at(token, format!("Unexpected {}, an expression was expected.", what))
        } else {
            self.stream
                .error_at(token, format!("Unexpected {} \"{}\".", what, token.value()))
        }
    }
}

fn identifier(name: &str) -> Expression {
    match name.to_lowercase().as_str() {
        "true" => Expression::Constant(Value::Bool(true)),
        "false" => Expression::Constant(Value::Bool(false)),
        "null" => Expression::Constant(Value::Null),
        _ => Expression::variable(name),
    }
}

fn split_sign(number: &str) -> Option<(&str, &str)> {
    if number.starts_with(['+', '-']) {
        Some(number.split_at(1))
    } else {
        None
    }
}

/// Integer when the text is integral and fits, float otherwise.
pub fn parse_number(text: &str) -> Option<Value> {
    let integral = !text.contains(['.', 'e', 'E']);
    if integral && let Ok(i) = text.parse::<i64>() {
        return Some(Value::Int(i));
    }
    text.parse::<f64>().ok().map(Value::Float)
}

/// Resolve `\\` and `\'` in a string literal; other escapes stay as written.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' && matches!(chars.peek(), Some('\\') | Some('\'')) {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(ch);
        }
    }
    out
}
