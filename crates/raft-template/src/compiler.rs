/*
 * compiler.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Code generation.
//!
//! The compiler walks a [`Template`] and emits PHP source that drives a
//! runtime object through four calls:
//!
//! - `$this->output($text)` writes to the output
//! - `$this->vars['name']` reads or assigns a variable
//! - `$this->block("name", function () {...})` renders a block once and caches it
//! - `$this->displayBlock('name'[, $default])` outputs a block, preferring
//!   one supplied from outside the template

use crate::ast::{Block, Expression, Node, Template, TemplateKind};
use crate::value::Value;
use std::fmt::Write;

const INDENT: &str = "    ";

/// Append-only code buffer with an indentation level.
#[derive(Debug, Default)]
pub struct Compiler {
    indentation: usize,
    output: String,
}

impl Template {
    /// Generate code for this template.
    pub fn compile(&self) -> String {
        let mut compiler = Compiler::new();
        compiler.compile_template(self);
        compiler.into_output()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }

    pub fn indent(&mut self) -> &mut Self {
        self.indentation += 1;
        self
    }

    /// Decrease the indentation level.
    ///
    /// # Panics
    ///
    /// Panics if the indentation is already zero.
    pub fn outdent(&mut self) -> &mut Self {
        assert!(
            self.indentation > 0,
            "Unable to outdent as the indentation would become negative"
        );
        self.indentation -= 1;
        self
    }

    /// Append text as is.
    pub fn raw(&mut self, text: &str) -> &mut Self {
        self.output.push_str(text);
        self
    }

    /// Append text at the current indentation.
    pub fn write(&mut self, text: &str) -> &mut Self {
        for _ in 0..self.indentation {
            self.output.push_str(INDENT);
        }
        self.output.push_str(text);
        self
    }

    /// Append a double-quoted string literal.
    pub fn string(&mut self, value: &str) -> &mut Self {
        self.output.push('"');
        for ch in value.chars() {
            match ch {
                '\0' => self.output.push_str("\\000"),
                '\t' => self.output.push_str("\\t"),
                '\r' => self.output.push_str("\\r"),
                '\n' => self.output.push_str("\\n"),
                '"' | '$' | '\\' => {
                    self.output.push('\\');
                    self.output.push(ch);
                }
                c if c.is_ascii_control() => {
                    let _ = write!(self.output, "\\x{:02x}", c as u32);
                }
                c => self.output.push(c),
            }
        }
        self.output.push('"');
        self
    }

    /// Append the literal spelling of a value.
    pub fn repr(&mut self, value: &Value) -> &mut Self {
        match value {
            Value::Null => self.raw("null"),
            Value::Bool(b) => self.raw(if *b { "true" } else { "false" }),
            // The literal spelling of i64::MIN would read back as a float
            Value::Int(i64::MIN) => self.raw("PHP_INT_MIN"),
            Value::Int(i) => self.raw(&i.to_string()),
            Value::Float(f) => self.raw(&float_literal(*f)),
            Value::String(s) => self.string(s),
            Value::Array(items) => {
                self.raw("array(");
                for (i, (key, item)) in items.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    self.repr(key).raw(" => ").repr(item);
                }
                self.raw(")")
            }
        }
    }

    pub fn compile_template(&mut self, template: &Template) {
        self.write("<?php\n");
        match template.kind {
            TemplateKind::Template => {
                self.write("$template = function () {\n").indent();
                self.compile_nodes(&template.body);
                self.outdent().write("};\n");
            }
            TemplateKind::Layout => self.compile_nodes(&template.body),
        }
    }

    pub fn compile_nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.compile_node(node);
        }
    }

    pub fn compile_node(&mut self, node: &Node) {
        match node {
            Node::Raw { text, .. } => {
                self.write("$this->output(").string(text).raw(");\n");
            }
            Node::RawPassthrough { code, .. } => {
                self.raw(code).raw("\n");
            }
            Node::Output { expression, .. } => {
                self.write("$this->output(");
                self.compile_expression(expression);
                if expression.is_variable() {
                    self.raw(" ?? ''");
                }
                self.raw(");\n");
            }
            Node::Expression { expression, .. } => {
                self.write("");
                self.compile_expression(expression);
                self.raw(";\n");
            }
            Node::BlockReference {
                name, definition, ..
            } => {
                self.write("$this->displayBlock('").raw(name).raw("'");
                if let Some(block) = definition {
                    self.raw(", ");
                    self.compile_block(block);
                }
                self.raw(");\n");
            }
        }
    }

    fn compile_block(&mut self, block: &Block) {
        self.raw("$this->block(")
            .string(&block.name)
            .raw(", function () {\n")
            .indent();
        self.compile_nodes(&block.body);
        self.outdent().write("})");
    }

    pub fn compile_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Constant(value) => {
                self.repr(value);
            }
            Expression::Variable(name) => {
                self.raw("$this->vars['").raw(name).raw("']");
            }
            Expression::Binary { operator, lhs, rhs } => {
                self.compile_operand(lhs);
                self.raw(" ").raw(operator.php()).raw(" ");
                self.compile_operand(rhs);
            }
            Expression::Unary { operator, operand } => {
                self.raw(operator.php());
                self.compile_operand(operand);
            }
        }
    }

    /// Operator applications and negative numbers are parenthesized.
    fn compile_operand(&mut self, operand: &Expression) {
        let negative = matches!(
            operand,
            Expression::Constant(Value::Int(i)) if *i < 0
        ) || matches!(
            operand,
            Expression::Constant(Value::Float(f)) if f.is_sign_negative()
        );
        if operand.is_operation() || negative {
            self.raw("(");
            self.compile_expression(operand);
            self.raw(")");
        } else {
            self.compile_expression(operand);
        }
    }
}

/// A float literal that always reads back as a float.
fn float_literal(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f.is_infinite() {
        let inf = if f > 0.0 { "INF" } else { "-INF" };
        inf.to_string()
    } else {
        format!("{:?}", f)
    }
}
