/*
 * environment.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Reference runtime.
//!
//! [`Environment`] renders a parsed [`Template`] directly, with the same
//! behavior compiled templates get from their runtime object: variables
//! default to null, a block is rendered at most once per render, and blocks
//! supplied from outside win over the template's own definitions.

use crate::ast::{BinaryOperator, Block, Expression, Node, Template, UnaryOperator};
use crate::error::{TemplateError, TemplateResult};
use crate::value::{Number, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Output of a render along with every block it rendered or was given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    pub output: String,
    pub blocks: BTreeMap<String, String>,
}

/// Variables and external blocks to render templates with.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, Value>,
    blocks: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Add every key of an object-like value as a variable.
    pub fn extend(&mut self, values: impl IntoIterator<Item = (String, Value)>) {
        self.vars.extend(values);
    }

    /// Supply a block from outside the template.
    pub fn set_block(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.blocks.insert(name.into(), content.into());
    }

    pub fn set_blocks(&mut self, blocks: BTreeMap<String, String>) {
        self.blocks.extend(blocks);
    }

    /// Render a template to text.
    pub fn render(&mut self, template: &Template) -> TemplateResult<String> {
        self.render_full(template).map(|rendered| rendered.output)
    }

    /// Render a template, also returning its blocks.
    ///
    /// Assignments made by the template persist in the environment.
    pub fn render_full(&mut self, template: &Template) -> TemplateResult<Rendered> {
        let mut run = Run {
            vars: &mut self.vars,
            blocks: self.blocks.clone(),
        };
        let mut output = String::new();
        run.render_nodes(&template.body, &mut output)?;
        Ok(Rendered {
            output,
            blocks: run.blocks,
        })
    }
}

/// State of one render call. The block cache starts from the external blocks.
struct Run<'e> {
    vars: &'e mut HashMap<String, Value>,
    blocks: BTreeMap<String, String>,
}

impl Run<'_> {
    fn render_nodes(&mut self, nodes: &[Node], output: &mut String) -> TemplateResult<()> {
        for node in nodes {
            self.render_node(node, output)?;
        }
        Ok(())
    }

    fn render_node(&mut self, node: &Node, output: &mut String) -> TemplateResult<()> {
        match node {
            Node::Raw { text, .. } => output.push_str(text),
            // Host code has no meaning to the reference runtime
            Node::RawPassthrough { .. } => {}
            Node::Output { expression, line } => {
                let value = self.eval(expression, *line)?;
                output.push_str(&value.render());
            }
            Node::Expression { expression, line } => {
                self.eval(expression, *line)?;
            }
            Node::BlockReference {
                name, definition, ..
            } => {
                let default = match definition {
                    Some(block) => self.block(block)?,
                    None => String::new(),
                };
                output.push_str(self.blocks.get(name).unwrap_or(&default));
            }
        }
        Ok(())
    }

    /// Render a block body, or fetch it if it was already rendered or given.
    fn block(&mut self, block: &Block) -> TemplateResult<String> {
        if let Some(content) = self.blocks.get(&block.name) {
            return Ok(content.clone());
        }
        let mut content = String::new();
        self.render_nodes(&block.body, &mut content)?;
        self.blocks.insert(block.name.clone(), content.clone());
        Ok(content)
    }

    fn eval(&mut self, expression: &Expression, line: usize) -> TemplateResult<Value> {
        match expression {
            Expression::Constant(value) => Ok(value.clone()),
            Expression::Variable(name) => Ok(self.vars.get(name).cloned().unwrap_or(Value::Null)),
            Expression::Unary { operator, operand } => {
                let value = self.eval(operand, line)?;
                match operator {
                    UnaryOperator::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOperator::Plus => Ok(number(&value, line)?.into()),
                    UnaryOperator::Negate => Ok(match number(&value, line)? {
                        Number::Int(i) => i
                            .checked_neg()
                            .map_or(Value::Float(-(i as f64)), Value::Int),
                        Number::Float(f) => Value::Float(-f),
                    }),
                }
            }
            Expression::Binary { operator, lhs, rhs } => match operator {
                BinaryOperator::Assign => {
                    let value = self.eval(rhs, line)?;
                    match lhs.as_ref() {
                        Expression::Variable(name) => {
                            self.vars.insert(name.clone(), value.clone());
                            Ok(value)
                        }
                        _ => Err(evaluation("Cannot assign to an expression", line)),
                    }
                }
                BinaryOperator::NullCoalesce => {
                    let value = self.eval(lhs, line)?;
                    if value.is_null() {
                        self.eval(rhs, line)
                    } else {
                        Ok(value)
                    }
                }
                BinaryOperator::Or => {
                    let truthy = self.eval(lhs, line)?.is_truthy() || self.eval(rhs, line)?.is_truthy();
                    Ok(Value::Bool(truthy))
                }
                BinaryOperator::And => {
                    let truthy = self.eval(lhs, line)?.is_truthy() && self.eval(rhs, line)?.is_truthy();
                    Ok(Value::Bool(truthy))
                }
                operator => {
                    let left = self.eval(lhs, line)?;
                    let right = self.eval(rhs, line)?;
                    apply(*operator, &left, &right, line)
                }
            },
        }
    }
}

fn evaluation(message: impl Into<String>, line: usize) -> TemplateError {
    TemplateError::Evaluation {
        message: message.into(),
        line,
    }
}

fn number(value: &Value, line: usize) -> TemplateResult<Number> {
    value.to_number().ok_or_else(|| match value {
        Value::Array(_) => evaluation("Unsupported operand type array", line),
        other => evaluation(format!("Non-numeric value \"{}\"", other.render()), line),
    })
}

/// Apply an operator whose operands are always both evaluated.
fn apply(operator: BinaryOperator, left: &Value, right: &Value, line: usize) -> TemplateResult<Value> {
    let compare = |test: fn(Ordering) -> bool| Value::Bool(left.compare(right).is_some_and(test));

    Ok(match operator {
        BinaryOperator::Equal => Value::Bool(left.loose_eq(right)),
        BinaryOperator::NotEqual => Value::Bool(!left.loose_eq(right)),
        BinaryOperator::Less => compare(Ordering::is_lt),
        BinaryOperator::Greater => compare(Ordering::is_gt),
        BinaryOperator::LessEqual => compare(Ordering::is_le),
        BinaryOperator::GreaterEqual => compare(Ordering::is_ge),
        BinaryOperator::Concat => Value::String(left.render() + &right.render()),
        _ => arithmetic(operator, number(left, line)?, number(right, line)?, line)?,
    })
}

fn arithmetic(operator: BinaryOperator, left: Number, right: Number, line: usize) -> TemplateResult<Value> {
    use Number::Int;

    let float = |f: fn(f64, f64) -> f64| Value::Float(f(left.as_f64(), right.as_f64()));

    Ok(match (operator, left, right) {
        (BinaryOperator::Add, Int(a), Int(b)) => a.checked_add(b).map_or_else(|| float(|a, b| a + b), Value::Int),
        (BinaryOperator::Add, _, _) => float(|a, b| a + b),
        (BinaryOperator::Subtract, Int(a), Int(b)) => {
            a.checked_sub(b).map_or_else(|| float(|a, b| a - b), Value::Int)
        }
        (BinaryOperator::Subtract, _, _) => float(|a, b| a - b),
        (BinaryOperator::Multiply, Int(a), Int(b)) => {
            a.checked_mul(b).map_or_else(|| float(|a, b| a * b), Value::Int)
        }
        (BinaryOperator::Multiply, _, _) => float(|a, b| a * b),
        (BinaryOperator::Divide, _, _) if right.as_f64() == 0.0 => {
            return Err(evaluation("Division by zero", line));
        }
        (BinaryOperator::Divide, Int(a), Int(b)) if a.checked_rem(b) == Some(0) => {
            a.checked_div(b).map_or_else(|| float(|a, b| a / b), Value::Int)
        }
        (BinaryOperator::Divide, _, _) => float(|a, b| a / b),
        (BinaryOperator::Modulo, _, _) => {
            let (a, b) = (truncate(left), truncate(right));
            if b == 0 {
                return Err(evaluation("Modulo by zero", line));
            }
            Value::Int(a.checked_rem(b).unwrap_or(0))
        }
        (BinaryOperator::Power, Int(a), Int(b)) if (0..=u32::MAX as i64).contains(&b) => a
            .checked_pow(b as u32)
            .map_or_else(|| float(f64::powf), Value::Int),
        (BinaryOperator::Power, _, _) => float(f64::powf),
        (other, _, _) => {
            return Err(evaluation(
                format!("Operator \"{}\" is not arithmetic", other.php()),
                line,
            ));
        }
    })
}

fn truncate(n: Number) -> i64 {
    match n {
        Number::Int(i) => i,
        Number::Float(f) => f as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyntaxConfig;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;
    use raft_source_map::Source;

    fn compile(code: &str) -> Template {
        let source = Source::new(code, "test");
        let stream = Lexer::new(SyntaxConfig::default())
            .unwrap()
            .tokenize(&source)
            .unwrap();
        Parser::default().parse(stream).unwrap()
    }

    fn render(code: &str) -> String {
        Environment::new().render(&compile(code)).unwrap()
    }

    #[test]
    fn test_hello_world() {
        let mut env = Environment::new();
        env.set("name", "World");
        assert_eq!(env.render(&compile("Hello {{ name }}!")).unwrap(), "Hello World!");
    }

    #[test]
    fn test_missing_variable_is_empty() {
        assert_eq!(render("[{{ missing }}]"), "[]");
        assert_eq!(render("{{ missing ?? 'default' }}"), "default");
    }

    #[test]
    fn test_comment_leaves_no_blank_line() {
        assert_eq!(render("{# note #}\nX"), "X");
    }

    #[test]
    fn test_assignment_persists() {
        let mut env = Environment::new();
        let out = env
            .render(&compile("{{ greeting = 'Hi' }}{{ greeting ~ ', ' ~ 'you' }}"))
            .unwrap();
        assert_eq!(out, "Hi, you");
        assert_eq!(env.get("greeting"), Some(&Value::from("Hi")));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(render("{{ 1 + 2 * 3 }}"), "7");
        assert_eq!(render("{{ (1 + 2) * 3 }}"), "9");
        assert_eq!(render("{{ 7 / 2 }}"), "3.5");
        assert_eq!(render("{{ 8 / 2 }}"), "4");
        assert_eq!(render("{{ 7 % 3 }}"), "1");
        assert_eq!(render("{{ 2 ** 10 }}"), "1024");
        assert_eq!(render("{{ 9223372036854775807 + 1 }}"), "9223372036854775808");
        assert_eq!(render("{{ '3' + 4 }}"), "7");
        assert_eq!(render("{{ -'2' }}"), "-2");
    }

    #[test]
    fn test_logic_and_comparison() {
        assert_eq!(render("{{ 1 < 2 and 'a' == 'a' }}"), "1");
        assert_eq!(render("{{ 1 > 2 or 0 }}"), "");
        assert_eq!(render("{{ !false }}"), "1");
        assert_eq!(render("{{ '10' == 10 }}"), "1");
        assert_eq!(render("{{ 'b' >= 'a' }}"), "1");
        assert_eq!(render("[{{ '10' < '9' }}][{{ '10' == '1e1' }}]"), "[][1]");
    }

    #[test]
    fn test_division_by_zero() {
        let err = Environment::new().render(&compile("\n{{ 1 / 0 }}")).unwrap_err();
        assert_eq!(err.to_string(), "Evaluation error: Division by zero at line 2");
        let err = Environment::new().render(&compile("{{ 1 % 0 }}")).unwrap_err();
        assert_eq!(err.raw_message(), "Modulo by zero");
    }

    #[test]
    fn test_non_numeric_operand() {
        let err = Environment::new().render(&compile("{{ 'abc' + 1 }}")).unwrap_err();
        assert_eq!(err.raw_message(), "Non-numeric value \"abc\"");
        assert_eq!(render("{{ ' 2' * '1e1' }}"), "20");
    }

    #[test]
    fn test_inline_block_is_displayed() {
        assert_eq!(render("<{{begin:a}}A{{end:a}}>"), "<A>");
    }

    #[test]
    fn test_block_rendered_once_per_render() {
        let template = compile("{{begin:a}}{{ n = n + 1 }}{{ n }}{{end:a}}{{block:a}}");
        let mut env = Environment::new();
        env.set("n", 0i64);
        assert_eq!(env.render(&template).unwrap(), "11");
        // The cache does not outlive the render
        assert_eq!(env.render(&template).unwrap(), "22");
    }

    #[test]
    fn test_external_block_wins() {
        let template = compile("[{{begin:title}}Default{{end:title}}] [{{block:missing}}]");
        let mut env = Environment::new();
        env.set_block("title", "Custom");
        assert_eq!(env.render(&template).unwrap(), "[Custom] []");
    }

    #[test]
    fn test_layout_receives_child_blocks() {
        let child = compile("{{begin:body}}Hello {{ name }}{{end:body}}");
        let layout = compile("{{ template:layout }}<main>{{block:body}}</main>");

        let mut env = Environment::new();
        env.set("name", "World");
        let rendered = env.render_full(&child).unwrap();
        assert_eq!(rendered.blocks.get("body").map(String::as_str), Some("Hello World"));

        let mut layout_env = Environment::new();
        layout_env.set_blocks(rendered.blocks);
        assert_eq!(layout_env.render(&layout).unwrap(), "<main>Hello World</main>");
    }
}
