/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template values.
//!
//! `Value` is used both for literal constants in the AST and for the
//! variables the reference [`Environment`](crate::Environment) renders with.

use serde::Serialize;
use std::cmp::Ordering;

/// A constant or runtime value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered key/value pairs.
    Array(Vec<(Value, Value)>),
}

/// A value coerced for arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

impl Value {
    /// Truthiness for logical operators.
    ///
    /// Null, false, zero, the empty string, the string `"0"` and the empty
    /// array are falsy. Everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty() && s != "0",
            Value::Array(items) => !items.is_empty(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render this value as output text.
    pub fn render(&self) -> String {
        match self {
            Value::Null | Value::Bool(false) => String::new(),
            Value::Bool(true) => "1".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => render_float(*f),
            Value::String(s) => s.clone(),
            Value::Array(_) => "Array".to_string(),
        }
    }

    /// Coerce to a number, or `None` when the value has no numeric reading.
    pub fn to_number(&self) -> Option<Number> {
        match self {
            Value::Null => Some(Number::Int(0)),
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            Value::String(s) if s.trim().is_empty() => Some(Number::Int(0)),
            Value::String(s) => numeric_string(s),
            Value::Array(_) => None,
        }
    }

    /// Compare two values: numerically when both have a numeric reading,
    /// otherwise by their rendered text.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => {
                match (numeric_string(a), numeric_string(b)) {
                    (Some(a), Some(b)) => compare_numbers(a, b),
                    _ => Some(a.cmp(b)),
                }
            }
            (Value::Bool(_), _) | (_, Value::Bool(_)) => {
                Some(self.is_truthy().cmp(&other.is_truthy()))
            }
            (Value::Array(_), _) | (_, Value::Array(_)) => {
                if self == other {
                    Some(Ordering::Equal)
                } else {
                    None
                }
            }
            _ => match (self.to_number(), other.to_number()) {
                (Some(a), Some(b)) => compare_numbers(a, b),
                _ => Some(self.render().cmp(&other.render())),
            },
        }
    }

    /// Loose equality used by `==` and `!=`.
    pub fn loose_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Look up a key in an array value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Array(items) => items
                .iter()
                .find(|(k, _)| k.render() == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

fn compare_numbers(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
        (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

/// Numeric reading of a string such as `" 42"` or `"1e1"`. Words like
/// `inf` or `nan` are not numeric.
fn numeric_string(s: &str) -> Option<Number> {
    let s = s.trim();
    let numeric_chars = s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if s.is_empty() || !numeric_chars {
        return None;
    }
    match s.parse::<i64>() {
        Ok(i) => Some(Number::Int(i)),
        Err(_) => s.parse::<f64>().ok().map(Number::Float),
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f.is_infinite() {
        let inf = if f > 0.0 { "INF" } else { "-INF" };
        inf.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (Value::Int(i as i64), Value::from(v)))
                    .collect(),
            ),
            serde_json::Value::Object(map) => Value::Array(
                map.into_iter()
                    .map(|(k, v)| (Value::String(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}
