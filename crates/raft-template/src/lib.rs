/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Raft template compiler.
//!
//! Templates are text with embedded tags:
//!
//! - Output: `{{ name }}`, `{{ title ?? 'Untitled' }}`, `{{ 'a' ~ b }}`
//! - Assignment: `{{ total = price * count }}`
//! - Blocks: `{{ begin:sidebar }}...{{ end:sidebar }}` and `{{ block:sidebar }}`
//! - Template kind: `{{ template:layout }}` on the first line
//! - Comments: `{# ... #}`
//! - Host code: `<?php ... ?>`, copied into the compiled output
//!
//! A template goes through a pipeline of [`Lexer`] → [`TokenStream`] →
//! [`Parser`] → [`Template`] → [`Compiler`], which produces PHP code for a
//! runtime object. [`Engine`] runs the pipeline for an [`EngineConfig`], and
//! [`Environment`] renders a [`Template`] directly in Rust.
//!
//! # Example
//!
//! ```
//! use raft_source_map::Source;
//! use raft_template::{Engine, Environment};
//!
//! let engine = Engine::default();
//! let template = engine.parse(&Source::new("Hello {{ name }}!", "greeting"))?;
//!
//! let mut env = Environment::new();
//! env.set("name", "World");
//! assert_eq!(env.render(&template)?, "Hello World!");
//!
//! let code = engine.compile(&template);
//! assert!(code.contains("$this->output($this->vars['name'] ?? '');"));
//! # Ok::<(), raft_template::TemplateError>(())
//! ```

pub mod ast;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod token_stream;
pub mod value;

// Re-export main types at crate root
pub use ast::{
    BinaryOperator, Block, Expression, Node, Template, TemplateKind, UnaryOperator,
};
pub use compiler::Compiler;
pub use config::{Delimiters, EngineConfig, Limits, SyntaxConfig};
pub use engine::Engine;
pub use environment::{Environment, Rendered};
pub use error::{ErrorContext, TemplateError, TemplateResult};
pub use lexer::Lexer;
pub use parser::{ExpressionParser, Parser};
pub use token::{Token, TokenType, TokenTypeRegistry};
pub use token_stream::TokenStream;
pub use value::Value;
