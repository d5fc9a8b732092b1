/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The template pipeline behind one configuration.

use crate::ast::Template;
use crate::config::EngineConfig;
use crate::error::TemplateResult;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::token_stream::TokenStream;
use raft_source_map::Source;
use std::path::Path;
use tracing::debug;

/// Runs lexing, parsing and code generation.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    lexer: Lexer,
}

impl Engine {
    pub fn new(config: EngineConfig) -> TemplateResult<Self> {
        config.validate()?;
        let lexer = Lexer::new(config.syntax.clone())?;
        Ok(Self { config, lexer })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    pub fn tokenize<'s>(&self, source: &'s Source) -> TemplateResult<TokenStream<'s>> {
        let stream = self.lexer.tokenize(source)?;
        debug!(
            source = source.name(),
            tokens = stream.tokens().len(),
            "tokenized template"
        );
        Ok(stream)
    }

    pub fn parse(&self, source: &Source) -> TemplateResult<Template> {
        let stream = self.tokenize(source)?;
        let template = Parser::new(self.config.limits.clone()).parse(stream)?;
        debug!(
            source = source.name(),
            nodes = template.body.len(),
            blocks = template.blocks.len(),
            kind = ?template.kind,
            "parsed template"
        );
        Ok(template)
    }

    /// Read and parse a template file.
    pub fn parse_file(&self, path: &Path) -> TemplateResult<Template> {
        let source = Source::from_file(path)?;
        self.parse(&source)
    }

    pub fn compile(&self, template: &Template) -> String {
        let code = template.compile();
        debug!(source = %template.name, bytes = code.len(), "compiled template");
        code
    }

    /// Parse and compile in one step.
    pub fn compile_source(&self, source: &Source) -> TemplateResult<String> {
        let template = self.parse(source)?;
        Ok(self.compile(&template))
    }
}

impl Default for Engine {
    fn default() -> Self {
        let config = EngineConfig::default();
        let lexer = Lexer::new(config.syntax.clone()).expect("default syntax is valid");
        Self { config, lexer }
    }
}
