//! Command implementations for the Raft CLI
//!
//! Each command module handles the CLI interface and delegates to
//! raft-template for the actual work.

pub mod ast;
pub mod compile;
pub mod render;
pub mod tokens;

use anyhow::{Context, Result, anyhow};
use raft_source_map::Source;
use raft_template::{Engine, EngineConfig, Template, TemplateError};
use std::io::IsTerminal;
use std::path::Path;
use tracing::debug;

/// Build the engine from an optional configuration file.
pub fn load_engine(config: Option<&Path>) -> Result<Engine> {
    let config = match config {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            EngineConfig::from_file(path)?
        }
        None => EngineConfig::default(),
    };
    Ok(Engine::new(config)?)
}

pub fn load_source(path: &Path) -> Result<Source> {
    Source::from_file(path).with_context(|| format!("Failed to read template {}", path.display()))
}

/// Parse a template, printing a source report on failure.
pub fn parse(engine: &Engine, source: &Source) -> Result<Template> {
    engine.parse(source).map_err(|e| report(e, source))
}

/// Print a diagnostic for `error` to stderr and turn it into an `anyhow` error.
pub fn report(error: TemplateError, source: &Source) -> anyhow::Error {
    let color = std::io::stderr().is_terminal();
    eprint!("{}", error.render_report(source, color));
    anyhow!("could not process template {}", source.name())
}
