//! AST dump command.

use super::{load_engine, load_source, parse};
use anyhow::Result;
use raft_source_map::Source;
use raft_template::Engine;
use std::path::Path;

/// Execute the ast command
pub fn execute(config: Option<&Path>, file: &Path) -> Result<()> {
    let engine = load_engine(config)?;
    let source = load_source(file)?;
    println!("{}", run(&engine, &source)?);
    Ok(())
}

/// The parsed template as pretty-printed JSON.
pub fn run(engine: &Engine, source: &Source) -> Result<String> {
    let template = parse(engine, source)?;
    Ok(serde_json::to_string_pretty(&template)?)
}
