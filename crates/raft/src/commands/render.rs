//! Render command.
//!
//! Renders a template with the reference runtime. Variables come from a
//! JSON object file (`--data`) and from `--var KEY=VALUE` flags, which win.
//! With `--layout`, the template is rendered first and its blocks are then
//! displayed by the layout.

use super::{load_engine, load_source, parse, report};
use anyhow::{Context, Result, bail};
use raft_template::{Environment, Value};
use std::path::PathBuf;
use tracing::{debug, info};

/// Arguments for the render command
#[derive(Debug)]
pub struct RenderArgs {
    pub file: PathBuf,
    pub data: Option<PathBuf>,
    pub vars: Vec<String>,
    pub layout: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    print!("{}", run(&args)?);
    Ok(())
}

pub fn run(args: &RenderArgs) -> Result<String> {
    let engine = load_engine(args.config.as_deref())?;
    let mut env = Environment::new();

    if let Some(path) = &args.data {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read data file {}", path.display()))?;
        let json: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;
        let serde_json::Value::Object(map) = json else {
            bail!("Data file {} must contain a JSON object", path.display());
        };
        debug!(path = %path.display(), vars = map.len(), "loaded data");
        env.extend(map.into_iter().map(|(k, v)| (k, Value::from(v))));
    }

    for var in &args.vars {
        let (name, value) = parse_var(var)?;
        env.set(name, value);
    }

    let source = load_source(&args.file)?;
    let template = parse(&engine, &source)?;
    let rendered = env.render_full(&template).map_err(|e| report(e, &source))?;

    let Some(layout_path) = &args.layout else {
        return Ok(rendered.output);
    };

    let layout_source = load_source(layout_path)?;
    let layout = parse(&engine, &layout_source)?;
    info!(
        template = %args.file.display(),
        layout = %layout_path.display(),
        blocks = rendered.blocks.len(),
        "rendering into layout"
    );
    env.set_blocks(rendered.blocks);
    env.render(&layout).map_err(|e| report(e, &layout_source))
}

/// Split `KEY=VALUE`, reading VALUE as JSON when possible.
fn parse_var(var: &str) -> Result<(String, Value)> {
    let Some((name, raw)) = var.split_once('=') else {
        bail!("Invalid variable '{}', expected KEY=VALUE", var);
    };
    let value = serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}
