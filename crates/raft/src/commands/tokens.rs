//! Token dump command.

use super::{load_engine, load_source, report};
use anyhow::Result;
use raft_source_map::Source;
use raft_template::Engine;
use std::path::Path;

/// Execute the tokens command
pub fn execute(config: Option<&Path>, file: &Path) -> Result<()> {
    let engine = load_engine(config)?;
    let source = load_source(file)?;
    print!("{}", run(&engine, &source)?);
    Ok(())
}

/// One line per token: position, type name and value.
pub fn run(engine: &Engine, source: &Source) -> Result<String> {
    let stream = engine.tokenize(source).map_err(|e| report(e, source))?;
    Ok(stream.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_listing() {
        let source = Source::new("Hi {{ x }}", "t");
        let listing = run(&Engine::default(), &source).unwrap();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.first(), Some(&"  1,  1 RAW Hi "));
        assert!(lines.contains(&"  1,  4 BEGIN {{"));
        assert!(lines.contains(&"  1,  7 IDENTIFIER x"));
        assert!(lines.contains(&"  1,  9 END }}"));
        assert_eq!(lines.last(), Some(&"  1, 11 EOF"));
    }
}
