//! Compile command.

use super::{load_engine, load_source, parse};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Execute the compile command
pub fn execute(config: Option<&Path>, file: &Path, output: Option<&Path>) -> Result<()> {
    let engine = load_engine(config)?;
    let source = load_source(file)?;
    let template = parse(&engine, &source)?;
    let code = engine.compile(&template);

    match output {
        Some(path) => {
            std::fs::write(path, &code)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(input = %file.display(), output = %path.display(), "compiled template");
        }
        None => print!("{}", code),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("hello.raft");
        let output = dir.path().join("hello.php");
        std::fs::write(&input, "Hello {{ name }}!").unwrap();

        execute(None, &input, Some(&output)).unwrap();

        let code = std::fs::read_to_string(&output).unwrap();
        assert!(code.starts_with("<?php\n$template = function () {\n"));
        assert!(code.contains("$this->output($this->vars['name'] ?? '');"));
    }

    #[test]
    fn test_compile_with_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("raft.toml");
        let input = dir.path().join("page.raft");
        let output = dir.path().join("page.php");
        std::fs::write(&config, "[syntax]\ntag = { open = \"[[\", close = \"]]\" }\n").unwrap();
        std::fs::write(&input, "{{ literal }}[[ x ]]").unwrap();

        execute(Some(&config), &input, Some(&output)).unwrap();

        let code = std::fs::read_to_string(&output).unwrap();
        assert!(code.contains("$this->output(\"{{ literal }}\");"));
        assert!(code.contains("$this->vars['x']"));
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(None, &dir.path().join("nope.raft"), None).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read template"));
    }
}
