/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine configuration.
//!
//! Configuration is plain data deserialized with serde. Every field has a
//! default, so a config file only needs to name what it changes:
//!
//! ```toml
//! [syntax]
//! tag = { open = "<%", close = "%>" }
//!
//! [limits]
//! max_expression_depth = 128
//! ```

use crate::error::{TemplateError, TemplateResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An opening/closing delimiter pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Delimiters recognized by the lexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntaxConfig {
    /// Expression and command tags.
    pub tag: Delimiters,
    /// Comments, dropped from the output.
    pub comment: Delimiters,
    /// Host-code passthrough blocks. `None` disables them.
    pub code: Option<Delimiters>,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            tag: Delimiters::new("{{", "}}"),
            comment: Delimiters::new("{#", "#}"),
            code: Some(Delimiters::new("<?php", "?>")),
        }
    }
}

/// Recursion bounds for the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    pub max_expression_depth: usize,
    pub max_block_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_expression_depth: 64,
            max_block_depth: 32,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub syntax: SyntaxConfig,
    pub limits: Limits,
}

impl EngineConfig {
    /// Parse and validate a TOML configuration document.
    pub fn from_toml_str(text: &str) -> TemplateResult<Self> {
        let config: EngineConfig =
            toml::from_str(text).map_err(|e| TemplateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|mut e| {
            e.append_message(&format!(" (in {})", path.display()));
            e
        })
    }

    /// Check that the delimiters can drive the lexer.
    pub fn validate(&self) -> TemplateResult<()> {
        let mut pairs = vec![("tag", &self.syntax.tag), ("comment", &self.syntax.comment)];
        if let Some(code) = &self.syntax.code {
            pairs.push(("code", code));
        }

        for (kind, pair) in &pairs {
            if pair.open.is_empty() || pair.close.is_empty() {
                return Err(TemplateError::Config(format!(
                    "{} delimiters must not be empty",
                    kind
                )));
            }
        }

        for (i, (kind, pair)) in pairs.iter().enumerate() {
            for (other_kind, other) in &pairs[i + 1..] {
                if pair.open == other.open {
                    return Err(TemplateError::Config(format!(
                        "{} and {} share the opening delimiter \"{}\"",
                        kind, other_kind, pair.open
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.syntax.tag, Delimiters::new("{{", "}}"));
        assert_eq!(config.syntax.comment, Delimiters::new("{#", "#}"));
        assert_eq!(config.syntax.code, Some(Delimiters::new("<?php", "?>")));
        assert_eq!(config.limits.max_expression_depth, 64);
        assert_eq!(config.limits.max_block_depth, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [syntax]
            tag = { open = "<%", close = "%>" }

            [limits]
            max_expression_depth = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.syntax.tag, Delimiters::new("<%", "%>"));
        assert_eq!(config.syntax.comment, Delimiters::new("{#", "#}"));
        assert_eq!(config.limits.max_expression_depth, 8);
        assert_eq!(config.limits.max_block_depth, 32);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = EngineConfig::default();
        config.syntax.code = Some(Delimiters::new("<%=", "%>"));
        config.limits.max_block_depth = 4;

        let text = toml::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EngineConfig::from_toml_str("[syntax]\ntags = 1\n").unwrap_err();
        assert!(matches!(err, TemplateError::Config(_)));
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        let err = EngineConfig::from_toml_str("[syntax]\ntag = { open = \"\", close = \"}}\" }\n")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: tag delimiters must not be empty"
        );
    }

    #[test]
    fn test_shared_opening_delimiter_rejected() {
        let mut config = EngineConfig::default();
        config.syntax.comment = Delimiters::new("{{", "#}");
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: tag and comment share the opening delimiter \"{{\""
        );
    }
}
