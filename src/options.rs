// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins::GLOBALS;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How the bodies of `{% raw %}` blocks are treated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawBlocks {
    /// Raw bodies are plain text and contribute no variables.
    #[default]
    Inert,
    /// Raw bodies are scanned like any other template text.
    Inspect,
}

/// Knobs for a variable extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineOptions {
    /// Maximum number of nested block scopes tracked individually.
    pub max_scope_depth: usize,
    pub raw_blocks: RawBlocks,
    /// Guess scalar types from names such as `age` or `is_active` when
    /// usage gives no hint.
    pub name_hints: bool,
    /// Extra names that are always provided by the rendering environment.
    pub globals: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_scope_depth: 64,
            raw_blocks: RawBlocks::Inert,
            name_hints: true,
            globals: vec![],
        }
    }
}

impl EngineOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid engine options")
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("invalid engine options")
    }

    /// Whether `name` is supplied by the environment rather than the context.
    pub fn is_global(&self, name: &str) -> bool {
        GLOBALS.contains(name) || self.globals.iter().any(|g| g == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let options = EngineOptions::from_json(r#"{"raw_blocks": "inspect", "globals": ["site"]}"#)
            .unwrap();
        assert_eq!(options.raw_blocks, RawBlocks::Inspect);
        assert_eq!(options.max_scope_depth, 64);
        assert!(options.name_hints);
        assert!(options.is_global("site"));
        assert!(options.is_global("range"));
        assert!(!options.is_global("user"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(EngineOptions::from_json(r#"{"max_depth": 3}"#).is_err());
    }
}
