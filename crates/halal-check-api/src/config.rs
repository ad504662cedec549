//! YAML engine configuration.

use std::path::{Path, PathBuf};

use halal_check_kb::KnowledgeBaseFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_RECIPE_ITEMS: usize = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Knowledge Base file. Relative paths are resolved against the config file's directory.
    pub knowledge_base: PathBuf,
    /// Overrides extension-based format detection.
    #[serde(default)]
    pub format: Option<KnowledgeBaseFormat>,
    #[serde(default = "default_max_recipe_items")]
    pub max_recipe_items: usize,
}

fn default_max_recipe_items() -> usize {
    DEFAULT_MAX_RECIPE_ITEMS
}

impl EngineConfig {
    /// Config pointing straight at a Knowledge Base file, with defaults for the rest.
    #[must_use]
    pub fn for_knowledge_base(path: impl Into<PathBuf>) -> Self {
        Self {
            knowledge_base: path.into(),
            format: None,
            max_recipe_items: DEFAULT_MAX_RECIPE_ITEMS,
        }
    }

    /// Read and validate a YAML config file.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read, parsed or validated.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        if config.knowledge_base.is_relative() {
            if let Some(parent) = path.parent() {
                config.knowledge_base = parent.join(&config.knowledge_base);
            }
        }
        Ok(config)
    }

    /// Parse and validate YAML config text.
    ///
    /// # Errors
    /// Returns [`ConfigError`] on malformed YAML or invalid values.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`ConfigError::Validation`] for an empty Knowledge Base path or a zero recipe limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.knowledge_base.as_os_str().is_empty() {
            return Err(ConfigError::Validation("knowledge_base cannot be empty".into()));
        }
        if self.max_recipe_items == 0 {
            return Err(ConfigError::Validation(
                "max_recipe_items must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = match EngineConfig::parse("knowledge_base: data/ingredients.json\n") {
            Ok(config) => config,
            Err(err) => panic!("config should parse: {err}"),
        };
        assert_eq!(config.knowledge_base, PathBuf::from("data/ingredients.json"));
        assert_eq!(config.format, None);
        assert_eq!(config.max_recipe_items, DEFAULT_MAX_RECIPE_ITEMS);
    }

    #[test]
    fn explicit_format_and_limit_are_read() {
        let yaml = "knowledge_base: kb.txt\nformat: yaml\nmax_recipe_items: 12\n";
        let config = match EngineConfig::parse(yaml) {
            Ok(config) => config,
            Err(err) => panic!("config should parse: {err}"),
        };
        assert_eq!(config.format, Some(KnowledgeBaseFormat::Yaml));
        assert_eq!(config.max_recipe_items, 12);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            EngineConfig::parse("knowledge_base: \"\"\n"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            EngineConfig::parse("knowledge_base: kb.json\nmax_recipe_items: 0\n"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(EngineConfig::parse("max_recipe_items: 3\n"), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn relative_knowledge_base_resolves_against_config_dir() {
        let dir = std::env::temp_dir().join(format!("halal-check-config-{}", ulid::Ulid::new()));
        if let Err(err) = std::fs::create_dir_all(&dir) {
            panic!("failed to create temp dir: {err}");
        }
        let path = dir.join("engine.yaml");
        if let Err(err) = std::fs::write(&path, "knowledge_base: kb.json\n") {
            panic!("failed to write config: {err}");
        }
        let config = match EngineConfig::from_path(&path) {
            Ok(config) => config,
            Err(err) => panic!("config should load: {err}"),
        };
        assert_eq!(config.knowledge_base, dir.join("kb.json"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
