//! Load configuration for document assembly.
//!
//! Controls how strictly section objects are built and how include
//! directives are followed. Every key is optional.
//!
//! # Example YAML
//!
//! ```yaml
//! required_fields: error
//! includes:
//!   enabled: true
//!   max_depth: 8
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What happens when a required section attribute is absent.
///
/// # Examples
///
/// ```
/// use apispec_document::RequiredPolicy;
///
/// assert_eq!(RequiredPolicy::default(), RequiredPolicy::Warn);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequiredPolicy {
    /// Log a warning and leave the attribute unset (the default).
    #[default]
    Warn,
    /// Fail the load with
    /// [`MissingRequiredField`](crate::DocumentError::MissingRequiredField).
    Error,
}

/// Settings for `#include:` directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeConfig {
    /// Follow include directives at all.
    pub enabled: bool,
    /// Maximum nesting depth; the root document's own includes are depth 1.
    pub max_depth: usize,
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: 16,
        }
    }
}

/// Top-level load configuration.
///
/// # Examples
///
/// ```
/// use apispec_document::{LoadConfig, RequiredPolicy};
///
/// let config: LoadConfig = serde_yaml::from_str("required_fields: error").unwrap();
/// assert_eq!(config.required_fields, RequiredPolicy::Error);
/// assert!(config.includes.enabled);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Required-attribute policy.
    pub required_fields: RequiredPolicy,
    /// Include handling.
    pub includes: IncludeConfig,
}

impl LoadConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DocumentError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::DocumentError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DocumentError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::DocumentError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns `true` if missing required attributes abort the load.
    pub fn is_strict(&self) -> bool {
        self.required_fields == RequiredPolicy::Error
    }

    /// Strict configuration: missing required attributes are errors.
    pub fn strict() -> Self {
        Self {
            required_fields: RequiredPolicy::Error,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_complete() {
        let yaml = r#"
required_fields: error
includes:
  enabled: false
  max_depth: 4
"#;
        let config: LoadConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.is_strict());
        assert!(!config.includes.enabled);
        assert_eq!(config.includes.max_depth, 4);
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: LoadConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, LoadConfig::default());
        assert_eq!(config.required_fields, RequiredPolicy::Warn);
        assert_eq!(config.includes.max_depth, 16);
    }

    #[test]
    fn test_partial_includes_section() {
        let config: LoadConfig = serde_yaml::from_str("includes: {max_depth: 2}").unwrap();
        assert!(config.includes.enabled);
        assert_eq!(config.includes.max_depth, 2);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(serde_yaml::from_str::<LoadConfig>("required_fields: maybe").is_err());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apispec.yml");

        let original = LoadConfig::strict();
        original.save(&path).unwrap();

        let loaded = LoadConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }
}
