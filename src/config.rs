//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is built once at startup, either from code or from a
//! YAML file, and handed to [`crate::Pipeline::new`]. There is no global
//! configuration state.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! # Datum pipeline configuration
//! version: 1
//!
//! # ignore | warn | reject
//! unexpected_fields: reject
//!
//! # How many nested passes an embedded document may trigger.
//! max_expansion_depth: 4
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use structure::UnexpectedFieldPolicy;
use thiserror::Error;

pub const CONFIG_VERSION: u32 = 1;
pub const MAX_EXPANSION_DEPTH_LIMIT: usize = 16;

/// Semantic problems with an otherwise well-formed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported config version {0}, expected 1")]
    UnsupportedVersion(u32),

    #[error("max_expansion_depth must be between 1 and 16, got {0}")]
    InvalidExpansionDepth(usize),
}

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Configuration format version.
    pub version: u32,

    /// Handling of document members no record type declares.
    pub unexpected_fields: UnexpectedFieldPolicy,

    /// Depth limit for documents discovered during normalization.
    pub max_expansion_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            unexpected_fields: UnexpectedFieldPolicy::default(),
            max_expansion_depth: 4,
        }
    }
}

impl PipelineConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        if !(1..=MAX_EXPANSION_DEPTH_LIMIT).contains(&self.max_expansion_depth) {
            return Err(ConfigError::InvalidExpansionDepth(self.max_expansion_depth));
        }
        Ok(())
    }

    pub fn with_unexpected_fields(mut self, policy: UnexpectedFieldPolicy) -> Self {
        self.unexpected_fields = policy;
        self
    }

    pub fn with_max_expansion_depth(mut self, depth: usize) -> Self {
        self.max_expansion_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_load_valid_yaml() {
        let yaml = r#"
version: 1
unexpected_fields: warn
max_expansion_depth: 2
"#;

        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.unexpected_fields, UnexpectedFieldPolicy::Warn);
        assert_eq!(config.max_expansion_depth, 2);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = PipelineConfig::from_yaml("version: 1\n").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.unexpected_fields, UnexpectedFieldPolicy::Reject);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"version: 1\nunexpected_fields: ignore\n")
            .unwrap();

        let config = PipelineConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.unexpected_fields, UnexpectedFieldPolicy::Ignore);
    }

    #[test]
    fn test_missing_file() {
        let result = PipelineConfig::from_file("/nonexistent/datum.yaml");
        assert!(matches!(result, Err(ConfigLoadError::FileRead(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let result = PipelineConfig::from_yaml("version: 2\n");
        assert!(matches!(
            result,
            Err(ConfigLoadError::Validation(ConfigError::UnsupportedVersion(2)))
        ));
    }

    #[test]
    fn test_expansion_depth_bounds() {
        for depth in [0, MAX_EXPANSION_DEPTH_LIMIT + 1] {
            let config = PipelineConfig::default().with_max_expansion_depth(depth);
            assert_eq!(
                config.validate(),
                Err(ConfigError::InvalidExpansionDepth(depth))
            );
        }
        let config = PipelineConfig::default().with_max_expansion_depth(MAX_EXPANSION_DEPTH_LIMIT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_keys_and_policies_are_rejected() {
        assert!(matches!(
            PipelineConfig::from_yaml("version: 1\nunexpected_fields: shout\n"),
            Err(ConfigLoadError::YamlParse(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml("version: 1\nmax_depth: 3\n"),
            Err(ConfigLoadError::YamlParse(_))
        ));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = PipelineConfig::default()
            .with_unexpected_fields(UnexpectedFieldPolicy::Warn)
            .with_max_expansion_depth(8);
        let yaml = config.to_yaml().unwrap();
        assert_eq!(PipelineConfig::from_yaml(&yaml).unwrap(), config);
    }
}
