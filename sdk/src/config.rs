//! Store configuration

use crate::entity::DecoratorError;
use anyhow::{Context, Result, anyhow};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for the bundled in-memory backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(
    default,
    setter(into),
    build_fn(validate = "Self::validate", error = "DecoratorError")
)]
#[serde(default)]
pub struct StoreConfig {
    /// First identifier handed out for each entity type
    pub first_id: i64,
    /// Property defaults applied to new node-like records
    pub node_defaults: NodeDefaults,
    /// Log every executed query at info level
    pub log_queries: bool,
}

/// Defaults for new node-like records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDefaults {
    pub status: i64,
    pub promote: i64,
    pub sticky: i64,
    pub uid: i64,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            status: 1,
            promote: 1,
            sticky: 0,
            uid: 0,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            first_id: 1,
            node_defaults: NodeDefaults::default(),
            log_queries: false,
        }
    }
}

impl StoreConfig {
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Load configuration from a YAML (`.yaml`, `.yml`) or JSON (`.json`) file
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Err(anyhow!("Unsupported config format: {}", path.display())),
        }
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), DecoratorError> {
        check_first_id(self.first_id)
    }
}

impl StoreConfigBuilder {
    fn validate(&self) -> Result<(), DecoratorError> {
        self.first_id.map_or(Ok(()), check_first_id)
    }
}

fn check_first_id(first_id: i64) -> Result<(), DecoratorError> {
    if first_id < 1 {
        return Err(DecoratorError::configuration(format!(
            "first_id must be positive, got {}",
            first_id
        )));
    }
    Ok(())
}
