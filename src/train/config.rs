//! Declarative checkpoint configuration (YAML or JSON)

use super::monitor::{Mode, PersistScope, SavePolicy};
use super::template::PathTemplate;
use crate::io::ModelFormat;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_monitor() -> Option<String> {
    Some(super::checkpoint::DEFAULT_MONITOR.to_string())
}

fn default_cadence() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Checkpoint callback configuration
///
/// ```yaml
/// path_template: "checkpoints/model_{epoch:03d}_{val_acc:.4f}.json"
/// monitor: val_acc
/// save_policy: best_only
/// cadence: 2
/// verbose: true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Destination path with `{epoch}` / `{metric}` placeholders
    pub path_template: String,

    /// Metric that gates best-only saving
    #[serde(default = "default_monitor")]
    pub monitor: Option<String>,

    /// Comparison mode: "min" | "max" | "auto"
    #[serde(default)]
    pub mode: Mode,

    /// "always" | "best_only"
    #[serde(default)]
    pub save_policy: SavePolicy,

    /// "full_model" | "parameters_only"
    #[serde(default)]
    pub persist_scope: PersistScope,

    /// Attempt a save every N epochs
    #[serde(default = "default_cadence")]
    pub cadence: usize,

    /// Print a line for every save attempt
    #[serde(default)]
    pub verbose: bool,

    /// Serialization format for the default writer
    #[serde(default)]
    pub format: ModelFormat,

    /// Pretty-print text formats
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl CheckpointConfig {
    /// Minimal configuration: save every epoch to `path_template`
    pub fn new(path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
            monitor: default_monitor(),
            mode: Mode::default(),
            save_policy: SavePolicy::default(),
            persist_scope: PersistScope::default(),
            cadence: default_cadence(),
            verbose: false,
            format: ModelFormat::default(),
            pretty: true,
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::Configuration(format!("invalid checkpoint YAML: {e}")))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("invalid checkpoint JSON: {e}")))
    }

    /// Load from a `.yaml`, `.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match ModelFormat::from_path(path) {
            Some(ModelFormat::Yaml) => Self::from_yaml_str(&content),
            Some(ModelFormat::Json) => Self::from_json_str(&content),
            _ => Err(Error::Configuration(format!(
                "unsupported checkpoint config file: {}",
                path.display()
            ))),
        }
    }

    /// Check the template and cadence before building a callback
    pub fn validate(&self) -> Result<()> {
        PathTemplate::parse(&self.path_template)?;
        if self.cadence == 0 {
            return Err(Error::Configuration(
                "checkpoint cadence must be at least 1 epoch".to_string(),
            ));
        }
        if self.save_policy == SavePolicy::BestOnly && self.monitor.is_none() {
            return Err(Error::Configuration(
                "best-only saving requires a monitored metric".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::{Direction, ModelCheckpoint};
    use tempfile::TempDir;

    #[test]
    fn test_yaml_defaults() {
        let config = CheckpointConfig::from_yaml_str("path_template: m_{epoch}.json").unwrap();
        assert_eq!(config, CheckpointConfig::new("m_{epoch}.json"));
        assert_eq!(config.monitor.as_deref(), Some("val_loss"));
        assert_eq!(config.cadence, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_full() {
        let yaml = r#"
path_template: "ckpt/{epoch:03d}_{val_acc:.4f}.safetensors"
monitor: val_acc
mode: auto
save_policy: best_only
persist_scope: parameters_only
cadence: 2
verbose: true
format: safetensors
"#;
        let config = CheckpointConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.save_policy, SavePolicy::BestOnly);
        assert_eq!(config.persist_scope, PersistScope::ParametersOnly);
        assert_eq!(config.format, ModelFormat::SafeTensors);

        let cb = ModelCheckpoint::from_config(&config).unwrap();
        assert_eq!(cb.direction(), Direction::Maximize);
        assert_eq!(cb.cadence(), 2);
    }

    #[test]
    fn test_json_null_monitor() {
        let config =
            CheckpointConfig::from_json_str(r#"{"path_template": "m.json", "monitor": null}"#)
                .unwrap();
        assert!(config.monitor.is_none());
        assert!(config.validate().is_ok());

        let best_only = CheckpointConfig {
            save_policy: SavePolicy::BestOnly,
            ..config
        };
        assert!(best_only.validate().is_err());
    }

    #[test]
    fn test_missing_template_is_error() {
        let err = CheckpointConfig::from_yaml_str("monitor: val_loss").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(CheckpointConfig::new("").validate().is_err());
        assert!(CheckpointConfig::new("m_{epoch.json").validate().is_err());

        let zero = CheckpointConfig {
            cadence: 0,
            ..CheckpointConfig::new("m.json")
        };
        assert!(ModelCheckpoint::from_config(&zero).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("checkpoint.yml");
        std::fs::write(&yaml, "path_template: a.json\ncadence: 5\n").unwrap();
        assert_eq!(CheckpointConfig::from_file(&yaml).unwrap().cadence, 5);

        let toml = dir.path().join("checkpoint.toml");
        std::fs::write(&toml, "path_template = 'a.json'").unwrap();
        assert!(CheckpointConfig::from_file(&toml).is_err());
    }
}
