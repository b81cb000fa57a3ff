//! Engine configuration: a scenario plus its metric channel declarations.
//!
//! YAML-first with schema and semantic validation, so malformed lesson
//! content fails at load time with a message naming the offending field,
//! never mid-lesson.
//!
//! # Example
//!
//! ```yaml
//! schema_version: "1.0"
//! scenario:
//!   id: reference_rebind
//!   steps:
//!     - op: create
//!       label: target
//!       kind: target
//!       payload: 42
//!       message: "Object created."
//! channels:
//!   - name: safety
//!     domain_min: 0.0
//!     domain_max: 100.0
//!     formula: composite
//! ```

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{EngineError, EngineResult};
use crate::metrics::{default_channels, validate_channels, ChannelSpec};
use crate::scenario::Scenario;

fn default_schema_version() -> String {
    "1.0".to_string()
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Schema version for forward compatibility.
    #[validate(length(min = 1))]
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// The scenario to run.
    #[validate(nested)]
    pub scenario: Scenario,

    /// Metric channel declarations; built-in presets when omitted.
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelSpec>,
}

impl EngineConfig {
    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns `YamlParse`, `Validation`, or `Config` (semantic checks:
    /// channel domains and name uniqueness).
    pub fn from_yaml(yaml: &str) -> EngineResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        config.validate_semantic()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, plus everything
    /// [`Self::from_yaml`] returns.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Create a builder for host embedding without YAML.
    #[must_use]
    pub fn builder(scenario: Scenario) -> EngineConfigBuilder {
        EngineConfigBuilder {
            scenario,
            channels: None,
        }
    }

    /// Validate semantic constraints beyond the schema.
    fn validate_semantic(&self) -> EngineResult<()> {
        if self.channels.is_empty() {
            return Err(EngineError::config("at least one channel is required"));
        }
        validate_channels(&self.channels)
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    scenario: Scenario,
    channels: Option<Vec<ChannelSpec>>,
}

impl EngineConfigBuilder {
    /// Replace the default channel set.
    #[must_use]
    pub fn channels(mut self, channels: Vec<ChannelSpec>) -> Self {
        self.channels = Some(channels);
        self
    }

    /// Finish and validate.
    ///
    /// # Errors
    ///
    /// Same as [`EngineConfig::from_yaml`], minus parsing.
    pub fn build(self) -> EngineResult<EngineConfig> {
        let config = EngineConfig {
            schema_version: default_schema_version(),
            scenario: self.scenario,
            channels: self.channels.unwrap_or_else(default_channels),
        };
        config.validate()?;
        config.validate_semantic()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use crate::metrics::FormulaId;
    use crate::scenario::{ScenarioBuilder, StepOp};

    const CONFIG_YAML: &str = r#"
schema_version: "1.0"
scenario:
  id: reference_rebind
  steps:
    - op: create
      label: target
      kind: target
      payload: 42
      message: "Object created."
channels:
  - name: safety
    domain_min: 0.0
    domain_max: 100.0
    formula: composite
"#;

    fn tiny_scenario() -> Scenario {
        ScenarioBuilder::new("tiny")
            .step(
                StepOp::Create {
                    label: "n".to_string(),
                    kind: NodeKind::Target,
                    payload: 0.0,
                },
                "create n",
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_config_from_yaml() {
        let config = EngineConfig::from_yaml(CONFIG_YAML).unwrap();
        assert_eq!(config.schema_version, "1.0");
        assert_eq!(config.scenario.id, "reference_rebind");
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].formula, FormulaId::Composite);
    }

    #[test]
    fn test_config_default_channels_when_omitted() {
        let yaml = r#"
scenario:
  id: x
  steps:
    - op: commit
      message: m
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert!(!config.channels.is_empty());
        assert_eq!(config.schema_version, "1.0");
    }

    #[test]
    fn test_config_rejects_bad_channel_domain() {
        let yaml = r#"
scenario:
  id: x
  steps:
    - op: commit
      message: m
channels:
  - name: broken
    domain_min: 10.0
    domain_max: 0.0
    formula: steady
"#;
        let err = EngineConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("inverted"));
    }

    #[test]
    fn test_config_rejects_empty_channel_list() {
        let yaml = r#"
scenario:
  id: x
  steps:
    - op: commit
      message: m
channels: []
"#;
        assert!(EngineConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_config_rejects_invalid_scenario() {
        let yaml = "scenario:\n  id: x\n  steps: []\n";
        assert!(EngineConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let yaml = r#"
bogus: true
scenario:
  id: x
  steps:
    - op: commit
      message: m
"#;
        assert!(EngineConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let config = EngineConfig::builder(tiny_scenario()).build().unwrap();
        assert_eq!(config.channels, default_channels());
    }

    #[test]
    fn test_builder_custom_channels() {
        let config = EngineConfig::builder(tiny_scenario())
            .channels(vec![ChannelSpec::new("only", 0.0, 1.0, FormulaId::Steady)])
            .build()
            .unwrap();
        assert_eq!(config.channels.len(), 1);
    }

    #[test]
    fn test_builder_rejects_duplicate_channels() {
        let result = EngineConfig::builder(tiny_scenario())
            .channels(vec![
                ChannelSpec::new("x", 0.0, 1.0, FormulaId::Steady),
                ChannelSpec::new("x", 0.0, 1.0, FormulaId::Pulse),
            ])
            .build();
        assert!(result.is_err());
    }
}
