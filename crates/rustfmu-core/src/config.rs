//! Build-time configuration of the model description.
//!
//! A [`DescriptionConfig`] overrides parts of a slave's [`ModelMetadata`] without touching
//! its code, typically loaded from a TOML file:
//!
//! ```toml
//! author = "Jane Doe"
//! license = "MIT"
//! guid = "1d2f4e2a-8b0c-4a55-9c8e-3f1e5d2b7a10"
//!
//! [default_experiment]
//! start_time = 0.0
//! stop_time = 10.0
//! step_size = 0.01
//!
//! [capabilities]
//! canInterpolateInputs = true
//! ```

use crate::errors::FmuResult;
use crate::logging::LogCategories;
use crate::model_description::{CapabilityOverrides, DefaultExperiment, ModelMetadata};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptionConfig {
    pub guid: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub version: Option<String>,
    pub copyright: Option<String>,
    pub default_experiment: Option<DefaultExperiment>,
    /// Replaces the declared log categories when present.
    pub log_categories: Option<LogCategories>,
    #[serde(default)]
    pub capabilities: CapabilityOverrides,
}

impl DescriptionConfig {
    pub fn from_toml_str(content: &str) -> FmuResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FmuResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply the configured values on top of `metadata`.
    ///
    /// Fields that are not set in the configuration keep their value; capability flags
    /// are merged by name.
    pub fn apply(&self, metadata: &mut ModelMetadata) {
        let fields = [
            (&mut metadata.guid, &self.guid),
            (&mut metadata.description, &self.description),
            (&mut metadata.author, &self.author),
            (&mut metadata.license, &self.license),
            (&mut metadata.version, &self.version),
            (&mut metadata.copyright, &self.copyright),
        ];
        for (target, value) in fields {
            if let Some(value) = value {
                *target = Some(value.clone());
            }
        }

        if let Some(experiment) = self.default_experiment {
            metadata.default_experiment = Some(experiment);
        }
        if let Some(categories) = &self.log_categories {
            metadata.log_categories = categories.clone();
        }
        metadata.capabilities.extend(
            self.capabilities
                .iter()
                .map(|(name, value)| (name.clone(), *value)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FmuError;
    use is_close::is_close;

    const CONFIG: &str = r#"
author = "Jane Doe"
version = "1.2.0"

[default_experiment]
start_time = 1.0
stop_time = 2.0
tolerance = 1e-3

[capabilities]
canInterpolateInputs = true
needsExecutionTool = false
"#;

    #[test]
    fn test_parse() {
        let config = DescriptionConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(config.author.as_deref(), Some("Jane Doe"));
        assert_eq!(config.license, None);

        let experiment = config.default_experiment.unwrap();
        assert!(is_close!(experiment.tolerance.unwrap(), 1e-3));
        assert_eq!(experiment.step_size, None);
        assert_eq!(
            config.capabilities.keys().collect::<Vec<_>>(),
            vec!["canInterpolateInputs", "needsExecutionTool"]
        );
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let config = DescriptionConfig::from_toml_str(CONFIG).unwrap();
        let mut metadata = ModelMetadata::new("Sample")
            .with_author("John Doe")
            .with_license("MIT")
            .with_capability("canInterpolateInputs", false);

        config.apply(&mut metadata);
        assert_eq!(metadata.author.as_deref(), Some("Jane Doe"));
        assert_eq!(metadata.license.as_deref(), Some("MIT"));
        assert_eq!(metadata.version.as_deref(), Some("1.2.0"));
        assert_eq!(metadata.capabilities["canInterpolateInputs"], true);
        assert_eq!(metadata.default_experiment.unwrap().start_time, Some(1.0));
        assert_eq!(metadata.log_categories.len(), 5);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = DescriptionConfig::from_toml_str("authors = \"x\"");
        assert!(matches!(result, Err(FmuError::Config(_))));
    }
}
