use crate::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Generator configuration.
///
/// Every field has a default, so a configuration file only needs the keys it
/// changes:
///
/// ```yaml
/// info:
///   title: Payments API
///   version: 2.1.0
/// parameter_style: explicit
/// custom_directives:
///   sku: must be a valid stock keeping unit
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub info: InfoConfig,
    /// How query and header parameters are recognized
    pub parameter_style: ParameterStyle,
    /// Name of the field annotation attribute (`#[api(...)]`)
    pub annotation_attribute: String,
    /// Name of the choice construct without its arity (`OneOf`)
    pub union_prefix: String,
    /// Zero-argument method marking a discriminated union alternative
    pub marker_method: String,
    /// Property used when the discriminator is inferred from markers
    pub discriminator_property: String,
    /// Functions wrapping handler references in route registrations
    pub build_handlers: Vec<String>,
    /// Extra validation tokens and the description each one renders as
    pub custom_directives: BTreeMap<String, String>,
    pub subset_warnings: bool,
    /// Write accessor companions for union aliases
    pub accessors: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

/// How query and header parameters are derived from request fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterStyle {
    /// Explicit `in = ".."` overrides, plus un-annotated fields of GET and
    /// DELETE requests as query parameters
    #[default]
    Implicit,
    /// Only fields with an explicit location override
    Explicit,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            info: InfoConfig::default(),
            parameter_style: ParameterStyle::default(),
            annotation_attribute: "api".to_string(),
            union_prefix: "OneOf".to_string(),
            marker_method: "discriminator".to_string(),
            discriminator_property: "type".to_string(),
            build_handlers: vec!["build_handler".to_string()],
            custom_directives: BTreeMap::new(),
            subset_warnings: true,
            accessors: false,
        }
    }
}

impl Default for InfoConfig {
    fn default() -> Self {
        Self {
            title: "Generated API".to_string(),
            version: "1.0.0".to_string(),
            description: Some("API documentation generated from Rust source".to_string()),
        }
    }
}

impl GeneratorConfig {
    /// Loads a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("annotation_attribute", &self.annotation_attribute),
            ("union_prefix", &self.union_prefix),
            ("marker_method", &self.marker_method),
            ("discriminator_property", &self.discriminator_property),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.parameter_style, ParameterStyle::Implicit);
        assert_eq!(config.annotation_attribute, "api");
        assert_eq!(config.union_prefix, "OneOf");
        assert_eq!(config.build_handlers, vec!["build_handler"]);
        assert!(config.subset_warnings);
        assert!(!config.accessors);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = GeneratorConfig::from_yaml(
            r#"
info:
  title: Payments API
parameter_style: explicit
custom_directives:
  sku: must be a valid stock keeping unit
"#,
        )
        .unwrap();

        assert_eq!(config.info.title, "Payments API");
        assert_eq!(config.info.version, "1.0.0");
        assert_eq!(config.parameter_style, ParameterStyle::Explicit);
        assert_eq!(config.custom_directives.len(), 1);
        assert_eq!(config.marker_method, "discriminator");
    }

    #[test]
    fn test_invalid_yaml_is_a_config_error() {
        let err = GeneratorConfig::from_yaml("parameter_style: sometimes").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = GeneratorConfig::from_yaml("union_prefix: ''").unwrap_err();
        assert!(err.to_string().contains("union_prefix"));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("apicontract.yaml");
        fs::write(&path, "accessors: true\n").unwrap();

        assert!(GeneratorConfig::from_file(&path).unwrap().accessors);
        assert!(GeneratorConfig::from_file(&temp_dir.path().join("missing.yaml")).is_err());
    }
}
