//! Compiler configuration.
//!
//! Loaded from a YAML or JSON file (JSON is read through the YAML parser) and
//! then overridden by command-line flags.

use crate::extractor::controller::DEFAULT_CONTROLLER_DECORATORS;
use anyhow::{bail, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
    pub openapi: OpenApiConfig,
    pub manifest: ManifestConfig,
    pub additional_properties: AdditionalPropertiesPolicy,
    /// Class decorators that mark a controller
    pub controller_decorators: Vec<String>,
    /// Emit `<Entity>Entity`/`Insert`/`Update`/`IdParams` components
    pub entity_schemas: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            openapi: OpenApiConfig::default(),
            manifest: ManifestConfig::default(),
            additional_properties: AdditionalPropertiesPolicy::default(),
            controller_decorators: DEFAULT_CONTROLLER_DECORATORS.iter().map(|s| s.to_string()).collect(),
            entity_schemas: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenApiConfig {
    /// OpenAPI dialect of the generated document
    #[serde(rename = "openapiVersion", alias = "specVersion")]
    pub spec_version: OpenApiVersion,
    pub title: String,
    /// API version written to `info.version`
    pub version: String,
    pub description: Option<String>,
    /// Output file name, relative to the output directory
    pub file: String,
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            spec_version: OpenApiVersion::default(),
            title: "API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            file: "openapi.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestConfig {
    pub file: String,
    pub validation: ValidationMode,
    /// Module holding precompiled validators; required in `precompiled` mode
    pub precompiled_module: Option<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            file: "manifest.json".to_string(),
            validation: ValidationMode::default(),
            precompiled_module: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenApiVersion {
    #[serde(rename = "3.0.3")]
    V3_0,
    #[default]
    #[serde(rename = "3.1.0")]
    V3_1,
}

impl OpenApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenApiVersion::V3_0 => "3.0.3",
            OpenApiVersion::V3_1 => "3.1.0",
        }
    }

    /// Schema dialect identifier written to the manifest
    pub fn schema_kind(&self) -> &'static str {
        match self {
            OpenApiVersion::V3_0 => "openapi-3.0",
            OpenApiVersion::V3_1 => "openapi-3.1",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "3.0" | "3.0.3" => Some(OpenApiVersion::V3_0),
            "3.1" | "3.1.0" => Some(OpenApiVersion::V3_1),
            _ => None,
        }
    }
}

/// How an adapter validates requests against the generated schemas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    None,
    #[default]
    AjvRuntime,
    Precompiled,
}

/// `additionalProperties` on generated object schemas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdditionalPropertiesPolicy {
    /// Leave `additionalProperties` unset
    #[default]
    Allow,
    /// `additionalProperties: false` on objects with declared properties
    Forbid,
}

impl CompilerConfig {
    /// Loads a config file; `.json`, `.yaml` and `.yml` are accepted.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: CompilerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.manifest.validation == ValidationMode::Precompiled
            && self.manifest.precompiled_module.as_deref().map_or(true, str::is_empty)
        {
            bail!("manifest.validation is 'precompiled' but manifest.precompiledModule is not set");
        }
        if self.controller_decorators.is_empty() {
            bail!("controllerDecorators must name at least one decorator");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.openapi.spec_version, OpenApiVersion::V3_1);
        assert_eq!(config.manifest.validation, ValidationMode::AjvRuntime);
        assert_eq!(config.controller_decorators, vec!["Controller", "Route"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml() {
        let file = write_config(
            ".yaml",
            r#"
openapi:
  openapiVersion: "3.0.3"
  title: Blog API
manifest:
  validation: none
additionalProperties: forbid
entitySchemas: true
"#,
        );
        let config = CompilerConfig::load(file.path()).unwrap();
        assert_eq!(config.openapi.spec_version, OpenApiVersion::V3_0);
        assert_eq!(config.openapi.title, "Blog API");
        assert_eq!(config.openapi.version, "1.0.0");
        assert_eq!(config.manifest.validation, ValidationMode::None);
        assert_eq!(config.additional_properties, AdditionalPropertiesPolicy::Forbid);
        assert!(config.entity_schemas);
    }

    #[test]
    fn test_load_json() {
        let file = write_config(
            ".json",
            r#"{"manifest": {"validation": "precompiled", "precompiledModule": "./validators.js"}}"#,
        );
        let config = CompilerConfig::load(file.path()).unwrap();
        assert_eq!(config.manifest.precompiled_module.as_deref(), Some("./validators.js"));
    }

    #[test]
    fn test_precompiled_requires_module() {
        let file = write_config(".json", r#"{"manifest": {"validation": "precompiled"}}"#);
        let err = CompilerConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("precompiledModule"));
    }

    #[test]
    fn test_parse_openapi_version() {
        assert_eq!(OpenApiVersion::parse("3.0"), Some(OpenApiVersion::V3_0));
        assert_eq!(OpenApiVersion::parse("3.1.0"), Some(OpenApiVersion::V3_1));
        assert_eq!(OpenApiVersion::parse("2.0"), None);
    }
}
