//! Serialization of the generated artifacts to YAML or JSON.
//!
//! Both the OpenAPI document and the manifest go through the same functions
//! and are written to disk with [`write_to_file`].

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Output format of the OpenAPI document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Yaml,
    #[default]
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
        }
    }

    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Yaml => serialize_yaml(value),
            OutputFormat::Json => serialize_json(value),
        }
    }

    /// `file` with its extension replaced by this format's.
    pub fn file_name(&self, file: &str) -> PathBuf {
        Path::new(file).with_extension(self.extension())
    }
}

/// Serializes a document to YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use ts_route_compiler::openapi_builder::OpenApiBuilder;
/// use ts_route_compiler::schema_generator::ComponentTable;
/// use ts_route_compiler::serializer::serialize_yaml;
///
/// let doc = OpenApiBuilder::new().build(&ComponentTable::new());
/// let yaml = serialize_yaml(&doc).unwrap();
/// assert!(yaml.contains("openapi: 3.1.0"));
/// ```
pub fn serialize_yaml<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize document to YAML")
}

/// Serializes a document to JSON with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// An existing file is overwritten.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi_builder::{OpenApiBuilder, OpenApiDocument};
    use crate::schema_generator::{ComponentTable, Schema};
    use tempfile::TempDir;

    fn create_test_document() -> OpenApiDocument {
        let mut components = ComponentTable::new();
        components.insert("User", Schema::typed("object"));
        OpenApiBuilder::new()
            .with_info("Test API".to_string(), "1.0.0".to_string(), Some("A test API".to_string()))
            .build(&components)
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_document()).unwrap();
        assert!(yaml.contains("openapi: 3.1.0"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("description: A test API"));
        assert!(yaml.contains("paths: {}"));
        assert!(yaml.contains("User:"));
    }

    #[test]
    fn test_serialize_json_pretty_format() {
        let json = serialize_json(&create_test_document()).unwrap();
        assert!(json.lines().count() > 5);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.1.0");
        assert_eq!(parsed["info"]["title"], "Test API");
        assert_eq!(parsed["components"]["schemas"]["User"]["type"], "object");
    }

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::Yaml.file_name("openapi.json"), PathBuf::from("openapi.yaml"));
        assert_eq!(OutputFormat::Json.file_name("api"), PathBuf::from("api.json"));
        let doc = create_test_document();
        assert!(OutputFormat::Json.serialize(&doc).unwrap().starts_with('{'));
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("test.yaml");
        write_to_file("test content", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");
        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[test]
    fn test_yaml_file_reads_back() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("openapi.yaml");
        let doc = create_test_document();
        write_to_file(&serialize_yaml(&doc).unwrap(), &file_path).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        let deserialized: OpenApiDocument = serde_yaml::from_str(&content).unwrap();
        assert_eq!(deserialized, doc);
    }
}
