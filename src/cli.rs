use crate::compiler::Compiler;
use crate::config::{CompilerConfig, OpenApiVersion, ValidationMode};
use crate::manifest::ManifestGenerator;
use crate::openapi_builder::OpenApiBuilder;
use crate::parser::{AstParser, ParsedFile};
use crate::scanner::FileScanner;
use crate::serializer::{serialize_json, write_to_file, OutputFormat};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

/// Compile decorated TypeScript controllers into an OpenAPI document and a route manifest
#[derive(Parser, Debug)]
#[command(name = "ts-route-compiler")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the TypeScript project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Config file (.yaml, .yml or .json)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory the OpenAPI document and the manifest are written to
    #[arg(short = 'o', long = "out-dir", value_name = "DIR", default_value = "generated")]
    pub out_dir: PathBuf,

    /// Format of the OpenAPI document (the manifest is always JSON)
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// OpenAPI version to emit (3.0 or 3.1)
    #[arg(long = "openapi-version", value_name = "VERSION", value_parser = parse_openapi_version)]
    pub openapi_version: Option<OpenApiVersion>,

    /// Request validation mode recorded in the manifest
    #[arg(long = "validation", value_enum)]
    pub validation: Option<ValidationMode>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

fn parse_openapi_version(value: &str) -> std::result::Result<OpenApiVersion, String> {
    OpenApiVersion::parse(value).ok_or_else(|| format!("unsupported OpenAPI version `{}` (expected 3.0 or 3.1)", value))
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        bail!("Project path does not exist: {}", args.project_path.display());
    }
    if !args.project_path.is_dir() {
        bail!("Project path is not a directory: {}", args.project_path.display());
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output directory: {}", args.out_dir.display());
    info!("Output format: {:?}", args.output_format);
    Ok(args)
}

/// Config file values with command-line overrides applied.
pub fn resolve_config(args: &CliArgs) -> Result<CompilerConfig> {
    let mut config = match &args.config {
        Some(path) => CompilerConfig::load(path)?,
        None => CompilerConfig::default(),
    };
    if let Some(version) = args.openapi_version {
        config.openapi.spec_version = version;
    }
    if let Some(mode) = args.validation {
        config.manifest.validation = mode;
    }
    config.validate()?;
    Ok(config)
}

/// Paths written by a successful run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub openapi_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<RunOutput> {
    info!("Starting compilation...");
    let config = resolve_config(&args)?;

    // Step 1: Scan directory for TypeScript files
    info!("Scanning project directory...");
    let scan_result = FileScanner::new(args.project_path.clone()).scan()?;
    if scan_result.source_files.is_empty() {
        bail!("No TypeScript files found in {}", args.project_path.display());
    }

    // Step 2: Parse files; any failure aborts the run
    info!("Parsing TypeScript files...");
    let parsed_files = AstParser::parse_files(&scan_result.source_files)
        .into_iter()
        .collect::<crate::error::Result<Vec<ParsedFile>>>()
        .context("Failed to parse project sources")?;
    info!("Successfully parsed {} files", parsed_files.len());

    // Step 3: Scan controllers and convert types
    info!("Compiling controllers...");
    let compilation = Compiler::new(config.clone()).compile(&parsed_files)?;
    let operation_count: usize = compilation.controllers.iter().map(|c| c.operations.len()).sum();
    if operation_count == 0 {
        warn!("No routes found in the project");
    }

    // Step 4: Build the OpenAPI document
    info!("Building OpenAPI document...");
    let mut builder = OpenApiBuilder::from_config(&config.openapi);
    builder.add_compilation(&compilation);
    let document = builder.build(&compilation.components);

    // Step 5: Build the manifest
    let openapi_file = args.output_format.file_name(&config.openapi.file);
    info!("Building manifest...");
    let manifest = ManifestGenerator::new(&config)
        .with_schemas_file(&openapi_file.to_string_lossy())
        .generate(&compilation, Utc::now());

    // Step 6: Serialize and write both artifacts
    let openapi_path = args.out_dir.join(&openapi_file);
    write_to_file(&args.output_format.serialize(&document)?, &openapi_path)?;
    info!("Wrote OpenAPI document to {}", openapi_path.display());

    let manifest_path = args.out_dir.join(&config.manifest.file);
    write_to_file(&serialize_json(&manifest)?, &manifest_path)?;
    info!("Wrote manifest to {}", manifest_path.display());

    info!("Summary:");
    info!("  - Files parsed: {}", parsed_files.len());
    info!("  - Controllers: {}", compilation.controllers.len());
    info!("  - Operations: {}", operation_count);
    info!("  - Schema components: {}", compilation.components.len());

    Ok(RunOutput {
        openapi_path,
        manifest_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("ts-route-compiler").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let parsed = args(&["./api"]);
        assert_eq!(parsed.out_dir, PathBuf::from("generated"));
        assert_eq!(parsed.output_format, OutputFormat::Json);
        assert!(parsed.openapi_version.is_none());
        assert!(!parsed.verbose);
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let parsed = args(&["./api", "--openapi-version", "3.0", "--validation", "none", "-f", "yaml"]);
        let config = resolve_config(&parsed).unwrap();
        assert_eq!(config.openapi.spec_version, OpenApiVersion::V3_0);
        assert_eq!(config.manifest.validation, ValidationMode::None);
        assert_eq!(parsed.output_format, OutputFormat::Yaml);
    }

    #[test]
    fn test_rejects_unknown_openapi_version() {
        let result = CliArgs::try_parse_from(["ts-route-compiler", "./api", "--openapi-version", "2.0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_precompiled_without_module_is_rejected() {
        let parsed = args(&["./api", "--validation", "precompiled"]);
        assert!(resolve_config(&parsed).is_err());
    }

    #[test]
    fn test_missing_project_path() {
        let parsed = args(&["/definitely/not/here"]);
        assert!(parse_args_from_parsed(parsed).is_err());
    }
}
