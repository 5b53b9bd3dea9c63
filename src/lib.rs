//! TS Route Compiler - OpenAPI documents and runtime route manifests from
//! decorated TypeScript controllers.
//!
//! Controller classes are found by their class decorator, their route methods
//! by `@Get`/`@Post`/`@Put`/`@Patch`/`@Delete`, and each method parameter is
//! classified as a path, query, header, cookie or body binding from its type
//! and name. Every type reachable from a route signature is converted into a
//! JSON Schema component.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Recursively scans project directories for `.ts` files
//! 2. [`parser`] - Parses declaration-level TypeScript into an AST
//! 3. [`type_resolver`] - Resolves declarations into types behind the [`oracle::TypeOracle`] interface
//! 4. [`extractor`] - Finds controllers and classifies route parameters
//! 5. [`schema_generator`] - Converts types to schema components
//! 6. [`compiler`] - Runs one compilation and registers per-operation components
//! 7. [`manifest`] / [`openapi_builder`] - Project a compilation into the two output documents
//! 8. [`serializer`] - Serializes the documents to YAML or JSON
//!
//! [`binding`] checks a manifest against the controllers an application
//! registers at startup, and [`envelope`] is the error shape adapters reply with.
//!
//! # Example Usage
//!
//! ```no_run
//! use ts_route_compiler::{
//!     compiler::Compiler,
//!     config::CompilerConfig,
//!     manifest::ManifestGenerator,
//!     openapi_builder::OpenApiBuilder,
//!     parser::AstParser,
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//! };
//! use std::path::PathBuf;
//!
//! let scan_result = FileScanner::new(PathBuf::from("./my-api")).scan().unwrap();
//! let parsed_files = AstParser::parse_files(&scan_result.source_files)
//!     .into_iter()
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//!
//! let config = CompilerConfig::default();
//! let compilation = Compiler::new(config.clone()).compile(&parsed_files).unwrap();
//!
//! let mut builder = OpenApiBuilder::from_config(&config.openapi);
//! builder.add_compilation(&compilation);
//! let document = builder.build(&compilation.components);
//! println!("{}", serialize_yaml(&document).unwrap());
//!
//! let manifest = ManifestGenerator::new(&config).generate(&compilation, chrono::Utc::now());
//! println!("{} operations", manifest.operations().count());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod binding;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod entity;
pub mod envelope;
pub mod error;
pub mod extractor;
pub mod manifest;
pub mod openapi_builder;
pub mod oracle;
pub mod parser;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod type_resolver;
