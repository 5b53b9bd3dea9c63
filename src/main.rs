//! Command-line tool compiling decorated TypeScript controllers into an
//! OpenAPI document and a runtime route manifest.
//!
//! # Usage
//!
//! ```bash
//! ts-route-compiler [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Write `generated/openapi.json` and `generated/manifest.json`:
//! ```bash
//! ts-route-compiler ./my-api
//! ```
//!
//! YAML output for OpenAPI 3.0 tooling, into a custom directory:
//! ```bash
//! ts-route-compiler ./my-api -f yaml --openapi-version 3.0 -o ./docs
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! ts-route-compiler ./my-api -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use ts_route_compiler::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("ts-route-compiler starting...");

    let args = cli::parse_args_from_parsed(args)?;
    let output = cli::run(args)?;

    info!(
        "Compilation completed: {} and {}",
        output.openapi_path.display(),
        output.manifest_path.display()
    );

    Ok(())
}
