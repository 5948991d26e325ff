//! apicontract - command-line tool deriving an OpenAPI 3.1 document from Rust source.
//!
//! # Usage
//!
//! ```bash
//! apicontract [OPTIONS] <SOURCE_DIR>...
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation from two source trees:
//! ```bash
//! apicontract ./models ./handlers -o openapi.yaml
//! ```
//!
//! Match routes in one file only and emit JSON:
//! ```bash
//! apicontract ./src -r ./src/router.rs -f json -o openapi.json
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! apicontract ./src -v
//! ```

use anyhow::Result;
use apicontract::cli;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    // Parse once to read the verbose flag before the logger exists, then validate.
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("apicontract starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
