use crate::config::{GeneratorConfig, ParameterStyle};
use crate::pipeline::Pipeline;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// apicontract - derive an OpenAPI 3.1 document from Rust handlers, types and routes
#[derive(Parser, Debug)]
#[command(name = "apicontract")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Source directories holding type and handler definitions
    #[arg(value_name = "SOURCE_DIR", required = true, num_args = 1..)]
    pub source_dirs: Vec<PathBuf>,

    /// Files holding route registrations (default: every source file)
    #[arg(short = 'r', long = "routes", value_name = "FILE")]
    pub route_files: Vec<PathBuf>,

    /// YAML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Override the document title
    #[arg(long = "title")]
    pub title: Option<String>,

    /// Override the document version
    #[arg(long = "api-version")]
    pub api_version: Option<String>,

    /// How query and header parameters are recognized
    #[arg(long = "parameter-style", value_enum)]
    pub parameter_style: Option<StyleArg>,

    /// Write accessor companions next to union aliases
    #[arg(long = "write-accessors")]
    pub write_accessors: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StyleArg {
    Implicit,
    Explicit,
}

impl From<StyleArg> for ParameterStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Implicit => ParameterStyle::Implicit,
            StyleArg::Explicit => ParameterStyle::Explicit,
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    for dir in &args.source_dirs {
        if !dir.exists() {
            anyhow::bail!("Source directory does not exist: {}", dir.display());
        }
        if !dir.is_dir() {
            anyhow::bail!("Source path is not a directory: {}", dir.display());
        }
        info!("Source directory: {}", dir.display());
    }
    for file in &args.route_files {
        if !file.is_file() {
            anyhow::bail!("Route file does not exist: {}", file.display());
        }
    }

    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// The configuration file (or defaults) with command-line overrides applied.
pub fn load_config(args: &CliArgs) -> Result<GeneratorConfig> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => GeneratorConfig::default(),
    };

    if let Some(title) = &args.title {
        config.info.title = title.clone();
    }
    if let Some(version) = &args.api_version {
        config.info.version = version.clone();
    }
    if let Some(style) = args.parameter_style {
        config.parameter_style = style.into();
    }
    if args.write_accessors {
        config.accessors = true;
    }
    Ok(config)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");
    let config = load_config(&args)?;
    let pipeline = Pipeline::new(config);

    let output = pipeline
        .run(&args.source_dirs, &args.route_files)
        .context("Failed to generate the OpenAPI document")?;

    for diagnostic in &output.diagnostics {
        warn!("{}", diagnostic);
    }

    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&output.document)?,
        OutputFormat::Json => serialize_json(&output.document)?,
    };

    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    let stats = output.stats;
    info!("Generation complete!");
    info!("Summary:");
    info!("  - Files parsed: {}", stats.files);
    info!("  - Types: {}", stats.types);
    info!("  - Handlers: {}", stats.handlers);
    info!("  - Routes found: {}", stats.routes);
    info!("  - Operations: {}", stats.operations);
    info!("  - Warnings: {}", output.diagnostics.len());
    if pipeline.config().accessors {
        info!("  - Accessor files written: {}", output.accessors.len());
    }

    Ok(())
}
