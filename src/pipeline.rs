//! One synchronous batch run: parse, extract, match routes, assemble.

use crate::accessors::{AccessorSynthesizer, GeneratedFile};
use crate::catalog::Catalog;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::extractor::SourceExtractor;
use crate::openapi_builder::{OpenApiBuilder, OpenApiDocument};
use crate::parser::{AstParser, ParsedFile};
use crate::routes::RouteMatcher;
use crate::schema_generator::SchemaGenerator;
use log::{info, warn};
use std::path::PathBuf;

/// A configured generator. Every run builds its own catalog, so pipelines
/// share nothing and can run on separate threads.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: GeneratorConfig,
}

/// The result of a run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub document: OpenApiDocument,
    /// Skipped routes and union subset warnings
    pub diagnostics: Vec<String>,
    /// Accessor companions for the union aliases found
    pub accessors: Vec<GeneratedFile>,
    pub stats: RunStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub files: usize,
    pub types: usize,
    pub handlers: usize,
    pub routes: usize,
    pub operations: usize,
}

impl Pipeline {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Runs over source directories.
    ///
    /// Routes are matched in `route_files` when given, otherwise in every
    /// parsed source file. Accessor companions are written beside their
    /// aliases when the configuration asks for it.
    ///
    /// # Errors
    ///
    /// Fails on the first unreadable directory or file, or a file that does
    /// not parse, and when writing a companion fails.
    pub fn run(&self, source_dirs: &[PathBuf], route_files: &[PathBuf]) -> Result<PipelineOutput> {
        let sources = SourceExtractor::parse_directories(source_dirs)?;
        let routes = route_files
            .iter()
            .map(|path| AstParser::parse_file(path))
            .collect::<Result<Vec<_>>>()?;

        let output = self.run_parsed(&sources, &routes);
        if self.config.accessors {
            for file in &output.accessors {
                file.write()?;
            }
        }
        Ok(output)
    }

    /// Runs over files already parsed. Nothing is written.
    pub fn run_parsed(&self, sources: &[ParsedFile], route_files: &[ParsedFile]) -> PipelineOutput {
        let catalog = Catalog::new();
        SourceExtractor::new(&self.config)
            .extract(sources)
            .register(&catalog);

        let route_sources = if route_files.is_empty() {
            sources
        } else {
            route_files
        };
        let routes = RouteMatcher::new(&self.config).match_files(route_sources);
        info!(
            "Found {} types, {} handlers and {} routes",
            catalog.type_count(),
            catalog.handler_count(),
            routes.len()
        );
        if routes.is_empty() {
            warn!("No routes found");
        }

        let mut schema_gen = SchemaGenerator::new(&catalog, &self.config);
        let mut builder = OpenApiBuilder::new(&self.config);
        let operations = routes
            .iter()
            .filter(|route| builder.add_route(route, &mut schema_gen))
            .count();

        // Union aliases no route reaches still get a component schema.
        for alias in catalog.union_aliases() {
            schema_gen.generate(&alias.name);
        }

        let mut diagnostics = builder.diagnostics().to_vec();
        diagnostics.extend(schema_gen.take_diagnostics());
        let document = builder.build(&schema_gen);
        let accessors = AccessorSynthesizer::new().render_all(&catalog);

        PipelineOutput {
            document,
            diagnostics,
            accessors,
            stats: RunStats {
                files: sources.len(),
                types: catalog.type_count(),
                handlers: catalog.handler_count(),
                routes: routes.len(),
                operations,
            },
        }
    }
}
