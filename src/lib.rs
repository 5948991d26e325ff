//! apicontract - derive an OpenAPI 3.1 contract from Rust source code.
//!
//! The library reads type definitions, handler functions and route
//! registrations with `syn`, without compiling or running the analyzed code,
//! and assembles an OpenAPI document from them.
//!
//! # Conventions
//!
//! - Request and response types are structs. Fields carry an `#[api(...)]`
//!   attribute with a wire name (`json`), a validation directive (`validate`),
//!   a location override (`in = "query"`) or a union discriminator override.
//!   `#[serde(rename, skip, flatten, rename_all)]` is honored.
//! - Handlers are `pub fn name(ctx: &Ctx, req: Request) -> Result<Response, E>`.
//! - `pub type Payment = OneOf2<Card, Bank>;` declares a union; alternatives
//!   mark themselves with `#[api(discriminator_value = "card")]` or a
//!   zero-argument `discriminator()` method.
//! - Routes are recognized in six call shapes, see [`routes`].
//!
//! # Architecture
//!
//! 1. [`scanner`] and [`parser`] - find and parse `.rs` files
//! 2. [`extractor`] - build the [`catalog`] of types and handlers
//! 3. [`constraints`] - translate validation directives into schema constraints
//! 4. [`routes`] - match route registrations
//! 5. [`union`] - detect unions and resolve discriminators
//! 6. [`schema_generator`] and [`openapi_builder`] - assemble the document
//! 7. [`accessors`] - render accessor companions for union aliases
//! 8. [`pipeline`] - one batch run over all of the above
//! 9. [`serializer`] - YAML or JSON output
//!
//! # Example Usage
//!
//! ```no_run
//! use apicontract::config::GeneratorConfig;
//! use apicontract::pipeline::Pipeline;
//! use apicontract::serializer::serialize_yaml;
//! use std::path::PathBuf;
//!
//! let pipeline = Pipeline::new(GeneratorConfig::default());
//! let output = pipeline.run(&[PathBuf::from("./my-api/src")], &[]).unwrap();
//! for warning in &output.diagnostics {
//!     eprintln!("warning: {}", warning);
//! }
//! println!("{}", serialize_yaml(&output.document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod accessors;
pub mod case;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod constraints;
pub mod error;
pub mod extractor;
pub mod openapi_builder;
pub mod parser;
pub mod pipeline;
pub mod routes;
pub mod scanner;
pub mod schema;
pub mod schema_generator;
pub mod serializer;
pub mod type_expr;
pub mod union;
