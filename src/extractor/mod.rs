//! Source extraction: type definitions, aliases and handlers.
//!
//! The extractor walks every parsed file (including inline `mod` blocks) and
//! collects:
//!
//! - record types from structs, with their `#[api(...)]`/`#[serde(...)]`
//!   field annotations
//! - simple and union aliases from `type X = ...;`, fieldless enums and
//!   newtype structs
//! - handler functions following the `(ctx, request) -> Result<_, _>`
//!   convention
//! - declared operations (impl-block methods) and constant-backed enum values,
//!   merged into their types once every file has been visited
//!
//! # Example
//!
//! ```no_run
//! use apicontract::catalog::Catalog;
//! use apicontract::extractor::SourceExtractor;
//! use std::path::PathBuf;
//!
//! let files = SourceExtractor::parse_directories(&[PathBuf::from("src")]).unwrap();
//! let catalog = Catalog::new();
//! SourceExtractor::default().extract(&files).register(&catalog);
//! println!("{} types", catalog.type_count());
//! ```

mod attributes;
mod handlers;
mod types;

pub use attributes::doc_text;

use crate::catalog::{
    AliasKind, Catalog, DeclaredOperation, HandlerDescriptor, SourceLocation, TypeDefinition,
};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::parser::{AstParser, ParsedFile};
use crate::scanner::FileScanner;
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use syn::visit::Visit;

/// Extracts catalogs from parsed source files.
#[derive(Debug, Clone)]
pub struct SourceExtractor {
    attr_name: String,
    union_prefix: String,
}

/// Everything extracted from one batch of files, not yet registered.
#[derive(Debug, Default)]
pub struct Extraction {
    pub types: Vec<TypeDefinition>,
    pub handlers: Vec<HandlerDescriptor>,
}

/// Per-item context handed to the item converters.
pub(crate) struct ItemContext<'a> {
    pub file: &'a Path,
    pub namespace: String,
    pub attr_name: &'a str,
    pub union_prefix: &'a str,
}

impl ItemContext<'_> {
    pub fn location(&self, span: proc_macro2::Span) -> SourceLocation {
        SourceLocation {
            file: self.file.to_path_buf(),
            line: span.start().line,
        }
    }
}

impl Default for SourceExtractor {
    fn default() -> Self {
        Self::new(&GeneratorConfig::default())
    }
}

impl SourceExtractor {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            attr_name: config.annotation_attribute.clone(),
            union_prefix: config.union_prefix.clone(),
        }
    }

    /// Scans and parses every `.rs` file under each directory.
    ///
    /// # Errors
    ///
    /// A missing or unreadable directory, or any file `syn` cannot parse,
    /// aborts the whole batch.
    pub fn parse_directories(dirs: &[PathBuf]) -> Result<Vec<ParsedFile>> {
        let mut parsed = Vec::new();
        for dir in dirs {
            let scan = FileScanner::new(dir.clone()).scan()?;
            parsed.extend(AstParser::parse_files(&scan.root, &scan.rust_files)?);
        }
        info!("Parsed {} source files", parsed.len());
        Ok(parsed)
    }

    /// Extracts types and handlers from all files.
    pub fn extract(&self, files: &[ParsedFile]) -> Extraction {
        let mut collector = ItemCollector {
            extractor: self,
            file: Path::new(""),
            namespace: Vec::new(),
            types: Vec::new(),
            handlers: Vec::new(),
            operations: HashMap::new(),
            constants: Vec::new(),
        };

        for file in files {
            collector.file = &file.path;
            collector.namespace = if file.namespace.is_empty() {
                Vec::new()
            } else {
                vec![file.namespace.clone()]
            };
            collector.visit_file(&file.syntax_tree);
        }

        collector.finish()
    }
}

impl Extraction {
    /// Registers everything into the catalog in extraction order.
    pub fn register(self, catalog: &Catalog) {
        for def in self.types {
            catalog.register_type(def);
        }
        for handler in self.handlers {
            catalog.register_handler(handler);
        }
        debug!(
            "Catalog holds {} types and {} handlers",
            catalog.type_count(),
            catalog.handler_count()
        );
    }
}

struct ItemCollector<'a> {
    extractor: &'a SourceExtractor,
    file: &'a Path,
    namespace: Vec<String>,
    types: Vec<TypeDefinition>,
    handlers: Vec<HandlerDescriptor>,
    operations: HashMap<String, Vec<DeclaredOperation>>,
    constants: Vec<(String, serde_json::Value)>,
}

impl ItemCollector<'_> {
    fn context(&self) -> ItemContext<'_> {
        ItemContext {
            file: self.file,
            namespace: self.namespace.join("::"),
            attr_name: &self.extractor.attr_name,
            union_prefix: &self.extractor.union_prefix,
        }
    }

    fn finish(mut self) -> Extraction {
        for def in &mut self.types {
            if let Some(ops) = self.operations.get(&def.name) {
                def.operations.extend(ops.iter().cloned());
            }
        }

        for (type_name, value) in self.constants {
            let target = self
                .types
                .iter_mut()
                .find(|t| t.name == type_name && t.alias_kind == AliasKind::Simple);
            match target {
                Some(def) if !def.enum_values.contains(&value) => def.enum_values.push(value),
                Some(_) => {}
                None => debug!("Constant of type {} does not back an alias", type_name),
            }
        }

        info!(
            "Extracted {} types and {} handlers",
            self.types.len(),
            self.handlers.len()
        );
        Extraction {
            types: self.types,
            handlers: self.handlers,
        }
    }
}

impl<'ast> Visit<'ast> for ItemCollector<'_> {
    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        self.namespace.push(node.ident.to_string());
        syn::visit::visit_item_mod(self, node);
        self.namespace.pop();
    }

    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        let def = types::from_struct(node, &self.context());
        self.types.push(def);
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        if let Some(def) = types::from_enum(node, &self.context()) {
            self.types.push(def);
        }
    }

    fn visit_item_type(&mut self, node: &'ast syn::ItemType) {
        let def = types::from_type_alias(node, &self.context());
        self.types.push(def);
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        if let Some((type_name, ops)) = types::operations_from_impl(node) {
            self.operations.entry(type_name).or_default().extend(ops);
        }
    }

    fn visit_item_const(&mut self, node: &'ast syn::ItemConst) {
        if let Some(constant) = types::const_value(node) {
            self.constants.push(constant);
        }
    }

    // Function bodies are not descended into.
    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        if let Some(handler) = handlers::from_fn(node, &self.context()) {
            self.handlers.push(handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_expr::TypeExpr;
    use std::fs;
    use tempfile::TempDir;

    fn parse(namespace: &str, code: &str) -> ParsedFile {
        ParsedFile::from_source(format!("{}.rs", namespace), namespace, code).unwrap()
    }

    #[test]
    fn test_extract_across_files() {
        let models = parse(
            "models",
            r#"
            pub type Status = String;
            pub const ACTIVE: Status = "active";

            pub struct Card { pub number: String }
            pub type Payment = OneOf2<Card, BankTransfer>;

            mod nested {
                pub struct BankTransfer { pub iban: String }
            }
            "#,
        );
        let logic = parse(
            "logic",
            r#"
            pub const DISABLED: Status = "disabled";

            impl Card {
                pub fn discriminator(&self) -> &'static str { "card" }
            }

            pub async fn create_payment(ctx: &Context, req: Payment) -> Result<Card, Error> {
                let inner = 1;
                todo!()
            }
            "#,
        );

        let extraction = SourceExtractor::default().extract(&[models, logic]);
        let names: Vec<&str> = extraction.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Status", "Card", "Payment", "BankTransfer"]);

        let status = &extraction.types[0];
        assert_eq!(
            status.enum_values,
            vec![serde_json::json!("active"), serde_json::json!("disabled")]
        );

        let card = &extraction.types[1];
        assert_eq!(card.operations.len(), 1);
        assert_eq!(card.operation("discriminator").unwrap().returned_literal.as_deref(), Some("card"));

        let bank = &extraction.types[3];
        assert_eq!(bank.namespace, "models::nested");

        assert_eq!(extraction.handlers.len(), 1);
        assert_eq!(
            extraction.handlers[0].request,
            TypeExpr::Named("Payment".to_string())
        );
    }

    #[test]
    fn test_register_into_catalog() {
        let file = parse(
            "api",
            r#"
            pub struct User { pub id: u32 }
            pub struct User { pub other: u32 }
            pub fn get_user(ctx: &Ctx, req: GetUser) -> Result<User, E> { todo!() }
            "#,
        );
        let catalog = Catalog::new();
        SourceExtractor::default().extract(&[file]).register(&catalog);

        assert_eq!(catalog.type_count(), 1);
        assert_eq!(catalog.type_def("User").unwrap().fields[0].name, "id");
        assert!(catalog.handler("get_user").is_some());
    }

    #[test]
    fn test_parse_directories_is_fatal_on_bad_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ok.rs"), "pub struct A { pub x: u8 }").unwrap();
        fs::write(temp_dir.path().join("bad.rs"), "pub struct {").unwrap();

        assert!(SourceExtractor::parse_directories(&[temp_dir.path().to_path_buf()]).is_err());
    }

    #[test]
    fn test_parse_directories_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(SourceExtractor::parse_directories(&[missing]).is_err());
    }
}
