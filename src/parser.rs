use crate::error::{Error, Result};
use log::debug;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// AST parser for Rust source files.
///
/// The `AstParser` uses the `syn` crate to parse source code into a syntax
/// tree. Any read or syntax failure is returned to the caller; the pipeline
/// treats it as fatal.
///
/// # Example
///
/// ```no_run
/// use apicontract::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("src/handlers.rs")).unwrap();
/// println!("Parsed {} items", parsed.syntax_tree.items.len());
/// ```
pub struct AstParser;

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Module path of the file relative to its source root (e.g. `models::user`)
    pub namespace: String,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl ParsedFile {
    /// Builds a `ParsedFile` directly from source text. Used by tests and by
    /// callers that already hold the source in memory.
    pub fn from_source(path: impl Into<PathBuf>, namespace: &str, source: &str) -> Result<Self> {
        let path = path.into();
        let syntax_tree = syn::parse_file(source).map_err(|e| Error::parse(&path, &e))?;
        Ok(Self {
            path,
            namespace: namespace.to_string(),
            syntax_tree,
        })
    }
}

impl AstParser {
    /// Parses a single Rust source file with an empty namespace.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        Self::parse_file_in(path, None)
    }

    /// Parses a file found under `root`, deriving its namespace from the
    /// relative path.
    pub fn parse_file_in(path: &Path, root: Option<&Path>) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let syntax_tree = syn::parse_file(&content).map_err(|e| Error::parse(path, &e))?;

        let namespace = root
            .map(|root| namespace_for(root, path))
            .unwrap_or_default();

        Ok(ParsedFile {
            path: path.to_path_buf(),
            namespace,
            syntax_tree,
        })
    }

    /// Parses every file under a source root, stopping at the first failure.
    ///
    /// There is no partial recovery: one malformed file fails the whole batch.
    pub fn parse_files(root: &Path, paths: &[PathBuf]) -> Result<Vec<ParsedFile>> {
        debug!("Parsing {} files under {}", paths.len(), root.display());

        paths
            .iter()
            .map(|path| Self::parse_file_in(path, Some(root)))
            .collect()
    }
}

/// Derives a module path from a file's location relative to its source root.
///
/// `src/`, `lib.rs`, `main.rs` and `mod.rs` contribute nothing, so
/// `<root>/src/models/user.rs` becomes `models::user` and `<root>/lib.rs`
/// becomes the empty (crate root) namespace.
pub fn namespace_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    if let Some(last) = segments.pop() {
        let stem = last.trim_end_matches(".rs").to_string();
        if !matches!(stem.as_str(), "lib" | "main" | "mod") {
            segments.push(stem);
        }
    }

    segments
        .into_iter()
        .filter(|s| s != "src")
        .collect::<Vec<_>>()
        .join("::")
}
