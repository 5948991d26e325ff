use crate::error::{Error, Result};
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File scanner for traversing source directories.
///
/// The `FileScanner` recursively walks a source directory to find all Rust source files.
/// It skips `target` and hidden directories (those starting with `.`).
///
/// Unlike a best-effort crawler, any inaccessible entry is fatal: the pipeline
/// never builds a catalog from a partial view of the sources.
///
/// # Example
///
/// ```no_run
/// use apicontract::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-service/src"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} Rust files", result.rust_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
pub struct ScanResult {
    /// The directory that was scanned
    pub root: PathBuf,
    /// Paths to all discovered `.rs` files, sorted
    pub rust_files: Vec<PathBuf>,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified root directory.
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all `.rs` files.
    ///
    /// Files are returned in sorted order so that catalog registration (and
    /// therefore "first registration wins" on duplicate names) is stable
    /// across platforms.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDirectory`] if the root is not a directory, and
    /// [`Error::Walk`] if any entry below it cannot be accessed.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            return Err(Error::MissingDirectory(self.root_path.clone()));
        }

        let mut rust_files = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            let entry = entry.map_err(|e| Error::Walk {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root_path.clone()),
                message: e.to_string(),
            })?;

            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                rust_files.push(path.to_path_buf());
            }
        }

        rust_files.sort();
        debug!(
            "Scanned {}: {} Rust files",
            self.root_path.display(),
            rust_files.len()
        );

        Ok(ScanResult {
            root: self.root_path.clone(),
            rust_files,
        })
    }
}
