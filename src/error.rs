use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors raised by the pipeline.
///
/// Everything here aborts a run. Recoverable conditions (unknown handlers,
/// malformed validation directives, union subset hints) are logged and
/// collected as diagnostics instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {}: {message}", path.display())]
    Walk { path: PathBuf, message: String },

    #[error("failed to parse {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    #[error("source directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(file: impl Into<PathBuf>, err: &syn::Error) -> Self {
        let start = err.span().start();
        Error::Parse {
            file: file.into(),
            message: format!("{} (line {}, column {})", err, start.line, start.column),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}
