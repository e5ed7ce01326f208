//! Error types for the content pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while loading, rendering or importing content
#[derive(Error, Debug)]
pub enum Error {
    /// The requested document does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A document's front matter could not be decoded
    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Front matter block is malformed (no file context yet)
    #[error("Front matter error: {0}")]
    FrontMatter(String),

    /// A layout referenced by a document has no matching view
    #[error("Layout does not exist: {0}")]
    LayoutMissing(String),

    /// Template rendering failed
    #[error("Render error: {0}")]
    Render(String),

    /// Content import failed
    #[error("Import error: {0}")]
    Import(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Attach a file path to a front matter error
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Error::FrontMatter(message) => Error::Parse {
                path: path.into(),
                message,
            },
            other => other,
        }
    }
}

impl From<tera::Error> for Error {
    fn from(err: tera::Error) -> Self {
        // tera keeps the useful part of the message in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Error::Render(message)
    }
}
