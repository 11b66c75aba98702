//! Error types for modpatch

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for modpatch operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The input archive could not be opened as a zip container
    #[error("Cannot read archive {}: {source}", .path.display())]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// A JSON document failed to parse
    #[error("Malformed JSON document {}: {source}", .path.display())]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A field required by an edit is absent
    #[error("Missing field `{field}` in {}", .path.display())]
    MissingField { path: PathBuf, field: String },

    /// Copy/move/remove failure on a specific path
    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Delta error: {0}")]
    Delta(String),

    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("Invalid rule file {}: {reason}", .path.display())]
    InvalidRuleFile { path: PathBuf, reason: String },
}

impl Error {
    /// Build a `map_err` adapter that tags an IO error with the path it happened on
    pub(crate) fn fs(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
        move |source| Error::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this error means the file or directory does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io(e) | Error::Filesystem { source: e, .. } => e.kind() == io::ErrorKind::NotFound,
            Error::MissingInput(_) => true,
            _ => false,
        }
    }
}

/// Result type alias for modpatch operations
pub type Result<T> = std::result::Result<T, Error>;
