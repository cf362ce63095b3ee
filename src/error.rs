//! Error types for the phrase replacement library.
//!
//! Errors are categorized by where they happen: building the matcher,
//! validating a requested conversion, reading or writing a document, and
//! interpreting its contents.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for replacement operations.
pub type ReplaceResult<T> = Result<T, ReplaceError>;

/// Error type for all replacement operations.
#[derive(Debug, Error)]
pub enum ReplaceError {
    /// A matcher cannot be built without at least one search phrase
    #[error("Cannot build a matcher from an empty pattern set")]
    EmptyPatternSet,

    /// Source and destination formats cannot be combined
    #[error("Cannot convert {from} to {to}: {reason}")]
    UnsupportedConversion {
        from: String,
        to: String,
        reason: String,
    },

    /// A document is missing a required part or cannot be parsed
    #[error("Malformed document '{}': {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    /// Error occurred while reading or writing files
    #[error("IO error for path '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The zip container of a document could not be read or written
    #[error("Archive error for path '{}': {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Invalid configuration or parameters
    #[error("Invalid input for '{parameter}': {reason}")]
    InvalidInput { parameter: String, reason: String },
}

impl ReplaceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
