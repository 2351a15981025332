//! Error types for loading, transforming and exporting records.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced at the load / classify / export boundary.
///
/// Load failures (`UnsupportedFormat`, `Parse`, `EmptyDataset`, and a
/// `MalformedRecord` raised during normalization) abort the whole load.
/// Classification and export failures are local to one record.
#[derive(Debug, Error)]
pub enum Error {
    /// File extension is neither a universal file nor a MAT file.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// The file could not be decoded.
    #[error("Failed to parse {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: FormatError,
    },

    /// The file decoded fine but holds no usable dataset.
    #[error("No valid data sets found in {0}")]
    EmptyDataset(String),

    /// Abscissa/ordinate length mismatch or a degenerate ordinate shape.
    #[error("Malformed record {identity}: {reason}")]
    MalformedRecord { identity: String, reason: String },

    /// Only universal-file records can be written back out.
    #[error("Export is not supported for {0}")]
    UnsupportedExport(String),

    /// Writing the destination file failed.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn parse(context: impl Into<String>, source: FormatError) -> Self {
        Self::Parse {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn malformed(identity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            identity: identity.into(),
            reason: reason.into(),
        }
    }
}

/// Underlying cause of a [`Error::Parse`].
#[derive(Debug, Error)]
pub enum FormatError {
    /// I/O error reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Structural error in a text file.
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A field held a value that could not be interpreted.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Known container, unsupported revision.
    #[error("Unsupported {format} version: {version}")]
    UnsupportedVersion { format: String, version: String },

    /// The MAT container decoder rejected the file.
    #[error("MAT decoding failed: {0}")]
    Mat(#[from] matrw::MatrwError),
}

impl FormatError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
