//! Error types for per-file extraction.
//!
//! Every variant is fatal to the file being processed. Callers at the
//! inspection level turn these into bookkeeping categories instead of
//! aborting sibling files.

use thiserror::Error;

/// Failures raised while turning one report file into plot records.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The embedded document could not be located or parsed.
    #[error("unrecognized report format: {0}")]
    UnrecognizedFormat(String),

    /// The file is an Excel-only placeholder export, not a plot report.
    #[error("excel placeholder: {0}")]
    ExcelPlaceholder(String),

    /// A column name has no entry in the normalization table.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// The structural path is empty or lacks a `references` segment.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A `references` segment is not followed by an identifier.
    #[error("missing reference id in path: {0}")]
    MissingReferenceId(String),

    /// The walk produced no extraction tasks at all.
    #[error("no extraction results")]
    NoResults,

    /// No plot record survived assembly.
    #[error("no plot records survived assembly")]
    EmptyOutput,

    /// The numeric codec rejected an encoded array.
    #[error("codec failure for column {column}: {reason}")]
    Codec { column: String, reason: String },
}

impl ExtractError {
    /// Bookkeeping category for this failure.
    pub fn category(&self) -> &'static str {
        match self {
            ExtractError::ExcelPlaceholder(_) => "excel",
            _ => "failed",
        }
    }
}

/// Convenience alias for results with [`ExtractError`].
pub type Result<T> = std::result::Result<T, ExtractError>;
