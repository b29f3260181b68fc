//! Run-level error types for the validation runtime.
//!
//! Only problems that make a run meaningless are errors here. A field
//! failing a rule is never an `Err`; it becomes a report entry.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A fatal problem that aborts a validation run before or while rows are read.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The header row does not name the declared columns in order.
    #[error("header mismatch at column {position}: expected '{expected}', found '{found}'")]
    HeaderMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    /// The header row has the wrong number of fields.
    #[error("column count mismatch: expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    /// The input has no header row although the schema expects one.
    #[error("missing header row")]
    MissingHeader,

    /// The CSV reader rejected the input.
    #[error("csv read error: {0}")]
    Csv(#[from] csv::Error),

    /// The input file could not be opened.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result alias for run-level operations.
pub type EvalResult<T> = Result<T, EvalError>;

/// Why a data expression produced no value for the current row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("column ${0} is not present in the row")]
    MissingColumn(String),
    #[error("unsupported encoding '{0}'")]
    UnsupportedEncoding(String),
    #[error("'{0}' is not valid percent-encoded {1}")]
    InvalidEncoding(String, &'static str),
}
