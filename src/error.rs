//! Error types for dataset handling and assertions.

use std::path::PathBuf;

use thiserror::Error;

use crate::assertion::Mismatch;

/// Main error type for dataset operations.
#[derive(Error, Debug)]
pub enum TabError {
    /// Requested table does not exist in the dataset
    #[error("no such table: {0}")]
    NoSuchTable(String),

    /// Requested column does not exist in the table
    #[error("no such column: {column} in table {table}")]
    NoSuchColumn { table: String, column: String },

    /// Row index outside the table's row range
    #[error("row {row} out of bounds for table {table} ({count} rows)")]
    RowOutOfBounds {
        table: String,
        row: usize,
        count: usize,
    },

    /// A table with the same (normalized) name was already registered
    #[error("ambiguous table name: {0} is already present")]
    AmbiguousTableName(String),

    /// Producer emitted events out of the required order
    #[error("dataset stream protocol violation: {0}")]
    Protocol(String),

    /// Table has no declared key columns (required for update/delete/refresh)
    #[error("table {0} has no key columns - update, delete and refresh require them")]
    NoKeyColumns(String),

    /// Value cannot be coerced to the declared column type
    #[error("cannot coerce {value} to {data_type}")]
    TypeMismatch { value: String, data_type: String },

    /// Malformed dataset file
    #[error("malformed dataset {path}: {message}")]
    Format { path: PathBuf, message: String },

    /// File extension or content does not map to a supported dataset format
    #[error("unsupported dataset format: {0}")]
    UnsupportedFormat(String),

    /// A table comparison failed (fail-fast handler)
    #[error("assertion failed: {0}")]
    Assertion(Mismatch),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML read/write error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Excel workbook error
    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// YAML read/write error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error (reports)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TabError {
    /// Create a Format error for a malformed dataset file
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        TabError::Format {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a NoSuchColumn error
    pub fn no_such_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        TabError::NoSuchColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a Protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        TabError::Protocol(message.into())
    }
}

/// Result type alias for dataset operations.
pub type Result<T> = std::result::Result<T, TabError>;
