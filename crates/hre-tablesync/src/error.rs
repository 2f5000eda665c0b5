//! Table sync error types

use hre_core::HreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for table sync operations
pub type Result<T> = std::result::Result<T, TableSyncError>;

/// Errors reported by [`crate::TableSyncService`]
#[derive(Debug, Error)]
pub enum TableSyncError {
    #[error("Table not found: {0}")]
    NotFound(String),

    #[error("Database error: {message}")]
    Connection { message: String, rows_imported: u64 },

    #[error("Format error on line {line}: {message} ({rows_imported} rows imported)")]
    Format {
        line: usize,
        message: String,
        rows_imported: u64,
    },

    #[error("IO error on '{path}': {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid CSV options: {0}")]
    InvalidOptions(String),
}

impl TableSyncError {
    /// Rows inserted before an import failed. Zero for every other kind.
    pub fn rows_imported(&self) -> u64 {
        match self {
            TableSyncError::Connection { rows_imported, .. }
            | TableSyncError::Format { rows_imported, .. } => *rows_imported,
            _ => 0,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TableSyncError::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach an imported row count to a database error
    pub(crate) fn with_rows_imported(self, rows: u64) -> Self {
        match self {
            TableSyncError::Connection { message, .. } => TableSyncError::Connection {
                message,
                rows_imported: rows,
            },
            TableSyncError::Format { line, message, .. } => TableSyncError::Format {
                line,
                message,
                rows_imported: rows,
            },
            other => other,
        }
    }
}

impl From<HreError> for TableSyncError {
    fn from(err: HreError) -> Self {
        match err {
            HreError::NotFound(message) => TableSyncError::NotFound(message),
            HreError::Io(source) => TableSyncError::Io {
                path: PathBuf::new(),
                source,
            },
            other => TableSyncError::Connection {
                message: other.to_string(),
                rows_imported: 0,
            },
        }
    }
}
