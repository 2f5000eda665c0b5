//! Progress reporting and change notifications

use serde::{Deserialize, Serialize};

/// Bulk operation a progress report belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOperation {
    Import,
    Export,
}

/// Progress of an import or export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncProgress {
    pub table: String,
    pub operation: SyncOperation,
    pub rows_processed: u64,
    pub finished: bool,
    pub message: String,
}

impl SyncProgress {
    pub(crate) fn running(table: &str, operation: SyncOperation, rows: u64) -> Self {
        Self {
            table: table.to_string(),
            operation,
            rows_processed: rows,
            finished: false,
            message: format!("{} rows processed", rows),
        }
    }

    pub(crate) fn finished(table: &str, operation: SyncOperation, rows: u64) -> Self {
        let verb = match operation {
            SyncOperation::Import => "imported",
            SyncOperation::Export => "exported",
        };
        Self {
            table: table.to_string(),
            operation,
            rows_processed: rows,
            finished: true,
            message: format!("{} rows {}", rows, verb),
        }
    }
}

/// Callback for progress updates
pub type SyncProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// What happened to a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableChangeKind {
    Deleted,
    Imported,
}

/// Fired after a mutation completes so views of the table can refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChangeEvent {
    pub table: String,
    pub kind: TableChangeKind,
    pub rows: u64,
}

/// Listener for table changes
pub type TableChangeListener = Box<dyn Fn(&TableChangeEvent) + Send + Sync>;
