//! HRE Table Sync - table metadata and CSV synchronisation
//!
//! [`TableSyncService`] reads catalog metadata for a table, fetches or
//! deletes all of its rows, and moves rows between the table and a delimited
//! text file. Fields are paired with columns by position and converted with
//! the column's declared [`ColumnType`].

mod column_type;
mod csv_format;
mod csv_reader;
mod csv_writer;
mod descriptor;
mod error;
mod events;
mod row_set;
mod service;

pub use column_type::{ColumnType, TypeDeclaration};
pub use csv_format::{CsvOptions, FieldDelimiter, RecordDelimiter, TextQualifier};
pub use csv_reader::{CsvField, CsvReadError, CsvRecord, CsvRecordReader};
pub use csv_writer::CsvRecordWriter;
pub use descriptor::{ColumnDescriptor, ExportColumn};
pub use error::{Result, TableSyncError};
pub use events::{
    SyncOperation, SyncProgress, SyncProgressCallback, TableChangeEvent, TableChangeKind,
    TableChangeListener,
};
pub use row_set::RowSet;
pub use service::{BulkAtomicity, SyncOptions, TableSummary, TableSyncService};
