//! Table sync service

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use hre_core::{Connection, HreError, SchemaIntrospection, StatementResult, Value};
use serde::{Deserialize, Serialize};

use crate::csv_format::CsvOptions;
use crate::csv_reader::{CsvReadError, CsvRecordReader};
use crate::csv_writer::CsvRecordWriter;
use crate::descriptor::{ColumnDescriptor, ExportColumn};
use crate::error::{Result, TableSyncError};
use crate::events::{
    SyncOperation, SyncProgress, SyncProgressCallback, TableChangeEvent, TableChangeKind,
    TableChangeListener,
};
use crate::row_set::RowSet;

/// Rows between two progress reports
const PROGRESS_INTERVAL: u64 = 1000;

/// How much of an import is undone when it fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BulkAtomicity {
    /// Every insert stands on its own; rows before the failure are kept
    #[default]
    Statement,
    /// The whole import runs in one transaction and is rolled back on failure
    Transaction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    pub csv: CsvOptions,
    pub atomicity: BulkAtomicity,
}

/// A user table with its current row count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub row_count: u64,
}

/// Reads and writes whole tables of a caller-owned connection.
///
/// Holds no state between calls: metadata is read from the catalog on every
/// operation, and the connection is never opened or closed here.
pub struct TableSyncService {
    connection: Arc<dyn Connection>,
    options: SyncOptions,
    progress_callback: Option<SyncProgressCallback>,
    change_listener: Option<TableChangeListener>,
}

impl TableSyncService {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self {
            connection,
            options: SyncOptions::default(),
            progress_callback: None,
            change_listener: None,
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Set progress callback for imports and exports
    pub fn with_progress_callback(mut self, callback: SyncProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Set listener notified after a table's rows were deleted or imported
    pub fn with_change_listener(mut self, listener: TableChangeListener) -> Self {
        self.change_listener = Some(listener);
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    fn report_progress(&self, progress: SyncProgress) {
        if let Some(ref callback) = self.progress_callback {
            callback(progress);
        }
    }

    fn notify_change(&self, table: &str, kind: TableChangeKind, rows: u64) {
        if let Some(ref listener) = self.change_listener {
            listener(&TableChangeEvent {
                table: table.to_string(),
                kind,
                rows,
            });
        }
    }

    fn schema(&self) -> Result<&dyn SchemaIntrospection> {
        self.connection
            .as_schema_introspection()
            .ok_or_else(|| TableSyncError::Connection {
                message: format!(
                    "{} connections do not support catalog queries",
                    self.connection.driver_name()
                ),
                rows_imported: 0,
            })
    }

    fn ensure_table(&self, table: &str) -> Result<()> {
        if self.schema()?.table_exists(table)? {
            Ok(())
        } else {
            Err(TableSyncError::NotFound(table.to_string()))
        }
    }

    fn validate_options(&self) -> Result<()> {
        self.options
            .csv
            .validate()
            .map_err(TableSyncError::InvalidOptions)
    }

    /// Column metadata of `table` in ordinal order
    #[tracing::instrument(skip(self))]
    pub fn describe_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let columns: Vec<ColumnDescriptor> = self
            .schema()?
            .get_columns(table)?
            .iter()
            .map(ColumnDescriptor::from_column_info)
            .collect();

        if columns.is_empty() {
            return Err(TableSyncError::NotFound(table.to_string()));
        }
        tracing::debug!(column_count = columns.len(), "columns described");
        Ok(columns)
    }

    /// Every row of `table`, in whatever order the engine returns them
    #[tracing::instrument(skip(self))]
    pub fn select_all(&self, table: &str) -> Result<RowSet> {
        let columns = self.describe_columns(table)?;
        let sql = self.select_sql(table, &columns);
        tracing::debug!(sql = %sql, "selecting rows");

        let result = self.connection.query(&sql, &[])?;
        let mut rows = RowSet::new(columns);
        rows.rows = result.rows.into_iter().map(|row| row.into_values()).collect();

        tracing::debug!(row_count = rows.len(), "rows selected");
        Ok(rows)
    }

    /// Delete every row of `table`, returning how many were removed
    #[tracing::instrument(skip(self))]
    pub fn delete_all(&self, table: &str) -> Result<u64> {
        self.ensure_table(table)?;
        let sql = format!("DELETE FROM {}", self.connection.quote_identifier(table));
        let StatementResult { affected_rows } = self.connection.execute(&sql, &[])?;

        tracing::info!(rows = affected_rows, "table emptied");
        self.notify_change(table, TableChangeKind::Deleted, affected_rows);
        Ok(affected_rows)
    }

    /// Insert one row per CSV record of `path`, matching fields to columns by
    /// position. Returns the number of rows inserted.
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn import_csv(&self, table: &str, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        self.validate_options()?;
        let columns = self.describe_columns(table)?;

        let file = File::open(path).map_err(|e| TableSyncError::io(path, e))?;
        let reader = CsvRecordReader::new(BufReader::new(file), &self.options.csv);
        let sql = self.insert_sql(table, &columns);

        let result = match self.options.atomicity {
            BulkAtomicity::Statement => {
                let insert = |params: &[Value]| self.connection.execute(&sql, params);
                self.insert_records(table, path, &columns, reader, &insert)
            }
            BulkAtomicity::Transaction => {
                let tx = self.connection.begin_transaction()?;
                let insert = |params: &[Value]| tx.execute(&sql, params);
                let inserted = self.insert_records(table, path, &columns, reader, &insert);
                match inserted {
                    Ok(rows) => tx
                        .commit()
                        .map(|_| rows)
                        .map_err(|e| TableSyncError::from(e).with_rows_imported(0)),
                    Err(e) => {
                        if let Err(rollback) = tx.rollback() {
                            tracing::error!(error = %rollback, "failed to roll back import");
                        }
                        Err(e.with_rows_imported(0))
                    }
                }
            }
        };

        match result {
            Ok(rows) => {
                tracing::info!(rows, "CSV import complete");
                self.report_progress(SyncProgress::finished(table, SyncOperation::Import, rows));
                self.notify_change(table, TableChangeKind::Imported, rows);
                Ok(rows)
            }
            Err(e) => {
                tracing::warn!(error = %e, rows_imported = e.rows_imported(), "CSV import aborted");
                // Rows kept by a partial import are a change too.
                if e.rows_imported() > 0 {
                    self.notify_change(table, TableChangeKind::Imported, e.rows_imported());
                }
                Err(e)
            }
        }
    }

    fn insert_records<R: std::io::BufRead>(
        &self,
        table: &str,
        path: &Path,
        columns: &[ColumnDescriptor],
        mut reader: CsvRecordReader<R>,
        insert: &dyn Fn(&[Value]) -> hre_core::Result<StatementResult>,
    ) -> Result<u64> {
        let mut rows: u64 = 0;
        let mut skip_header = self.options.csv.has_header;

        loop {
            let record = match reader.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(CsvReadError::Io(e)) => return Err(TableSyncError::io(path, e)),
                Err(CsvReadError::Malformed { line, message }) => {
                    return Err(TableSyncError::Format {
                        line,
                        message,
                        rows_imported: rows,
                    });
                }
            };

            if skip_header {
                skip_header = false;
                continue;
            }
            // A blank line is a NULL row only when there is a single column.
            if record.is_blank() && columns.len() != 1 {
                continue;
            }
            if record.fields.len() != columns.len() {
                return Err(TableSyncError::Format {
                    line: record.line,
                    message: format!(
                        "expected {} fields, found {}",
                        columns.len(),
                        record.fields.len()
                    ),
                    rows_imported: rows,
                });
            }

            let mut params = Vec::with_capacity(columns.len());
            for (field, column) in record.fields.iter().zip(columns) {
                let text = (!field.is_null()).then_some(field.text.as_str());
                let value = column.coerce(text).map_err(|message| TableSyncError::Format {
                    line: record.line,
                    message: format!("column {}: {}", column.name, message),
                    rows_imported: rows,
                })?;
                params.push(value);
            }

            insert(&params).map_err(|e| TableSyncError::from(e).with_rows_imported(rows))?;
            rows += 1;

            if rows % PROGRESS_INTERVAL == 0 {
                self.report_progress(SyncProgress::running(table, SyncOperation::Import, rows));
            }
        }

        Ok(rows)
    }

    /// Write every row of `table` to `path`, returning the number of rows written
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn export_csv(&self, table: &str, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        self.validate_options()?;
        let rows = self.select_all(table)?;
        let export_columns: Vec<ExportColumn> = rows.columns.iter().map(ExportColumn::from).collect();

        let file = File::create(path).map_err(|e| TableSyncError::io(path, e))?;
        let mut writer = CsvRecordWriter::new(BufWriter::new(file), &self.options.csv);

        if self.options.csv.has_header {
            let header: Vec<Option<String>> =
                export_columns.iter().map(|c| Some(c.name.clone())).collect();
            writer
                .write_record(&header)
                .map_err(|e| TableSyncError::io(path, e))?;
        }

        let mut written: u64 = 0;
        for row in &rows.rows {
            let fields: Vec<Option<String>> = export_columns
                .iter()
                .zip(row)
                .map(|(column, value)| column.format(value))
                .collect();
            writer
                .write_record(&fields)
                .map_err(|e| TableSyncError::io(path, e))?;
            written += 1;

            if written % PROGRESS_INTERVAL == 0 {
                self.report_progress(SyncProgress::running(table, SyncOperation::Export, written));
            }
        }
        writer.flush().map_err(|e| TableSyncError::io(path, e))?;

        tracing::info!(rows = written, "CSV export complete");
        self.report_progress(SyncProgress::finished(table, SyncOperation::Export, written));
        Ok(written)
    }

    /// User tables sorted by name, with their row counts
    #[tracing::instrument(skip(self))]
    pub fn list_tables(&self) -> Result<Vec<TableSummary>> {
        let mut tables: Vec<TableSummary> = self
            .schema()?
            .list_tables()?
            .into_iter()
            .map(|t| TableSummary {
                name: t.name,
                row_count: t.row_count.unwrap_or(0).max(0) as u64,
            })
            .collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tables)
    }

    pub fn column_count(&self, table: &str) -> Result<usize> {
        Ok(self.describe_columns(table)?.len())
    }

    pub fn row_count(&self, table: &str) -> Result<u64> {
        self.ensure_table(table)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            self.connection.quote_identifier(table)
        );
        let result = self.connection.query(&sql, &[])?;
        result
            .scalar()
            .and_then(|v| v.as_i64())
            .map(|count| count.max(0) as u64)
            .ok_or_else(|| {
                TableSyncError::from(HreError::Query(format!(
                    "COUNT(*) on {} returned no value",
                    table
                )))
            })
    }

    fn select_sql(&self, table: &str, columns: &[ColumnDescriptor]) -> String {
        let column_list: Vec<String> = columns
            .iter()
            .map(|c| self.connection.quote_identifier(&c.name))
            .collect();
        format!(
            "SELECT {} FROM {}",
            column_list.join(", "),
            self.connection.quote_identifier(table)
        )
    }

    fn insert_sql(&self, table: &str, columns: &[ColumnDescriptor]) -> String {
        let column_list: Vec<String> = columns
            .iter()
            .map(|c| self.connection.quote_identifier(&c.name))
            .collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.connection.quote_identifier(table),
            column_list.join(", "),
            placeholders.join(", ")
        )
    }
}
