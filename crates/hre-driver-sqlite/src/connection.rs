//! SQLite connection implementation

use hre_core::{
    ColumnInfo, ColumnMeta, Connection, HreError, QueryResult, Result, Row, SchemaIntrospection,
    StatementResult, TableInfo, Transaction, Value,
};
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, ErrorCode, OpenFlags, params_from_iter};
use std::sync::Arc;

/// The rusqlite handle shared between a connection and its transactions.
///
/// `None` once the connection has been closed.
type SharedConnection = Arc<Mutex<Option<RusqliteConnection>>>;

/// SQLite connection wrapper
pub struct SqliteConnection {
    conn: SharedConnection,
    path: String,
}

impl SqliteConnection {
    /// Open a SQLite database, creating the file if it does not exist
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with(path, true)
    }

    /// Open an existing SQLite database; a missing file is a connection error
    pub fn open_existing(path: &str) -> Result<Self> {
        Self::open_with(path, false)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open_with(":memory:", true)
    }

    fn open_with(path: &str, create: bool) -> Result<Self> {
        tracing::info!(path = %path, create, "opening SQLite database");
        let expanded_path = Self::expand_path(path)?;

        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let in_memory = path == ":memory:";
        let conn = if in_memory {
            RusqliteConnection::open_in_memory().map_err(|e| {
                HreError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.exists()
                {
                    return Err(HreError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                HreError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| HreError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        if !in_memory {
            let mode: String = conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
                .map_err(|e| HreError::Connection(format!("Failed to set journal mode: {}", e)))?;
            tracing::debug!(journal_mode = %mode, "journal mode set");

            conn.pragma_update(None, "synchronous", "NORMAL").map_err(|e| {
                HreError::Connection(format!("Failed to set synchronous mode: {}", e))
            })?;
        }

        tracing::info!(path = %expanded_path, "SQLite database connection established");
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            path: expanded_path,
        })
    }

    /// Expand path to handle ~ (home directory) and relative paths
    fn expand_path(path: &str) -> Result<String> {
        if path == ":memory:" || path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                let home_path = std::path::PathBuf::from(home);
                home_path.join(rest).to_string_lossy().to_string()
            } else {
                return Err(HreError::Configuration(
                    "Unable to determine HOME directory".into(),
                ));
            }
        } else if path.starts_with('~') {
            return Err(HreError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        let result = if path_buf.is_relative() {
            std::env::current_dir()
                .map_err(HreError::Io)?
                .join(path_buf)
                .to_string_lossy()
                .to_string()
        } else {
            expanded
        };

        Ok(result)
    }

    /// Absolute path of the database file (or `:memory:`)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Execute multiple SQL statements in a batch (schema scripts, fixtures)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!("executing SQL batch");
        with_connection(&self.conn, |conn| {
            conn.execute_batch(sql)
                .map_err(|e| map_sqlite_error("Failed to execute batch", e))
        })
    }

    /// Get the row count for a specific table
    fn table_row_count(&self, table_name: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.quote_identifier(table_name));
        let result = self.query(&sql, &[])?;
        result
            .scalar()
            .and_then(|v| v.as_i64())
            .ok_or_else(|| HreError::Query("Row count is not an integer".into()))
    }
}

impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        with_connection(&self.conn, |conn| run_execute(conn, sql, params))
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        with_connection(&self.conn, |conn| run_query(conn, sql, params))
    }

    fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        tracing::debug!("beginning SQLite transaction");
        with_connection(&self.conn, |conn| {
            // DEFERRED: the write lock is taken by the first write, not here.
            conn.execute_batch("BEGIN DEFERRED")
                .map_err(|e| map_sqlite_error("Failed to begin transaction", e))
        })?;
        tracing::debug!("SQLite transaction started");
        Ok(Box::new(SqliteTransaction {
            conn: Arc::clone(&self.conn),
            committed: false,
            rolled_back: false,
        }))
    }

    fn close(&self) -> Result<()> {
        tracing::info!(path = %self.path, "closing SQLite connection");
        let taken = self.conn.lock().take();
        if let Some(conn) = taken {
            conn.close().map_err(|(_, e)| {
                HreError::Connection(format!("Failed to close SQLite connection: {}", e))
            })?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

impl SchemaIntrospection for SqliteConnection {
    #[tracing::instrument(skip(self))]
    fn list_tables(&self) -> Result<Vec<TableInfo>> {
        tracing::debug!("listing tables from sqlite_master");
        let result = self.query(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
            &[],
        )?;

        let mut tables = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            let Some(name) = row.get(0).and_then(|v| v.as_str()) else {
                continue;
            };
            let row_count = match self.table_row_count(name) {
                Ok(count) => Some(count),
                Err(e) => {
                    tracing::warn!(table = %name, error = %e, "failed to count rows");
                    None
                }
            };
            tables.push(TableInfo {
                name: name.to_string(),
                row_count,
            });
        }

        tracing::debug!(table_count = tables.len(), "tables listed");
        Ok(tables)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let result = self.query(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            &[Value::String(name.to_string())],
        )?;
        Ok(result.scalar().and_then(|v| v.as_i64()).unwrap_or(0) > 0)
    }

    #[tracing::instrument(skip(self))]
    fn get_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        tracing::trace!(table = %table, "fetching column information");
        if !self.table_exists(table)? {
            return Err(HreError::NotFound(format!("Table '{}' not found", table)));
        }

        let result = self.query(
            "SELECT cid, name, type, \"notnull\" \
             FROM pragma_table_info(?1) ORDER BY cid",
            &[Value::String(table.to_string())],
        )?;

        let columns = result
            .rows
            .iter()
            .map(|row| {
                let ordinal = row.get(0).and_then(|v| v.as_i64()).unwrap_or(0) as usize;
                let name = row
                    .get(1)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                // SQLite allows columns without a declared type.
                let data_type = row
                    .get(2)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let nullable = row.get(3).and_then(|v| v.as_i64()).unwrap_or(0) == 0;

                ColumnInfo {
                    name,
                    ordinal,
                    data_type,
                    nullable,
                }
            })
            .collect();

        Ok(columns)
    }
}

/// SQLite transaction wrapper.
///
/// Issues raw `BEGIN DEFERRED` / `COMMIT` / `ROLLBACK` SQL so that it can share
/// the connection `Arc<Mutex<..>>` without rusqlite's borrow-based
/// transaction lifetime.
pub struct SqliteTransaction {
    conn: SharedConnection,
    committed: bool,
    rolled_back: bool,
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if !self.committed && !self.rolled_back {
            tracing::warn!(
                "SQLite transaction dropped without commit or rollback, issuing automatic rollback"
            );
            let result = with_connection(&self.conn, |conn| {
                conn.execute_batch("ROLLBACK")
                    .map_err(|e| map_sqlite_error("Automatic rollback failed", e))
            });
            if let Err(e) = result {
                tracing::error!(error = %e, "automatic rollback on drop failed");
            }
        }
    }
}

impl Transaction for SqliteTransaction {
    fn commit(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("committing SQLite transaction");

        if self.rolled_back {
            return Err(HreError::Query("Transaction already rolled back".into()));
        }
        if self.committed {
            return Err(HreError::Query("Transaction already committed".into()));
        }

        with_connection(&self.conn, |conn| {
            conn.execute_batch("COMMIT")
                .map_err(|e| map_sqlite_error("Failed to commit transaction", e))
        })?;

        self.committed = true;
        tracing::debug!("SQLite transaction committed successfully");
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("rolling back SQLite transaction");

        if self.committed {
            return Err(HreError::Query("Transaction already committed".into()));
        }
        if self.rolled_back {
            return Ok(());
        }

        // Mark first so Drop does not retry a failed rollback.
        self.rolled_back = true;
        with_connection(&self.conn, |conn| {
            conn.execute_batch("ROLLBACK")
                .map_err(|e| map_sqlite_error("Failed to rollback transaction", e))
        })?;

        tracing::debug!("SQLite transaction rolled back successfully");
        Ok(())
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing query in SQLite transaction");
        with_connection(&self.conn, |conn| run_query(conn, sql, params))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing statement in SQLite transaction");
        with_connection(&self.conn, |conn| run_execute(conn, sql, params))
    }
}

/// Run `f` against the live rusqlite handle, or fail if the connection is closed
fn with_connection<T>(
    conn: &SharedConnection,
    f: impl FnOnce(&RusqliteConnection) -> Result<T>,
) -> Result<T> {
    let guard = conn.lock();
    let conn = guard
        .as_ref()
        .ok_or_else(|| HreError::Connection("SQLite connection is closed".into()))?;
    f(conn)
}

fn run_execute(conn: &RusqliteConnection, sql: &str, params: &[Value]) -> Result<StatementResult> {
    let rusqlite_params = values_to_rusqlite(params);

    // Bulk imports run the same INSERT once per row.
    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|e| map_sqlite_error("Failed to prepare statement", e))?;
    let rows_affected = stmt
        .execute(params_from_iter(rusqlite_params.iter()))
        .map_err(|e| map_sqlite_error("Failed to execute statement", e))?;

    tracing::debug!(affected_rows = rows_affected, "statement executed");
    Ok(StatementResult {
        affected_rows: rows_affected as u64,
    })
}

fn run_query(conn: &RusqliteConnection, sql: &str, params: &[Value]) -> Result<QueryResult> {
    let start_time = std::time::Instant::now();
    let rusqlite_params = values_to_rusqlite(params);

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| map_sqlite_error("Failed to prepare query", e))?;

    let mut columns: Vec<ColumnMeta> = Vec::with_capacity(stmt.column_count());

    for (idx, col) in stmt.columns().iter().enumerate() {
        let name = col.name().to_string();
        // sqlite3_column_decltype: the type from CREATE TABLE, if any
        let data_type = col.decl_type().unwrap_or("DYNAMIC").to_string();

        columns.push(ColumnMeta {
            name,
            data_type,
            ordinal: idx,
        });
    }

    let mut rows = Vec::new();
    let mut query_rows = stmt
        .query(params_from_iter(rusqlite_params.iter()))
        .map_err(|e| map_sqlite_error("Failed to execute query", e))?;

    while let Some(row) = query_rows
        .next()
        .map_err(|e| map_sqlite_error("Failed to fetch row", e))?
    {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(rusqlite_to_value(row, i)?);
        }
        rows.push(Row::new(values));
    }

    let execution_time_ms = start_time.elapsed().as_millis() as u64;
    tracing::debug!(
        row_count = rows.len(),
        execution_time_ms = execution_time_ms,
        "query executed successfully"
    );
    Ok(QueryResult {
        id: uuid::Uuid::new_v4(),
        columns,
        rows,
        execution_time_ms,
    })
}

/// Errors that mean the database file itself is unusable become connection
/// errors; everything else is a statement failure.
fn map_sqlite_error(context: &str, e: rusqlite::Error) -> HreError {
    match e.sqlite_error_code() {
        Some(
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::SystemIoFailure
            | ErrorCode::DatabaseCorrupt,
        ) => HreError::Connection(format!("{}: {}", context, e)),
        _ => HreError::Query(format!("{}: {}", context, e)),
    }
}

/// Convert our Value types to rusqlite-compatible types
fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(if *b { 1 } else { 0 }),
        Value::Int8(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int16(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int32(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int64(i) => rusqlite::types::Value::Integer(*i),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::Decimal(d) => rusqlite::types::Value::Text(d.clone()),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
        Value::Date(d) => rusqlite::types::Value::Text(d.to_string()),
        Value::Time(t) => rusqlite::types::Value::Text(t.to_string()),
        Value::DateTime(dt) => rusqlite::types::Value::Text(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
    }
}

/// Convert rusqlite row value to our Value type
fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| HreError::Query(e.to_string()))?;

    let value = match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        // Blobs stay binary so VARBINARY columns round-trip byte for byte.
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people_db() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE PEOPLE (ID INTEGER, NAME VARCHAR(40) NOT NULL, BIRTH DOUBLE);
             INSERT INTO PEOPLE VALUES (1, 'Anna', 1900);
             INSERT INTO PEOPLE VALUES (2, 'Bo', NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_query_returns_typed_values() {
        let conn = people_db();
        let result = conn.query("SELECT ID, NAME, BIRTH FROM PEOPLE ORDER BY ID", &[]).unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.columns[1].data_type, "VARCHAR(40)");
        assert_eq!(result.rows[0].values[0], Value::Int64(1));
        assert_eq!(result.rows[0].values[2], Value::Float64(1900.0));
        assert!(result.rows[1].values[2].is_null());
    }

    #[test]
    fn test_execute_reports_affected_rows() {
        let conn = people_db();
        let result = conn.execute("DELETE FROM PEOPLE", &[]).unwrap();
        assert_eq!(result.affected_rows, 2);
        let again = conn.execute("DELETE FROM PEOPLE", &[]).unwrap();
        assert_eq!(again.affected_rows, 0);
    }

    #[test]
    fn test_get_columns_reads_catalog() {
        let conn = people_db();
        let columns = conn.get_columns("PEOPLE").unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ID", "NAME", "BIRTH"]);
        assert_eq!(columns[1].data_type, "VARCHAR(40)");
        assert!(!columns[1].nullable);
        assert!(columns[2].nullable);
    }

    #[test]
    fn test_get_columns_missing_table_is_not_found() {
        let conn = people_db();
        let err = conn.get_columns("NOPE").unwrap_err();
        assert!(matches!(err, HreError::NotFound(_)));
    }

    #[test]
    fn test_table_exists_ignores_case() {
        let conn = people_db();
        assert!(conn.table_exists("people").unwrap());
        assert!(!conn.table_exists("persons").unwrap());
    }

    #[test]
    fn test_list_tables_includes_row_counts() {
        let conn = people_db();
        conn.execute_batch("CREATE TABLE EVENTS (ID INTEGER)").unwrap();
        let tables = conn.list_tables().unwrap();
        let summary: Vec<(&str, Option<i64>)> =
            tables.iter().map(|t| (t.name.as_str(), t.row_count)).collect();
        assert_eq!(summary, vec![("EVENTS", Some(0)), ("PEOPLE", Some(2))]);
    }

    #[test]
    fn test_transaction_rollback_discards_rows() {
        let conn = people_db();
        let tx = conn.begin_transaction().unwrap();
        tx.execute(
            "INSERT INTO PEOPLE VALUES (?1, ?2, ?3)",
            &[Value::Int64(3), Value::String("Cy".into()), Value::Null],
        )
        .unwrap();
        tx.rollback().unwrap();

        let count = conn.query("SELECT COUNT(*) FROM PEOPLE", &[]).unwrap();
        assert_eq!(count.scalar(), Some(&Value::Int64(2)));
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let conn = people_db();
        {
            let tx = conn.begin_transaction().unwrap();
            tx.execute("DELETE FROM PEOPLE", &[]).unwrap();
        }
        let count = conn.query("SELECT COUNT(*) FROM PEOPLE", &[]).unwrap();
        assert_eq!(count.scalar(), Some(&Value::Int64(2)));
    }

    #[test]
    fn test_blob_round_trips_as_bytes() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE B (DATA VARBINARY(8))").unwrap();
        conn.execute("INSERT INTO B VALUES (?1)", &[Value::Bytes(b"AB".to_vec())])
            .unwrap();
        let result = conn.query("SELECT DATA FROM B", &[]).unwrap();
        assert_eq!(result.scalar(), Some(&Value::Bytes(b"AB".to_vec())));
    }

    #[test]
    fn test_closed_connection_rejects_statements() {
        let conn = people_db();
        conn.close().unwrap();
        assert!(conn.is_closed());
        let err = conn.query("SELECT 1", &[]).unwrap_err();
        assert!(matches!(err, HreError::Connection(_)));
    }

    #[test]
    fn test_open_existing_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let result = SqliteConnection::open_existing(path.to_str().unwrap());
        assert!(matches!(result, Err(HreError::Connection(_))));
    }

    #[test]
    fn test_open_file_database_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.db");
        let conn = SqliteConnection::open(path.to_str().unwrap()).unwrap();
        let mode = conn.query("PRAGMA journal_mode", &[]).unwrap();
        assert_eq!(mode.scalar(), Some(&Value::String("wal".into())));
    }
}
