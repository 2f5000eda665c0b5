//! Connection trait and transaction handling

use crate::{QueryResult, Result, SchemaIntrospection, StatementResult, Value};

/// A database connection
///
/// The connection is owned by the caller. Consumers borrow it (usually as an
/// `Arc<dyn Connection>`) and never open or close it on their own.
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite")
    fn driver_name(&self) -> &str;

    /// Execute a statement that modifies data (INSERT/UPDATE/DELETE)
    fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT)
    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Quote an identifier for use in generated SQL.
    ///
    /// The default is ANSI double quotes with embedded quotes doubled.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Begin a transaction
    fn begin_transaction(&self) -> Result<Box<dyn Transaction>>;

    /// Close the connection
    fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Get schema introspection interface if supported
    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        None
    }
}

/// A database transaction
pub trait Transaction: Send + Sync {
    /// Commit the transaction
    fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    fn rollback(self: Box<Self>) -> Result<()>;

    /// Execute a query within the transaction
    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute a statement within the transaction
    fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;
}
