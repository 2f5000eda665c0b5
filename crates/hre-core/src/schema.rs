//! Schema introspection traits and types

use crate::Result;
use serde::{Deserialize, Serialize};

/// Catalog introspection interface
pub trait SchemaIntrospection: Send + Sync {
    /// List all user tables (no views or internal tables)
    fn list_tables(&self) -> Result<Vec<TableInfo>>;

    /// Check whether a table exists
    fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_tables()?.iter().any(|t| t.name == name))
    }

    /// Get columns for a table, in ordinal order.
    ///
    /// Implementations return `HreError::NotFound` when the table is absent.
    fn get_columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;
}

/// Table information (basic)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub row_count: Option<i64>,
}

/// Column information from the catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub ordinal: usize,
    /// Declared type string, e.g. `VARCHAR(255)` or `DECIMAL(10,2)`
    pub data_type: String,
    pub nullable: bool,
}
