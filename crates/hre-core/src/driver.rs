//! Database driver trait definition

use crate::{Connection, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Database driver trait
///
/// A driver turns a [`ConnectionConfig`] into a live [`Connection`]. The caller
/// owns the returned handle and decides when to drop or close it.
pub trait DatabaseDriver: Send + Sync {
    /// Machine name matched against [`ConnectionConfig::driver`] (e.g., "sqlite")
    fn name(&self) -> &'static str;

    /// Open a connection
    fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Driver name (e.g., "sqlite")
    pub driver: String,
    /// Database name or file path
    pub database: Option<String>,
    /// Additional connection parameters
    pub params: HashMap<String, String>,
}

impl ConnectionConfig {
    /// Create a new configuration with default values
    pub fn new(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            database: None,
            params: HashMap::new(),
        }
    }

    /// Create a SQLite configuration
    pub fn new_sqlite(database_path: &str) -> Self {
        let mut config = Self::new("sqlite");
        config.database = Some(database_path.to_string());
        config
    }

    /// Set a connection parameter
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let val = value.into();
        let str_val = match val {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        self.params.insert(key.to_string(), str_val);
        self
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<String> {
        if let Some(val) = self.params.get(key) {
            return Some(val.clone());
        }
        match key {
            "database" | "path" => self.database.clone(),
            _ => None,
        }
    }
}
