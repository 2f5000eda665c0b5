//! SQLite driver implementation

use hre_core::{Connection, ConnectionConfig, DatabaseDriver, HreError, Result};
use std::sync::Arc;

use crate::SqliteConnection;

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }

    /// Open a concrete [`SqliteConnection`] from a config.
    ///
    /// The `create` parameter (default `true`) controls whether a missing
    /// database file is created or reported as a connection error.
    pub fn open(&self, config: &ConnectionConfig) -> Result<SqliteConnection> {
        if config.driver != self.name() {
            return Err(HreError::Configuration(format!(
                "Driver '{}' cannot open a '{}' connection",
                self.name(),
                config.driver
            )));
        }
        let path = config
            .get_string("path")
            .or_else(|| config.get_string("database"))
            .ok_or_else(|| HreError::Configuration(
                "SQLite requires 'path' or 'database' parameter. Example: { \"path\": \"/path/to/project.db\" }".into()
            ))?;

        let create = config
            .get_string("create")
            .map(|v| v != "false")
            .unwrap_or(true);

        let conn = if create {
            SqliteConnection::open(&path)
        } else {
            SqliteConnection::open_existing(&path)
        }
        .inspect_err(|e| tracing::error!(error = %e, "failed to connect to SQLite database"))?;

        tracing::info!(path = %path, "SQLite connection created");
        Ok(conn)
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, config), fields(path = config.get_string("path").or_else(|| config.get_string("database")).as_deref()))]
    fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        Ok(Arc::new(self.open(config)?))
    }
}
