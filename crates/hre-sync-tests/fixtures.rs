//! Test fixtures: temporary project databases and CSV files.
//!
//! Every [`TestDatabase`] lives in its own temporary directory and is removed
//! when dropped.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hre_sync_tests::fixtures::{people_db, TestDatabase};
//! use rstest::rstest;
//!
//! #[rstest]
//! fn test_select(people_db: TestDatabase) {
//!     let rows = people_db.service().select_all("PEOPLE").unwrap();
//!     assert_eq!(rows.len(), 2);
//! }
//! ```

use anyhow::{Context, Result};
use hre_driver_sqlite::SqliteConnection;
use hre_tablesync::{SyncOptions, TableSyncService};
use indoc::indoc;
use once_cell::sync::Lazy;
use rstest::fixture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

static TRACING: Lazy<()> = Lazy::new(|| {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

/// Install the test log subscriber once per process
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// The PEOPLE table used throughout the scenario tests
pub const PEOPLE_SCHEMA: &str = indoc! {"
    CREATE TABLE PEOPLE (ID INTEGER, NAME VARCHAR(40), BIRTH DOUBLE);
    INSERT INTO PEOPLE VALUES (1, 'Anna', 1900);
    INSERT INTO PEOPLE VALUES (2, 'Bo', NULL);
"};

/// A table covering every column type family, with awkward text values
pub const SAMPLES_SCHEMA: &str = indoc! {"
    CREATE TABLE SAMPLES (
        ID BIGINT NOT NULL,
        LABEL VARCHAR(80),
        NOTE CLOB,
        WEIGHT DOUBLE,
        PRICE DECIMAL(10,2),
        ACTIVE BOOLEAN,
        TAKEN DATE,
        RECORDED TIMESTAMP,
        RAW VARBINARY(16),
        SCALED DOUBLE(10,2)
    );
    INSERT INTO SAMPLES VALUES
        (1, 'plain', 'multi\nline', 1.5, 12.5, 1, '1900-02-28', '1900-02-28 10:15:00', X'DEAD', 1.234);
    INSERT INTO SAMPLES VALUES
        (2, 'semi;colon', 'say \"hi\"', -0.25, 3, 0, '2001-12-31', '2001-12-31 23:59:59', X'00FF', 2.5);
    INSERT INTO SAMPLES VALUES
        (3, '', NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL);
"};

/// A project database file in a temporary directory
pub struct TestDatabase {
    dir: TempDir,
    path: PathBuf,
    connection: Arc<SqliteConnection>,
}

impl TestDatabase {
    /// Create a database file and run `schema` against it
    pub fn with_schema(schema: &str) -> Result<Self> {
        init_tracing();
        let dir = tempfile::tempdir().context("Failed to create temp dir")?;
        let path = dir.path().join("project.db");
        let connection = SqliteConnection::open(
            path.to_str().context("Temp path is not valid UTF-8")?,
        )?;
        connection.execute_batch(schema)?;
        Ok(Self {
            dir,
            path,
            connection: Arc::new(connection),
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The open connection
    pub fn connection(&self) -> Arc<SqliteConnection> {
        self.connection.clone()
    }

    /// Service with default options
    pub fn service(&self) -> TableSyncService {
        TableSyncService::new(self.connection.clone())
    }

    /// Service with the given options
    pub fn service_with(&self, options: SyncOptions) -> TableSyncService {
        self.service().with_options(options)
    }

    /// Path for a file inside the database's temporary directory
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `contents` to a file in the temporary directory
    pub fn write_file(&self, name: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.file(name);
        std::fs::write(&path, contents).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }
}

/// Database holding the PEOPLE table
#[fixture]
pub fn people_db() -> TestDatabase {
    TestDatabase::with_schema(PEOPLE_SCHEMA).expect("failed to create PEOPLE database")
}

/// Database holding the SAMPLES table
#[fixture]
pub fn samples_db() -> TestDatabase {
    TestDatabase::with_schema(SAMPLES_SCHEMA).expect("failed to create SAMPLES database")
}

/// Display rows of a table, sorted, since selection order is unspecified
pub fn sorted_display_rows(service: &TableSyncService, table: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = service.select_all(table)?.display_rows();
    rows.sort();
    Ok(rows)
}
