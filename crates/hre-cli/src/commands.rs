//! Command handlers

use anyhow::{Context, Result, bail};
use comfy_table::{Table, presets::UTF8_FULL};
use hre_core::{ConnectionConfig, DatabaseDriver};
use hre_driver_sqlite::SqliteDriver;
use hre_settings::HreSettings;
use hre_tablesync::{BulkAtomicity, SyncOptions, SyncProgress, TableSyncService};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Cli, Command, ConfigAction};

fn settings_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.settings {
        Some(path) => Ok(path.clone()),
        None => hre_settings::settings_file(),
    }
}

pub fn load_settings(cli: &Cli) -> Result<HreSettings> {
    HreSettings::load_from(&settings_path(cli)?)
}

/// Stored defaults overridden by command-line flags
fn sync_options(cli: &Cli, settings: &HreSettings) -> SyncOptions {
    let mut options = settings.sync_options();
    if let Some(delimiter) = cli.delimiter {
        options.csv = options.csv.with_delimiter(delimiter);
    }
    if cli.header {
        options.csv.has_header = true;
    }
    if cli.atomic {
        options.atomicity = BulkAtomicity::Transaction;
    }
    options
}

fn database_path(cli: &Cli, settings: &HreSettings) -> Result<PathBuf> {
    cli.database
        .clone()
        .or_else(|| settings.database.path.clone())
        .context("No database given. Pass --database <path> or run `hre config set-database <path>`")
}

fn open_service(path: &Path, options: SyncOptions) -> Result<TableSyncService> {
    let path_str = path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {:?}", path))?;
    let config = ConnectionConfig::new_sqlite(path_str).with_param("create", false);
    let connection = SqliteDriver::new()
        .connect(&config)
        .with_context(|| format!("Failed to open database {:?}", path))?;

    Ok(TableSyncService::new(connection)
        .with_options(options)
        .with_progress_callback(Box::new(|progress: SyncProgress| {
            tracing::info!(
                table = %progress.table,
                rows = progress.rows_processed,
                "{}",
                progress.message
            );
        })))
}

/// Remember the database that was just opened so later runs can omit it
fn remember_database(cli: &Cli, settings: &mut HreSettings, path: &Path) {
    if settings.database.path.as_deref() == Some(path) {
        return;
    }
    settings.database.path = Some(path.to_path_buf());
    let saved = settings_path(cli).and_then(|p| settings.save_to(&p));
    if let Err(e) = saved {
        tracing::warn!(error = %e, "failed to remember database path");
    }
}

/// Open the database for a table command and remember it as the default
fn connect(cli: &Cli, settings: &mut HreSettings) -> Result<TableSyncService> {
    let path = database_path(cli, settings)?;
    let service = open_service(&path, sync_options(cli, settings))?;
    remember_database(cli, settings, &path);
    Ok(service)
}

pub fn run(cli: &Cli, mut settings: HreSettings, out: &mut impl Write) -> Result<()> {
    match &cli.command {
        Command::Tables => {
            let service = connect(cli, &mut settings)?;
            let mut table = new_table(vec!["Table", "Rows"]);
            for summary in service.list_tables()? {
                table.add_row(vec![summary.name, summary.row_count.to_string()]);
            }
            writeln!(out, "{table}")?;
        }
        Command::Describe { table } => {
            let service = connect(cli, &mut settings)?;
            let mut output = new_table(vec!["#", "Column", "Type", "Nullable"]);
            for column in service.describe_columns(table)? {
                output.add_row(vec![
                    (column.ordinal + 1).to_string(),
                    column.name.clone(),
                    column.declared_type(),
                    if column.nullable { "yes" } else { "no" }.to_string(),
                ]);
            }
            writeln!(out, "{output}")?;
        }
        Command::Select { table } => {
            let service = connect(cli, &mut settings)?;
            let rows = service.select_all(table)?;
            let mut output = new_table(rows.column_names());
            for row in rows.display_rows() {
                output.add_row(row);
            }
            writeln!(out, "{output}")?;
            writeln!(out, "{} rows", rows.len())?;
        }
        Command::Delete { table, yes } => {
            if !yes {
                bail!("Refusing to delete every row of {table} without --yes");
            }
            let service = connect(cli, &mut settings)?;
            let deleted = service.delete_all(table)?;
            writeln!(out, "Deleted {deleted} rows from {table}")?;
        }
        Command::Import { table, file } => {
            let service = connect(cli, &mut settings)?;
            let imported = service
                .import_csv(table, file)
                .with_context(|| format!("Import of {:?} into {table} failed", file))?;
            writeln!(out, "Imported {imported} rows into {table}")?;
        }
        Command::Export { table, file } => {
            let service = connect(cli, &mut settings)?;
            let exported = service
                .export_csv(table, file)
                .with_context(|| format!("Export of {table} to {:?} failed", file))?;
            writeln!(out, "Exported {exported} rows to {}", file.display())?;
        }
        Command::Config { action } => run_config(cli, &mut settings, action, out)?,
    }
    Ok(())
}

fn run_config(
    cli: &Cli,
    settings: &mut HreSettings,
    action: &ConfigAction,
    out: &mut impl Write,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            writeln!(out, "{}", serde_json::to_string_pretty(settings)?)?;
        }
        ConfigAction::SetDatabase { path } => {
            settings.database.path = Some(path.clone());
            settings.save_to(&settings_path(cli)?)?;
            writeln!(out, "Default database set to {}", path.display())?;
        }
    }
    Ok(())
}

fn new_table<T: Into<comfy_table::Cell>>(header: Vec<T>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    table
}
