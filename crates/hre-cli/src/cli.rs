//! `hre` - inspect and synchronise the tables of an HRE project database

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Debug, Parser)]
#[command(name = "hre", version, about = "Inspect, export and import HRE project tables")]
pub struct Cli {
    /// Project database file; defaults to the last one used
    #[arg(long, global = true, env = "HRE_DATABASE")]
    pub database: Option<PathBuf>,

    /// Settings file to use instead of the user config directory
    #[arg(long, global = true, env = "HRE_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// CSV field delimiter
    #[arg(long, global = true)]
    pub delimiter: Option<char>,

    /// Write a header row on export and skip the first record on import
    #[arg(long, global = true)]
    pub header: bool,

    /// Roll the whole import back if any record fails
    #[arg(long, global = true)]
    pub atomic: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List tables with their row counts
    Tables,
    /// Show the columns of a table
    Describe { table: String },
    /// Print every row of a table
    Select { table: String },
    /// Delete every row of a table
    Delete {
        table: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Import rows from a CSV file
    Import { table: String, file: PathBuf },
    /// Export rows to a CSV file
    Export { table: String, file: PathBuf },
    /// Show or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the current settings as JSON
    Show,
    /// Remember a database as the default
    SetDatabase { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = commands::load_settings(&cli)?;

    let _guard = logging::init(&logging::LoggingConfig::from_settings(&settings.logging))?;

    let mut out = std::io::stdout().lock();
    commands::run(&cli, settings, &mut out).inspect_err(|e| {
        tracing::error!(error = %e, "command failed");
    })
}
