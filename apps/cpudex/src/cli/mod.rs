//! # CLI Interface
//!
//! clap-based commands: `serve`, `import`, `export`, `stats`. Secrets and
//! defaults come from the environment ([`crate::config`]); flags override
//! where one exists.

use crate::api::{self, AppState};
use crate::config::{self, Config};
use clap::{Parser, Subcommand, ValueEnum};
use cpudex_core::{ImportOptions, ImportReport, Importer, QueryService, RedbStore};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] cpudex_core::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Render(#[from] serde_json::Error),
}

// =============================================================================
// COMMAND LINE
// =============================================================================

/// CPU specification catalog server and tooling.
#[derive(Debug, Parser)]
#[command(name = "cpudex", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server.
    Serve {
        /// Port to listen on (overrides CPUDEX_PORT).
        #[arg(long)]
        port: Option<u16>,
        /// Database file (overrides CPUDEX_DB).
        #[arg(long)]
        db: Option<PathBuf>,
        /// Directory with the static web page (overrides CPUDEX_STATIC_DIR).
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Import a semicolon-delimited CSV file.
    Import {
        /// Source CSV file.
        file: PathBuf,
        /// Database file (overrides CPUDEX_DB).
        #[arg(long)]
        db: Option<PathBuf>,
        /// Remove all existing records first (irreversible).
        #[arg(long)]
        clear: bool,
        /// Replace records whose model name matches a row.
        #[arg(long)]
        overwrite: bool,
    },
    /// Export the full record set to a file.
    Export {
        /// Output path.
        output: PathBuf,
        /// Database file (overrides CPUDEX_DB).
        #[arg(long)]
        db: Option<PathBuf>,
        /// Output format.
        #[arg(long, value_enum, default_value_t)]
        format: ExportFormat,
    },
    /// Print aggregate statistics.
    Stats {
        /// Database file (overrides CPUDEX_DB).
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Excel,
}

// =============================================================================
// DISPATCH
// =============================================================================

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = Config::from_env();

    match cli.command {
        Command::Serve {
            port,
            db,
            static_dir,
        } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(db) = db {
                config.db_path = db;
            }
            if let Some(dir) = static_dir {
                config.static_dir = dir;
            }
            cmd_serve(&config).await
        }
        Command::Import {
            file,
            db,
            clear,
            overwrite,
        } => {
            let store = open_store(db.as_deref(), &config)?;
            let report = cmd_import(
                &store,
                &file,
                ImportOptions {
                    clear_existing: clear,
                    overwrite,
                },
            )?;
            print_report(&report);
            Ok(())
        }
        Command::Export { output, db, format } => {
            let store = open_store(db.as_deref(), &config)?;
            cmd_export(&store, &output, format)
        }
        Command::Stats { db } => {
            let store = open_store(db.as_deref(), &config)?;
            cmd_stats(&store)
        }
    }
}

fn open_store(db: Option<&Path>, config: &Config) -> Result<RedbStore, CliError> {
    let path = db.unwrap_or(&config.db_path);
    Ok(RedbStore::open(path)?)
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn cmd_serve(config: &Config) -> Result<(), CliError> {
    let store = Arc::new(RedbStore::open(&config.db_path)?);
    seed_if_empty(&store, config)?;

    if config.admin_password.is_none() {
        info!("CPUDEX_ADMIN_PASSWORD not set; mutating endpoints are disabled");
    }

    let state = AppState::from_config(Arc::clone(&store), config);
    api::serve(config, state).await?;
    Ok(())
}

/// Auto-import the seed CSV on first run against an empty store.
fn seed_if_empty(store: &RedbStore, config: &Config) -> Result<(), CliError> {
    if store.count()? > 0 || !config.seed_csv.exists() {
        return Ok(());
    }
    info!("store is empty, importing {}", config.seed_csv.display());
    let report = cmd_import(store, &config.seed_csv, ImportOptions::default())?;
    info!(
        "seed import: {} inserted, {} errors",
        report.inserted,
        report.errors.len()
    );
    Ok(())
}

pub fn cmd_import(
    store: &RedbStore,
    file: &Path,
    options: ImportOptions,
) -> Result<ImportReport, CliError> {
    let source = File::open(file).map_err(|err| {
        cpudex_core::Error::ImportSource(format!("{}: {err}", file.display()))
    })?;
    let report = Importer::new(store, options).run(source, config::max_launch_year())?;
    Ok(report)
}

pub fn cmd_export(
    store: &RedbStore,
    output: &Path,
    format: ExportFormat,
) -> Result<(), CliError> {
    let records = store.all()?;
    match format {
        ExportFormat::Csv => {
            let file = File::create(output)?;
            cpudex_core::export::write_csv(&records, file)?;
        }
        ExportFormat::Excel => {
            let bytes = cpudex_core::export::to_xlsx_bytes(&records)?;
            std::fs::write(output, bytes)?;
        }
    }
    println!("exported {} records to {}", records.len(), output.display());
    Ok(())
}

pub fn cmd_stats(store: &RedbStore) -> Result<(), CliError> {
    let stats = QueryService::new(store).stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn print_report(report: &ImportReport) {
    println!(
        "imported: {} inserted, {} updated, {} skipped",
        report.inserted, report.updated, report.skipped
    );
    for error in &report.errors {
        println!("  row {}: {}", error.row, error.reason);
    }
}
