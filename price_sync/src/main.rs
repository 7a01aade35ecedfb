//! Price Sync - price archive ingestion server and CLI
//!
//! Serves the upload/export HTTP API, or runs a single ingest or export
//! against the local database.

use clap::{Parser, Subcommand};
use price_sync::{open_store, ArchiveKind, FilterCriteria};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Price archive ingestion and export
#[derive(Parser, Debug)]
#[command(name = "price_sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(short, long, global = true, env = "PRICE_SYNC_DATABASE", default_value_t = default_db_path())]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PRICE_SYNC_PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Ingest a local archive file
    Ingest {
        /// Archive to load
        archive: PathBuf,

        /// Archive container type (zip or tar)
        #[arg(short = 't', long = "type", default_value = "zip")]
        kind: String,
    },
    /// Export matching records to a zip file
    Export {
        /// Output zip path
        output: PathBuf,

        /// Earliest creation date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Latest creation date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Lowest price
        #[arg(long)]
        min: Option<String>,

        /// Highest price
        #[arg(long)]
        max: Option<String>,
    },
}

/// Returns the default database path: ~/.local/share/price_sync/prices.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("price_sync")
        .join("prices.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> price_sync::Result<()> {
    let db_path = PathBuf::from(&cli.database);
    log::info!("Database path: {}", db_path.display());
    let mut conn = open_store(&db_path)?;

    match cli.command {
        Command::Serve { port } => {
            let db = Arc::new(Mutex::new(conn));
            price_sync::web::serve(db, port).await?;
        }
        Command::Ingest { archive, kind } => {
            let kind: ArchiveKind = kind.parse()?;
            let bytes = std::fs::read(&archive)?;
            log::info!("Ingesting {} ({})", archive.display(), kind);

            let outcome = price_sync::ingest(&mut conn, kind, &bytes)?;
            println!(
                "rows: {}, inserted: {}, duplicates: {}, malformed: {}",
                outcome.rows_read, outcome.inserted, outcome.duplicates, outcome.malformed
            );
            println!(
                "store: {} items, {} categories, total price {}",
                outcome.totals.total_items,
                outcome.totals.total_categories,
                outcome.totals.total_price
            );
        }
        Command::Export {
            output,
            start,
            end,
            min,
            max,
        } => {
            let criteria = FilterCriteria::parse(
                start.as_deref(),
                end.as_deref(),
                min.as_deref(),
                max.as_deref(),
            )?;
            let archive = price_sync::export(&conn, &criteria)?;
            std::fs::write(&output, &archive)?;
            log::info!("Wrote {}", output.display());
        }
    }

    Ok(())
}
