//! heatmap-ingest: decode tar1090 heatmap archives and bulk-load them
//! into PostgreSQL.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use comfy_table::{Cell, Table};
use log::{error, info, warn};

mod batch;
mod db;
mod db_pg;

use batch::BatchStats;
use db_pg::{PgLoader, DEFAULT_CONNECTION_STRING};

#[derive(Parser)]
#[command(
    name = "heatmap-ingest",
    version,
    about = "Process tar1090 heatmap binary files into PostgreSQL"
)]
struct Cli {
    /// Directory containing heatmap binary files to process
    directory: PathBuf,

    /// Database connection string
    #[arg(
        short = 'c',
        long,
        env = "DATABASE_URL",
        default_value = DEFAULT_CONNECTION_STRING
    )]
    connection_string: String,

    /// Delete processed files after successful insertion
    #[arg(long)]
    cleanup_files: bool,

    /// Skip the finalization step (useful for batch processing)
    #[arg(long)]
    skip_finalize: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    info!("starting heatmap ingest");
    info!("processing directory: {}", cli.directory.display());

    let loader = match PgLoader::connect(&cli.connection_string).await {
        Ok(l) => l,
        Err(e) => {
            error!("database connection failed: {e}");
            process::exit(1);
        }
    };

    let stats = match batch::process_directory(&cli.directory, &loader, cli.cleanup_files).await {
        Ok(s) => s,
        Err(e) => {
            error!("processing failed: {e}");
            process::exit(1);
        }
    };

    print_summary(&stats);

    if stats.total_records == 0 {
        warn!("no records were processed");
        return;
    }

    if cli.skip_finalize {
        info!("skipping finalization step as requested");
        return;
    }

    match loader.finalize().await {
        Ok(rows) => info!("promoted {rows} rows into adsb"),
        Err(e) => {
            error!("finalization failed: {e}");
            process::exit(1);
        }
    }
    if let Err(e) = loader.drop_staging().await {
        error!("failed to drop staging table: {e}");
        process::exit(1);
    }

    info!("processing completed successfully");
}

fn print_summary(stats: &BatchStats) {
    if stats.files.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["File", "Frames", "Emitted", "Downsampled", "Seconds"]);

    for f in &stats.files {
        table.add_row(vec![
            Cell::new(f.path.display()),
            Cell::new(f.frames),
            Cell::new(f.records),
            Cell::new(f.downsampled),
            Cell::new(format!("{:.2}", f.elapsed_secs)),
        ]);
    }

    println!("{table}");
    println!();
    println!("Processed {} total records", stats.total_records);
}
