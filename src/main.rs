use clap::{Parser, Subcommand};
use postcode_enricher::config::Config;
use postcode_enricher::report::RunSummary;
use postcode_enricher::{logging, pipeline};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "postcode_enricher")]
#[command(about = "Enriches latitude/longitude pairs with the nearest UK postcode")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full enrichment pipeline
    Run {
        /// Input CSV with lat/lon columns
        #[arg(long)]
        input: Option<PathBuf>,
        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,
        /// Directory for the report artifacts
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Cap on how many coordinates are enriched
        #[arg(long)]
        max_coords: Option<usize>,
        /// Bound on concurrent lookups
        #[arg(long)]
        workers: Option<usize>,
        /// Per-lookup timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Base URL of the lookup service
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Regenerate report artifacts from the database, without lookups
    Report {
        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,
        /// Directory for the report artifacts
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 Enrichment results:");
    println!("   Processed: {}", summary.processed);
    println!("   With postcode: {}", summary.with_postcode);
    println!("   Without postcode: {}", summary.without_postcode);
    println!("   Dropped in validation: {}", summary.validation_dropped);
    println!("   Coverage: {:.2}%", summary.coverage_pct());
    if !summary.top_postcodes.is_empty() {
        println!("   Top postcodes:");
        for (postcode, count) in &summary.top_postcodes {
            println!("     {} ({})", postcode, count);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input,
            db,
            output_dir,
            max_coords,
            workers,
            timeout_secs,
            base_url,
        } => {
            if let Some(input) = input {
                config.source.input_path = input;
            }
            if let Some(db) = db {
                config.storage.db_path = db;
            }
            if let Some(output_dir) = output_dir {
                config.output.dir = output_dir;
            }
            if let Some(max_coords) = max_coords {
                config.enrichment.max_coords = max_coords;
            }
            if let Some(workers) = workers {
                config.enrichment.max_workers = workers;
            }
            if let Some(timeout_secs) = timeout_secs {
                config.enrichment.timeout_secs = timeout_secs;
            }
            if let Some(base_url) = base_url {
                config.enrichment.base_url = base_url;
            }

            println!("🔄 Running enrichment pipeline...");
            match pipeline::run(&config).await {
                Ok(summary) => print_summary(&summary),
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Report { db, output_dir } => {
            if let Some(db) = db {
                config.storage.db_path = db;
            }
            if let Some(output_dir) = output_dir {
                config.output.dir = output_dir;
            }

            println!("📝 Regenerating report from database...");
            match pipeline::regenerate_report(&config) {
                Ok(summary) => {
                    println!(
                        "✅ Report written: {} rows, coverage {:.2}%",
                        summary.processed,
                        summary.coverage_pct()
                    );
                }
                Err(e) => {
                    error!("Report generation failed: {}", e);
                    println!("❌ Report generation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
