use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod jsonl;

#[derive(Debug, Parser)]
#[command(name = "dealgrid")]
#[command(about = "Discover discounted listings and extract their details")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the results feed's department filter options as JSON Lines.
    Departments {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Crawl the filtered results feed and write one item stub per line.
    Discover {
        /// Department filter value (see `departments`).
        #[arg(long)]
        department: String,
        /// Category label stamped on every stub.
        #[arg(long)]
        category: String,
        #[arg(long, default_value_t = 0)]
        min_price: u32,
        #[arg(long, default_value_t = 100_000)]
        max_price: u32,
        #[arg(long, default_value_t = 0)]
        min_off: u32,
        #[arg(long, default_value_t = 100)]
        max_off: u32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Visit item pages from a stub or record file and write filled records.
    Details {
        /// JSON Lines file of stubs or records.
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Overrides `DEALGRID_WORKERS`.
        #[arg(long)]
        workers: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = dealgrid_core::load_app_config()?;
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Departments { output } => {
            commands::run_departments(&config, output.as_deref()).await
        }
        Commands::Discover {
            department,
            category,
            min_price,
            max_price,
            min_off,
            max_off,
            output,
        } => {
            let filters = dealgrid_scraper::FeedFilters {
                department,
                min_price,
                max_price,
                min_percent_off: min_off,
                max_percent_off: max_off,
            };
            commands::run_discover(&config, &filters, &category, output.as_deref()).await
        }
        Commands::Details {
            input,
            output,
            workers,
        } => commands::run_details(&config, &input, output.as_deref(), workers).await,
    }
}
