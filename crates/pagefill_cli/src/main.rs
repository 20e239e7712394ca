//! PageFill CLI
//!
//! Terminal demo of the paging engine and tools for the record store file.
//!
//! # Commands
//!
//! - `scroll` - Scroll through the backfilled stream, printing items as they load
//! - `dump` - Print stored records
//! - `clear` - Delete every stored record
//! - `version` - Show version information

mod commands;

use clap::{Args, Parser, Subcommand};
use pagefill_core::PagingConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// PageFill paging demo and store tools.
#[derive(Parser)]
#[command(name = "pagefill")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the record store file (in-memory store if omitted)
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Paging configuration flags.
#[derive(Args)]
struct PagingArgs {
    /// Records per append or prepend page
    #[arg(long, default_value = "10")]
    page_size: usize,

    /// Records in the first load
    #[arg(long, default_value = "20")]
    initial_load_size: usize,

    /// Distance from the loaded edge that triggers a load
    #[arg(long, default_value = "5")]
    prefetch_distance: usize,

    /// Disable placeholders for unloaded records
    #[arg(long)]
    no_placeholders: bool,
}

impl PagingArgs {
    fn config(&self) -> PagingConfig {
        PagingConfig::new()
            .page_size(self.page_size)
            .initial_load_size(self.initial_load_size)
            .prefetch_distance(self.prefetch_distance)
            .enable_placeholders(!self.no_placeholders)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scroll through the backfilled stream
    Scroll {
        /// Number of records to scroll past
        #[arg(short = 'n', long, default_value = "100")]
        count: usize,

        /// Simulated fetch latency in milliseconds
        #[arg(short, long, default_value = "0")]
        latency_ms: u64,

        /// Stop the remote source at this key (exclusive)
        #[arg(long)]
        limit: Option<i64>,

        /// Keep records already in the store instead of clearing it first
        #[arg(short, long)]
        keep: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Print stored records
    Dump {
        /// First key to print
        #[arg(long, default_value = "0")]
        from: i64,

        /// Maximum number of records to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete every stored record
    Clear,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scroll {
            count,
            latency_ms,
            limit,
            keep,
            format,
            paging,
        } => {
            let options = commands::scroll::ScrollOptions {
                count,
                latency: std::time::Duration::from_millis(latency_ms),
                limit,
                keep,
                config: paging.config(),
            };
            commands::scroll::run(cli.path.as_deref(), &options, &format)?;
        }
        Commands::Dump {
            from,
            limit,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for dump")?;
            commands::dump::run(&path, from, limit, &format)?;
        }
        Commands::Clear => {
            let path = cli.path.ok_or("Store path required for clear")?;
            commands::clear::run(&path)?;
        }
        Commands::Version => {
            println!("PageFill CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("PageFill Core v{}", pagefill_core::VERSION);
        }
    }

    Ok(())
}
