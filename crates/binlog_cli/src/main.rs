//! binlog CLI
//!
//! Command-line tools for binlog files.
//!
//! # Commands
//!
//! - `inspect` - Display the header and size of a log file
//! - `write` - Write stdin or a file into a new log
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// binlog command-line tools.
#[derive(Parser)]
#[command(name = "binlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Write strategy selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Page-cache writes through a fixed-size cache
    Buffered,
    /// Direct writes into a pre-allocated memory map
    Mapped,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the header and size of a log file
    Inspect {
        /// Log file to inspect
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write stdin (or a file) into a new log
    Write {
        /// Log file to create
        file: PathBuf,

        /// Read from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write strategy
        #[arg(short, long, value_enum, default_value = "buffered")]
        strategy: Strategy,

        /// Capacity of a mapped log in bytes
        #[arg(long, default_value_t = binlog_stream::DEFAULT_MAPPED_CAPACITY)]
        capacity: u64,

        /// Cache size of a buffered log in bytes
        #[arg(long, default_value_t = binlog_stream::DEFAULT_CACHE_SIZE)]
        cache_size: usize,

        /// Bytes appended per commit
        #[arg(long, default_value = "65536")]
        chunk_size: usize,

        /// Skip the sync on each commit
        #[arg(long)]
        no_sync: bool,
    },

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
        Commands::Inspect { file, format } => {
            commands::inspect::run(&file, &format)?;
        }
        Commands::Write {
            file,
            input,
            strategy,
            capacity,
            cache_size,
            chunk_size,
            no_sync,
        } => {
            let config = binlog_core::Config::new()
                .cache_size(cache_size)
                .sync_on_commit(!no_sync);
            let config = match strategy {
                Strategy::Buffered => config.buffered(),
                Strategy::Mapped => config.mapped(capacity),
            };
            commands::write::run(&file, input.as_deref(), &config, chunk_size)?;
        }
        Commands::Version => {
            println!("binlog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("binlog core v{}", binlog_core::VERSION);
        }
    }

    Ok(())
}
