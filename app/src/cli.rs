//! Command line interface for perpgap
//!
//! Provides subcommands for:
//! - `run`: one fetch -> compare -> store cycle
//! - `watch`: repeat cycles on an interval
//! - `view`: read-only reports over the stored data
//! - `prune`: delete old rows
//! - `serve`: read-only JSON HTTP view

use clap::{Parser, Subcommand};
use common::models::Exchange;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "perpgap")]
#[command(about = "Compare perpetual prices between Hyperliquid and Lighter")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// SQLite database path (overrides PRICE_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one fetch cycle and print the largest differences
    Run {
        /// Number of comparisons to print
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Run fetch cycles until interrupted
    Watch {
        /// Seconds between cycles (overrides WATCH_INTERVAL_SECS)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
        /// Number of comparisons to print after each cycle
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Show stored data
    #[command(subcommand)]
    View(ViewCommand),
    /// Delete samples and comparisons older than N days
    Prune {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Serve stored data as JSON over HTTP
    Serve {
        /// Bind address (overrides API_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides API_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ViewCommand {
    /// Latest price per symbol and exchange
    Prices {
        #[arg(long)]
        exchange: Option<Exchange>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Largest price differences
    Top {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Rank across all stored cycles instead of the latest one
        #[arg(long)]
        all: bool,
    },
    /// Pair counts per exchange
    Stats,
    /// Symbols listed on more than one exchange
    Common,
}
