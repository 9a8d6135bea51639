//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Allot - Rebalance a monthly budget toward 50/30/20
#[derive(Parser)]
#[command(name = "allot")]
#[command(about = "Budget reallocation optimizer", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Optimizer config file (defaults to the user config, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend a reallocation for a budget snapshot
    Optimize {
        /// Budget snapshot JSON (income plus current leaf amounts)
        #[arg(short, long)]
        input: PathBuf,

        /// JSON object of category weights
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Weight override, e.g. `--weight food=25` (repeatable)
        #[arg(long = "weight", value_name = "CATEGORY=N")]
        weight: Vec<String>,

        /// Minimum allocation, e.g. `--floor housing=1200` (repeatable)
        #[arg(long = "floor", value_name = "CATEGORY=N")]
        floor: Vec<String>,

        /// Scale of the default weight formula
        #[arg(long)]
        scale: Option<i64>,

        /// Solver time budget in milliseconds
        #[arg(long)]
        time_budget_ms: Option<u64>,

        /// Only accept proven-optimal results
        #[arg(long)]
        strict: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the baseline and the weights an optimization would use
    Weights {
        /// Budget snapshot JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Weight override, e.g. `--weight food=25` (repeatable)
        #[arg(long = "weight", value_name = "CATEGORY=N")]
        weight: Vec<String>,

        /// Scale of the default weight formula
        #[arg(long)]
        scale: Option<i64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Solve a JSON array of optimization requests concurrently
    Batch {
        /// Request file: `[{"state": {...}, "weights": {...}, "floors": {...}}, ...]`
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective optimizer configuration
    Config {
        /// Only print the config file location
        #[arg(long)]
        path: bool,
    },
}
