//! Allot CLI - Budget reallocation optimizer
//!
//! Usage:
//!   allot optimize --input budget.json     Recommend a 50/30/20-compliant budget
//!   allot weights --input budget.json      Show baseline and effective weights
//!   allot batch --input requests.json      Solve many requests concurrently
//!   allot config                           Show effective configuration

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Optimize {
            input,
            weights,
            weight,
            floor,
            scale,
            time_budget_ms,
            strict,
            json,
        } => {
            let config = commands::load_config(config_path, scale, time_budget_ms, strict)?;
            commands::cmd_optimize(&config, &input, weights.as_deref(), &weight, &floor, json)
        }
        Commands::Weights {
            input,
            weight,
            scale,
            json,
        } => {
            let config = commands::load_config(config_path, scale, None, false)?;
            commands::cmd_weights(&config, &input, &weight, json)
        }
        Commands::Batch { input, json } => {
            let config = commands::load_config(config_path, None, None, false)?;
            commands::cmd_batch(config, &input, json).await
        }
        Commands::Config { path } => commands::cmd_config(config_path, path),
    }
}
