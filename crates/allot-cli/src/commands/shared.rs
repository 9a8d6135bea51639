//! Config resolution and input parsing shared by all commands

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use allot_core::{
    BudgetSource, BudgetState, Category, Floors, JsonFileSource, OptimizerConfig, WeightMap,
};

/// Load the optimizer config and apply command-line overrides
pub fn load_config(
    path: Option<&Path>,
    scale: Option<i64>,
    time_budget_ms: Option<u64>,
    strict: bool,
) -> Result<OptimizerConfig> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            OptimizerConfig::load_from(path)
        }
        None => OptimizerConfig::load(),
    }
    .context("Failed to load optimizer config")?;

    if let Some(scale) = scale {
        if scale <= 0 {
            bail!("--scale must be positive, got {}", scale);
        }
        config = config.with_scale(scale);
    }
    if let Some(ms) = time_budget_ms {
        config = config.with_time_budget(Duration::from_millis(ms));
    }
    if strict {
        config = config.with_accept_feasible(false);
    }

    Ok(config)
}

/// Read and validate a budget snapshot file
pub fn read_state(path: &Path) -> Result<BudgetState> {
    JsonFileSource::new(path)
        .budget_state()
        .with_context(|| format!("Failed to load budget snapshot from {}", path.display()))
}

/// Parse `category=N`
pub fn parse_assignment(arg: &str) -> Result<(Category, i64)> {
    let Some((name, value)) = arg.split_once('=') else {
        bail!("Expected CATEGORY=N, got '{}'", arg);
    };
    let category: Category = name
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let value: i64 = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid amount in '{}'", arg))?;
    Ok((category, value))
}

/// Weights from an optional JSON file, then `--weight` overrides on top
pub fn read_weights(file: Option<&Path>, overrides: &[String]) -> Result<WeightMap> {
    let mut weights = match file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read weights file {}", path.display()))?;
            serde_json::from_str::<WeightMap>(&content)
                .with_context(|| format!("Invalid weights in {}", path.display()))?
        }
        None => WeightMap::new(),
    };

    for arg in overrides {
        let (category, weight) = parse_assignment(arg)?;
        weights.set(category, weight);
    }

    weights.validate()?;
    Ok(weights)
}

pub fn parse_floors(args: &[String]) -> Result<Floors> {
    let mut floors = Floors::new();
    for arg in args {
        let (category, minimum) = parse_assignment(arg)?;
        floors.set(category, minimum);
    }
    floors.validate()?;
    Ok(floors)
}
