//! Weights command: baseline and effective per-category weights

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use allot_core::{Baseline, Category, OptimizerConfig, WeightPolicy};

use super::{read_state, read_weights};

#[derive(Serialize)]
struct WeightRow {
    category: Category,
    current: i64,
    weight: i64,
    overridden: bool,
}

pub fn cmd_weights(
    config: &OptimizerConfig,
    input: &Path,
    weight_overrides: &[String],
    json: bool,
) -> Result<()> {
    let state = read_state(input)?;
    let overrides = read_weights(None, weight_overrides)?;
    let baseline = Baseline::from_state(&state)?;
    let weights = WeightPolicy::new(config.scale).derive(&baseline, &overrides);

    let rows: Vec<WeightRow> = Category::ALL
        .iter()
        .map(|c| WeightRow {
            category: *c,
            current: baseline.current(*c),
            weight: weights[*c],
            overridden: overrides.get(*c).is_some(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!();
    println!("⚖️  Deviation weights (income {}, scale {})", baseline.income, config.scale);
    println!();
    println!("   {:<18} {:>10} {:>8}", "Category", "Current", "Weight");
    println!("   {}", "─".repeat(38));
    for row in &rows {
        println!(
            "   {:<18} {:>10} {:>8}{}",
            row.category.label(),
            row.current,
            row.weight,
            if row.overridden { "  (override)" } else { "" }
        );
    }
    println!();

    Ok(())
}
