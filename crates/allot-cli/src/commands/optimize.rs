//! Optimize command and result rendering

use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;

use allot_core::{
    BudgetOptimizer, Category, Failure, OptimizeRequest, OptimizerConfig, Recommendation,
    SolveQuality,
};

use super::{parse_floors, read_state, read_weights};

/// What a single request produced, as printed with `--json`
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<'a> {
    Solved {
        recommendation: &'a Recommendation,
    },
    Failed {
        failure: &'a Failure,
    },
}

impl<'a> From<&'a Result<Recommendation, Failure>> for Outcome<'a> {
    fn from(result: &'a Result<Recommendation, Failure>) -> Self {
        match result {
            Ok(recommendation) => Outcome::Solved { recommendation },
            Err(failure) => Outcome::Failed { failure },
        }
    }
}

pub fn cmd_optimize(
    config: &OptimizerConfig,
    input: &Path,
    weights_file: Option<&Path>,
    weight_overrides: &[String],
    floors: &[String],
    json: bool,
) -> Result<()> {
    let state = read_state(input)?;
    let request = OptimizeRequest::new(state)
        .with_weights(read_weights(weights_file, weight_overrides)?)
        .with_floors(parse_floors(floors)?);

    let optimizer = BudgetOptimizer::new(config.clone());
    let result = optimizer.optimize(&request);

    if json {
        println!("{}", serde_json::to_string_pretty(&Outcome::from(&result))?);
    } else {
        match &result {
            Ok(rec) => print_recommendation(rec),
            Err(failure) => print_failure(failure),
        }
    }

    fail_on_defect(&result)
}

/// Business failures are output; only defects fail the command
pub fn fail_on_defect(result: &Result<Recommendation, Failure>) -> Result<()> {
    match result {
        Err(failure) if failure.is_defect() => bail!("Optimizer defect: {}", failure),
        _ => Ok(()),
    }
}

pub fn print_recommendation(rec: &Recommendation) {
    println!();
    match rec.quality {
        SolveQuality::Optimal => println!("✅ Optimal reallocation found"),
        SolveQuality::Feasible => {
            println!("⚠️  Time budget reached; best reallocation found (not proven optimal)")
        }
    }
    println!();
    println!(
        "   {:<18} {:>10} {:>12} {:>10} {:>9}",
        "Category", "Current", "Recommended", "Change", "Percent"
    );
    println!("   {}", "─".repeat(63));

    for change in &rec.changes {
        if change.category == Category::TotalNeeds {
            println!("   {}", "─".repeat(63));
        }
        let percent = change
            .percent
            .map(|p| format!("{:+.1}%", p))
            .unwrap_or_else(|| "-".to_string());
        let marker = if change.is_unchanged() { " " } else { "*" };
        println!(
            "  {}{:<18} {:>10} {:>12} {:>+10} {:>9}",
            marker,
            change.category.label(),
            change.current,
            change.recommended,
            change.difference,
            percent
        );
    }

    println!();
    println!("   Weighted loss: {}", rec.total_loss);
    println!(
        "   Search: {} rounds, {} cuts, {} ms",
        rec.stats.rounds, rec.stats.cuts, rec.stats.elapsed_ms
    );
    println!();
}

pub fn print_failure(failure: &Failure) {
    println!();
    match failure {
        Failure::InvalidIncome { income } => {
            println!("❌ Income must be positive (got {})", income);
        }
        Failure::InvalidInput { detail } => {
            println!("❌ Invalid budget input: {}", detail);
        }
        Failure::Infeasible => {
            println!("❌ No allocation satisfies the budget rules");
            println!("   Income must split into 50-unit steps within the 50/30/20 limits,");
            println!("   and every requested floor must fit.");
        }
        Failure::SolverTimeout { budget_ms } => {
            println!("⏱️  No acceptable allocation within {} ms", budget_ms);
            println!("   Try a larger --time-budget-ms, or drop --strict.");
        }
        Failure::InternalInvariantViolation { detail } => {
            println!("💥 Internal error: {}", detail);
        }
    }
    println!();
}
