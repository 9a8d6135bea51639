//! Batch command: solve many requests concurrently
//!
//! Each request runs on its own blocking worker; results are reported in
//! input order.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use allot_core::{BudgetOptimizer, Category, Failure, OptimizeRequest, OptimizerConfig, Recommendation};

use super::{print_failure, print_recommendation, Outcome};

#[derive(Serialize)]
struct BatchEntry<'a> {
    index: usize,
    #[serde(flatten)]
    outcome: Outcome<'a>,
}

/// Read and validate a JSON array of requests
pub fn read_requests(path: &Path) -> Result<Vec<OptimizeRequest>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file {}", path.display()))?;
    let requests: Vec<OptimizeRequest> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid batch file {}", path.display()))?;

    for (index, request) in requests.iter().enumerate() {
        request
            .validate()
            .with_context(|| format!("Request #{} is invalid", index))?;
    }
    Ok(requests)
}

/// Optimize every request on the blocking pool, preserving input order
pub async fn run_batch(
    config: OptimizerConfig,
    requests: Vec<OptimizeRequest>,
) -> Result<Vec<Result<Recommendation, Failure>>> {
    let optimizer = Arc::new(BudgetOptimizer::new(config));

    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let optimizer = Arc::clone(&optimizer);
            tokio::task::spawn_blocking(move || optimizer.optimize(&request))
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.context("Optimization worker panicked")?);
    }
    Ok(results)
}

pub async fn cmd_batch(config: OptimizerConfig, input: &Path, json: bool) -> Result<()> {
    let requests = read_requests(input)?;
    info!(count = requests.len(), "Starting batch optimization");

    let results = run_batch(config, requests).await?;

    if json {
        let entries: Vec<BatchEntry> = results
            .iter()
            .enumerate()
            .map(|(index, result)| BatchEntry {
                index,
                outcome: Outcome::from(result),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for (index, result) in results.iter().enumerate() {
            println!("📋 Request #{}", index);
            match result {
                Ok(rec) => print_recommendation(rec),
                Err(failure) => print_failure(failure),
            }
        }

        let solved = results.iter().filter(|r| r.is_ok()).count();
        println!("   {} of {} requests solved", solved, results.len());
        for (index, result) in results.iter().enumerate() {
            if let Ok(rec) = result {
                println!(
                    "   #{}: wants {} / savings {} / needs {}",
                    index,
                    rec.allocation(Category::TotalWants),
                    rec.allocation(Category::MonthlySavings),
                    rec.allocation(Category::TotalNeeds)
                );
            }
        }
        println!();
    }

    let defects: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.as_ref().is_err_and(Failure::is_defect))
        .map(|(index, _)| index)
        .collect();
    if !defects.is_empty() {
        warn!(?defects, "Batch produced optimizer defects");
        bail!("Optimizer defect in request(s) {:?}", defects);
    }

    Ok(())
}
