//! Result extraction and validation
//!
//! Turns a raw [`Solution`] into a [`Recommendation`] or a [`Failure`].
//! Every returned allocation is re-checked against the budget invariants;
//! the solver is not trusted to have honored them.

use std::time::Duration;

use tracing::error;

use crate::config::PolicyLimits;
use crate::models::{Category, CategoryMap, Floors};

use super::accounting::Baseline;
use super::builder::AllocationModel;
use super::solver::{Solution, SolveStatus};
use super::types::{CategoryChange, Failure, Recommendation, SolveQuality};

/// How solver outcomes are accepted
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions<'a> {
    pub policy: &'a PolicyLimits,
    pub floors: &'a Floors,
    pub accept_feasible: bool,
    pub time_budget: Duration,
}

pub fn extract(
    built: &AllocationModel,
    solution: &Solution,
    options: &ExtractOptions<'_>,
) -> Result<Recommendation, Failure> {
    let budget_ms = u64::try_from(options.time_budget.as_millis()).unwrap_or(u64::MAX);

    let quality = match solution.status {
        SolveStatus::Optimal => SolveQuality::Optimal,
        SolveStatus::Feasible if options.accept_feasible => SolveQuality::Feasible,
        SolveStatus::Feasible | SolveStatus::Timeout => {
            return Err(Failure::SolverTimeout { budget_ms })
        }
        SolveStatus::Infeasible => return Err(Failure::Infeasible),
        SolveStatus::ModelInvalid => {
            let detail = format!(
                "solver rejected model: {}",
                solution.detail.as_deref().unwrap_or("no detail")
            );
            error!(detail = %detail, "Malformed optimization model");
            return Err(Failure::violation(detail));
        }
    };

    let checked = check_assignment(built, solution)
        .and_then(|()| read_allocations(built, solution))
        .and_then(|allocations| {
            check_invariants(&allocations, &built.baseline, options.policy, options.floors)?;
            check_losses(built, solution, &allocations)?;
            Ok(allocations)
        });

    let allocations = match checked {
        Ok(allocations) => allocations,
        Err(detail) => {
            error!(detail = %detail, status = ?solution.status, "Solver returned an invalid allocation");
            return Err(Failure::violation(detail));
        }
    };

    let total_loss = weighted_loss(&allocations, &built.baseline, &built.weights);
    if let Some(objective) = solution.objective {
        if objective != total_loss {
            let detail = format!(
                "solver objective {} does not match recomputed loss {}",
                objective, total_loss
            );
            error!(detail = %detail, "Loss mismatch");
            return Err(Failure::violation(detail));
        }
    }

    let changes = Category::ALL
        .iter()
        .map(|c| CategoryChange::new(*c, built.baseline.current(*c), allocations[*c]))
        .collect();

    Ok(Recommendation {
        quality,
        allocations,
        weights: built.weights,
        total_loss,
        changes,
        stats: solution.stats,
    })
}

/// Every model bound and constraint must hold for the raw assignment
fn check_assignment(built: &AllocationModel, solution: &Solution) -> Result<(), String> {
    match built.model.first_violation(&solution.values) {
        Some(violation) => Err(format!("solver assignment violates {}", violation)),
        None => Ok(()),
    }
}

fn read_allocations(
    built: &AllocationModel,
    solution: &Solution,
) -> Result<CategoryMap<i64>, String> {
    let mut allocations = CategoryMap::default();
    for category in Category::ALL {
        allocations[category] = solution
            .value(built.vars[category].allocation)
            .ok_or_else(|| format!("no value for {}", category))?;
    }
    Ok(allocations)
}

/// Squared deviations must be non-negative and consistent with the allocations
fn check_losses(
    built: &AllocationModel,
    solution: &Solution,
    allocations: &CategoryMap<i64>,
) -> Result<(), String> {
    for category in Category::ALL {
        let loss = solution
            .value(built.vars[category].loss)
            .ok_or_else(|| format!("no loss value for {}", category))?;
        if loss < 0 {
            return Err(format!("{} has negative loss {}", category, loss));
        }
        let deviation = i128::from(allocations[category]) - i128::from(built.baseline.current(category));
        if i128::from(loss) != deviation * deviation {
            return Err(format!(
                "{} loss {} is not the squared deviation {}",
                category, loss, deviation
            ));
        }
    }
    Ok(())
}

/// Step alignment, range, closures, policy bounds and floors
pub fn check_invariants(
    allocations: &CategoryMap<i64>,
    baseline: &Baseline,
    policy: &PolicyLimits,
    floors: &Floors,
) -> Result<(), String> {
    let income = baseline.income;
    let share = |limit: Option<i64>, name: &str| {
        limit.ok_or_else(|| format!("{} of income {} is not representable", name, income))
    };
    let savings_floor = share(policy.savings_floor(income), "savings floor")?;
    let needs_ceiling = share(policy.needs_ceiling(income), "needs ceiling")?;
    let wants_ceiling = share(policy.wants_ceiling(income), "wants ceiling")?;

    for (category, value) in allocations.iter() {
        if *value < category.lower_bound() {
            return Err(format!("{} is negative: {}", category, value));
        }
        if *value > income {
            return Err(format!("{} = {} exceeds income {}", category, value, income));
        }
        if value % category.step() != 0 {
            return Err(format!(
                "{} = {} is not a multiple of {}",
                category,
                value,
                category.step()
            ));
        }
    }

    let leaves: i128 = Category::NEEDS_LEAVES
        .iter()
        .map(|c| i128::from(allocations[*c]))
        .sum();
    if leaves != i128::from(allocations[Category::TotalNeeds]) {
        return Err(format!(
            "needs leaves sum to {} but total needs is {}",
            leaves,
            allocations[Category::TotalNeeds]
        ));
    }

    let total: i128 = [
        Category::TotalNeeds,
        Category::TotalWants,
        Category::MonthlySavings,
    ]
    .iter()
    .map(|c| i128::from(allocations[*c]))
    .sum();
    if total != i128::from(income) {
        return Err(format!("needs + wants + savings = {} but income is {}", total, income));
    }

    if allocations[Category::MonthlySavings] < savings_floor {
        return Err(format!(
            "savings {} below floor {}",
            allocations[Category::MonthlySavings],
            savings_floor
        ));
    }
    if allocations[Category::TotalNeeds] > needs_ceiling {
        return Err(format!(
            "needs {} above ceiling {}",
            allocations[Category::TotalNeeds],
            needs_ceiling
        ));
    }
    if allocations[Category::TotalWants] > wants_ceiling {
        return Err(format!(
            "wants {} above ceiling {}",
            allocations[Category::TotalWants],
            wants_ceiling
        ));
    }

    if let Some((category, minimum)) = floors.iter().find(|(c, m)| allocations[*c] < *m) {
        return Err(format!(
            "{} = {} below requested floor {}",
            category, allocations[category], minimum
        ));
    }

    Ok(())
}

/// `sum(weight * (allocation - current)^2)`
pub fn weighted_loss(
    allocations: &CategoryMap<i64>,
    baseline: &Baseline,
    weights: &CategoryMap<i64>,
) -> i128 {
    Category::ALL
        .iter()
        .map(|c| {
            let deviation = i128::from(allocations[*c]) - i128::from(baseline.current(*c));
            i128::from(weights[*c]) * deviation * deviation
        })
        .sum()
}
