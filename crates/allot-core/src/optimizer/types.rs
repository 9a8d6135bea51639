//! Optimizer result and failure types

use serde::Serialize;
use thiserror::Error;

use crate::models::{Category, CategoryMap};

use super::solver::SearchStats;

/// Why an optimization request produced no recommendation
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Failure {
    #[error("income must be positive, got {income}")]
    InvalidIncome { income: i64 },

    #[error("invalid input: {detail}")]
    InvalidInput { detail: String },

    #[error("no allocation satisfies the budget constraints")]
    Infeasible,

    #[error("no acceptable allocation found within {budget_ms} ms")]
    SolverTimeout { budget_ms: u64 },

    #[error("internal invariant violated: {detail}")]
    InternalInvariantViolation { detail: String },
}

impl Failure {
    /// True for failures that indicate a bug rather than a property of the input
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::InternalInvariantViolation { .. })
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidIncome { .. } => "invalid_income",
            Self::InvalidInput { .. } => "invalid_input",
            Self::Infeasible => "infeasible",
            Self::SolverTimeout { .. } => "solver_timeout",
            Self::InternalInvariantViolation { .. } => "internal_invariant_violation",
        }
    }

    pub(crate) fn invalid_input(detail: impl Into<String>) -> Self {
        Self::InvalidInput {
            detail: detail.into(),
        }
    }

    pub(crate) fn violation(detail: impl Into<String>) -> Self {
        Self::InternalInvariantViolation {
            detail: detail.into(),
        }
    }
}

/// Whether the returned allocation is proven optimal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveQuality {
    Optimal,
    /// Best allocation found before the time budget ran out
    Feasible,
}

/// Current vs. recommended value for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryChange {
    pub category: Category,
    pub current: i64,
    pub recommended: i64,
    pub difference: i64,
    /// Relative change in percent; `None` when the current value is not positive
    pub percent: Option<f64>,
}

impl CategoryChange {
    pub fn new(category: Category, current: i64, recommended: i64) -> Self {
        let difference = recommended - current;
        let percent = (current > 0).then(|| difference as f64 / current as f64 * 100.0);
        Self {
            category,
            current,
            recommended,
            difference,
            percent,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.difference == 0
    }
}

/// A successful optimization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub quality: SolveQuality,
    pub allocations: CategoryMap<i64>,
    /// Weights the loss was computed with
    pub weights: CategoryMap<i64>,
    /// `sum(weight * (allocation - current)^2)` over all nine categories
    pub total_loss: i128,
    pub changes: Vec<CategoryChange>,
    pub stats: SearchStats,
}

impl Recommendation {
    pub fn is_optimal(&self) -> bool {
        self.quality == SolveQuality::Optimal
    }

    pub fn allocation(&self, category: Category) -> i64 {
        self.allocations[category]
    }

    pub fn change(&self, category: Category) -> Option<&CategoryChange> {
        self.changes.iter().find(|c| c.category == category)
    }
}
