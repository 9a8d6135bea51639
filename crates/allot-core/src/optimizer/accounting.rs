//! Aggregate accounting
//!
//! Expands a [`BudgetState`] into the current value of all nine categories.
//! The two aggregates are derived: total needs is the sum of the needs
//! leaves, total wants is whatever income is left after needs and savings
//! (negative when the snapshot overspends).

use serde::Serialize;

use crate::models::{BudgetState, Category, CategoryMap};

use super::types::Failure;

/// Current value of every category, aggregates included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Baseline {
    pub income: i64,
    pub current: CategoryMap<i64>,
}

impl Baseline {
    /// Fails when a derived aggregate does not fit in `i64`
    pub fn from_state(state: &BudgetState) -> Result<Self, Failure> {
        let total_needs = Category::NEEDS_LEAVES
            .iter()
            .filter_map(|c| state.leaf(*c))
            .try_fold(0i64, i64::checked_add)
            .ok_or_else(|| Failure::invalid_input("needs leaves overflow their total"))?;
        let total_wants = state
            .income
            .checked_sub(total_needs)
            .and_then(|rest| rest.checked_sub(state.monthly_savings))
            .ok_or_else(|| Failure::invalid_input("income minus needs and savings overflows"))?;

        let current = CategoryMap::from_fn(|category| match category {
            Category::TotalNeeds => total_needs,
            Category::TotalWants => total_wants,
            leaf => state.leaf(leaf).unwrap_or_default(),
        });

        Ok(Self {
            income: state.income,
            current,
        })
    }

    pub fn current(&self, category: Category) -> i64 {
        self.current[category]
    }
}
