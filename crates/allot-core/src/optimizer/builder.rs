//! Model builder
//!
//! Declares, for every category, a unit count, the allocation it implies,
//! the deviation from the current value and the squared deviation, then sets
//! the objective to the weighted sum of squared deviations.

use crate::models::{Category, CategoryMap};

use super::accounting::Baseline;
use super::model::{LinearExpr, Model, VarId};
use super::types::Failure;

/// Variables declared for one category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryVars {
    /// Allocation divided by the category step
    pub units: VarId,
    pub allocation: VarId,
    /// `allocation - current`
    pub deviation: VarId,
    /// `deviation * deviation`
    pub loss: VarId,
}

/// The integer program for one request, with handles to its variables
#[derive(Debug, Clone)]
pub struct AllocationModel {
    pub model: Model,
    pub vars: CategoryMap<CategoryVars>,
    pub baseline: Baseline,
    pub weights: CategoryMap<i64>,
}

impl AllocationModel {
    /// Build variables and objective. Constraints are added separately.
    pub fn build(baseline: Baseline, weights: CategoryMap<i64>) -> Result<Self, Failure> {
        let income = baseline.income;
        if income <= 0 {
            return Err(Failure::InvalidIncome { income });
        }

        let mut model = Model::new();
        let max_loss = income.saturating_mul(income);

        let vars = CategoryMap::from_fn(|category| {
            let step = category.step();
            let current = baseline.current(category);
            let max_units = income / step;

            let hint = nearest_units(current, step).clamp(0, max_units);
            let units = model.new_int_var(0, max_units, format!("{}_units", category));
            model.set_hint(units, hint);
            model.mark_decision(units);

            let allocation =
                model.new_int_var(category.lower_bound(), income, category.as_str());
            model.add_eq(
                format!("{}_step", category),
                LinearExpr::from(allocation).term(units, -step),
                0,
            );

            let deviation = model.new_int_var(-income, income, format!("{}_deviation", category));
            model.set_hint(deviation, step * hint - current);
            model.add_eq(
                format!("{}_deviation", category),
                LinearExpr::from(deviation).term(allocation, -1),
                -current,
            );

            let loss = model.new_int_var(0, max_loss, format!("{}_loss", category));
            model.add_multiplication_eq(format!("{}_loss", category), loss, deviation, deviation);

            CategoryVars {
                units,
                allocation,
                deviation,
                loss,
            }
        });

        let objective = Category::ALL
            .iter()
            .fold(LinearExpr::new(), |expr, category| {
                expr.term(vars[*category].loss, weights[*category])
            });
        model.minimize(objective);

        Ok(Self {
            model,
            vars,
            baseline,
            weights,
        })
    }

    pub fn income(&self) -> i64 {
        self.baseline.income
    }

    /// `step * units` for a category. Equal to its allocation; constraints
    /// are written over this form so they involve only integer variables
    /// and the solver's divisibility check applies to them.
    pub fn allocation_expr(&self, category: Category) -> LinearExpr {
        LinearExpr::new().term(self.vars[category].units, category.step())
    }

    /// Sum of `allocation_expr` over several categories
    pub fn sum_expr(&self, categories: &[Category]) -> LinearExpr {
        categories.iter().fold(LinearExpr::new(), |mut expr, category| {
            expr.add_term(self.vars[*category].units, category.step());
            expr
        })
    }
}

/// `value / step` rounded to the nearest integer, ties up
fn nearest_units(value: i64, step: i64) -> i64 {
    value.saturating_add(step / 2).div_euclid(step)
}
