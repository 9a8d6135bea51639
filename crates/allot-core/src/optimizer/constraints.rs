//! Budget constraints
//!
//! Structural closures (needs leaves add up to total needs, needs + wants +
//! savings add up to income), the 50/30/20 policy bounds and caller floors.
//! All bounds are inclusive.

use crate::config::PolicyLimits;
use crate::models::{Category, Floors, OptimizeRequest};

use super::builder::AllocationModel;
use super::types::Failure;

/// Income must be positive before any variable is declared
pub fn check_income(income: i64) -> Result<(), Failure> {
    if income <= 0 {
        return Err(Failure::InvalidIncome { income });
    }
    Ok(())
}

/// Amounts, weight overrides and floors must be in range before anything
/// is built
pub fn check_request(request: &OptimizeRequest) -> Result<(), Failure> {
    request
        .validate()
        .map_err(|err| Failure::invalid_input(err.to_string()))
}

fn policy_share(share: Option<i64>, name: &str, income: i64) -> Result<i64, Failure> {
    share.ok_or_else(|| {
        Failure::invalid_input(format!("{} of income {} does not fit in an amount", name, income))
    })
}

/// Add closure, policy and floor constraints to a built model
pub fn apply(
    built: &mut AllocationModel,
    policy: &PolicyLimits,
    floors: &Floors,
) -> Result<(), Failure> {
    let income = built.income();
    let savings_floor = policy_share(policy.savings_floor(income), "savings floor", income)?;
    let needs_ceiling = policy_share(policy.needs_ceiling(income), "needs ceiling", income)?;
    let wants_ceiling = policy_share(policy.wants_ceiling(income), "wants ceiling", income)?;

    let needs_leaves = built
        .sum_expr(&Category::NEEDS_LEAVES)
        .term(built.vars[Category::TotalNeeds].units, -Category::TotalNeeds.step());
    built.model.add_eq("needs_closure", needs_leaves, 0);

    let total = built.sum_expr(&[
        Category::TotalNeeds,
        Category::TotalWants,
        Category::MonthlySavings,
    ]);
    built.model.add_eq("income_closure", total, income);

    let savings = built.allocation_expr(Category::MonthlySavings);
    built
        .model
        .add_ge("savings_floor", savings, savings_floor);

    let needs = built.allocation_expr(Category::TotalNeeds);
    built
        .model
        .add_le("needs_ceiling", needs, needs_ceiling);

    let wants = built.allocation_expr(Category::TotalWants);
    built
        .model
        .add_le("wants_ceiling", wants, wants_ceiling);

    for (category, minimum) in floors.iter() {
        let expr = built.allocation_expr(category);
        built
            .model
            .add_ge(format!("{}_floor", category), expr, minimum);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetState, CategoryMap};
    use crate::optimizer::accounting::Baseline;

    fn built(income: i64) -> AllocationModel {
        let state = BudgetState {
            income,
            ..Default::default()
        };
        AllocationModel::build(Baseline::from_state(&state).unwrap(), CategoryMap::from_fn(|_| 1))
            .unwrap()
    }

    fn find<'a>(
        built: &'a AllocationModel,
        label: &str,
    ) -> &'a crate::optimizer::model::LinearConstraint {
        built
            .model
            .linear_constraints()
            .iter()
            .find(|c| c.label == label)
            .unwrap()
    }

    #[test]
    fn test_check_income() {
        assert!(check_income(1).is_ok());
        assert_eq!(check_income(0), Err(Failure::InvalidIncome { income: 0 }));
        assert_eq!(check_income(-10), Err(Failure::InvalidIncome { income: -10 }));
    }

    #[test]
    fn test_policy_rhs_uses_integer_shares() {
        let mut model = built(4010);
        apply(&mut model, &PolicyLimits::default(), &Floors::new()).unwrap();

        assert_eq!(find(&model, "savings_floor").rhs, 802);
        assert_eq!(find(&model, "needs_ceiling").rhs, 2005);
        assert_eq!(find(&model, "wants_ceiling").rhs, 1203);
        assert_eq!(find(&model, "income_closure").rhs, 4010);
    }

    #[test]
    fn test_closures_are_written_over_units() {
        let mut model = built(4000);
        apply(&mut model, &PolicyLimits::default(), &Floors::new()).unwrap();

        let closure = find(&model, "needs_closure");
        assert_eq!(closure.terms.len(), 6);
        assert!(closure
            .terms
            .contains(&(model.vars[Category::Transport].units, 10)));
        assert!(closure
            .terms
            .contains(&(model.vars[Category::TotalNeeds].units, -50)));
    }

    #[test]
    fn test_unrepresentable_policy_share_is_invalid_input() {
        let mut model = built(4000);
        let policy = PolicyLimits {
            savings_floor_percent: i64::MAX,
            ..PolicyLimits::default()
        };
        let failure = apply(&mut model, &policy, &Floors::new()).unwrap_err();
        assert!(matches!(failure, Failure::InvalidInput { .. }));
        assert!(!failure.is_defect());
    }

    #[test]
    fn test_check_request() {
        let state = BudgetState {
            income: 4000,
            food: 300,
            ..Default::default()
        };
        assert!(check_request(&OptimizeRequest::new(state)).is_ok());

        let oversized = BudgetState {
            housing: i64::MAX / 2 + 1,
            ..state
        };
        assert!(matches!(
            check_request(&OptimizeRequest::new(oversized)),
            Err(Failure::InvalidInput { .. })
        ));

        let zero_weight = OptimizeRequest::new(state)
            .with_weights(crate::models::WeightMap::new().with(Category::Food, 0));
        assert!(check_request(&zero_weight).is_err());
    }

    #[test]
    fn test_floors_become_constraints() {
        let mut model = built(4000);
        let floors = Floors::new().with(Category::Housing, 1200);
        let before = model.model.linear_constraints().len();
        apply(&mut model, &PolicyLimits::default(), &floors).unwrap();

        assert_eq!(model.model.linear_constraints().len(), before + 6);
        assert_eq!(find(&model, "housing_floor").rhs, 1200);
    }
}
