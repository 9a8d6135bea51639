//! Solver engine
//!
//! [`Solver`] is the seam between model construction and search. The
//! default [`MilpSolver`] hands the model to `good_lp` with the pure-Rust
//! `microlp` backend. Decision variables become integer variables; every
//! other variable is continuous and takes integer values through the
//! model's equalities.
//!
//! Squares (`target == x * x`) are replaced by secant cuts. For an integer
//! `k`, the line through `(k, k^2)` and `(k + 1, (k + 1)^2)` gives
//! `target >= (2k + 1) * x - k * (k + 1)`, which is exact at both points and
//! below `x^2` at every other integer. Each round solves the relaxation and
//! adds the secants at the solved `x` that are still missing. A round that
//! adds nothing has an exact objective, so its assignment is optimal.
//!
//! The deadline is checked between rounds; a running relaxation is not
//! interrupted.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use good_lp::{
    constraint, microlp, variable, Expression, IntoAffineExpression, ProblemVariables,
    ResolutionError, Solution as _, SolverModel, Variable,
};
use serde::Serialize;
use tracing::debug;

use super::model::{IntVar, Model, Relation, VarId};

/// Outcome category of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Search completed; the solution is proven optimal
    Optimal,
    /// Deadline reached with a solution that may not be optimal
    Feasible,
    /// Search completed without finding any solution
    Infeasible,
    /// Deadline reached before any solution was found
    Timeout,
    /// The model is structurally broken
    ModelInvalid,
}

/// Search counters, reported alongside the result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Relaxations solved
    pub rounds: u64,
    /// Secant cuts added after the initial set
    pub cuts: u64,
    /// Improving solutions found
    pub solutions: u64,
    pub elapsed_ms: u64,
}

/// Raw solver output: one value per model variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub status: SolveStatus,
    pub values: Vec<i64>,
    pub objective: Option<i128>,
    pub stats: SearchStats,
    /// Reason for `ModelInvalid`
    pub detail: Option<String>,
}

impl Solution {
    pub fn without_values(status: SolveStatus, stats: SearchStats) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: None,
            stats,
            detail: None,
        }
    }

    fn invalid(detail: String, stats: SearchStats) -> Self {
        Self {
            detail: Some(detail),
            ..Self::without_values(SolveStatus::ModelInvalid, stats)
        }
    }

    pub fn value(&self, var: VarId) -> Option<i64> {
        self.values.get(var.index()).copied()
    }
}

/// Integer program solver.
///
/// Implementations must be stateless across calls (`Send + Sync`) so one
/// optimizer can serve concurrent requests.
pub trait Solver: Send + Sync {
    /// Solver name for logging
    fn name(&self) -> &'static str;

    /// Minimize the model's objective within the time budget
    fn solve(&self, model: &Model, budget: Duration) -> Solution;
}

/// Mixed-integer solver on `good_lp`/`microlp` with secant cuts for squares
#[derive(Debug, Clone, Copy, Default)]
pub struct MilpSolver;

impl MilpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for MilpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, model: &Model, budget: Duration) -> Solution {
        let started = Instant::now();
        // An unrepresentable deadline is no deadline at all
        let deadline = started.checked_add(budget);
        let mut stats = SearchStats::default();

        let squares = match model.validate().and_then(|()| squares(model)) {
            Ok(squares) => squares,
            Err(detail) => return Solution::invalid(detail, stats),
        };

        if let Some(label) = divisibility_conflict(model) {
            debug!(constraint = label, "Equality has no integer solution");
            return Solution::without_values(SolveStatus::Infeasible, stats);
        }

        let mut anchors: Vec<BTreeSet<i64>> = squares
            .iter()
            .map(|square| seed_anchors(model.var(square.factor)))
            .collect();
        let mut best: Option<(i128, Vec<i64>)> = None;

        let finish = |status: SolveStatus, stats: &mut SearchStats| {
            stats.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            debug!(
                ?status,
                rounds = stats.rounds,
                cuts = stats.cuts,
                elapsed_ms = stats.elapsed_ms,
                "Search finished"
            );
        };

        loop {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                let status = if best.is_some() {
                    SolveStatus::Feasible
                } else {
                    SolveStatus::Timeout
                };
                finish(status, &mut stats);
                return match best {
                    Some((objective, values)) => Solution {
                        status,
                        values,
                        objective: Some(objective),
                        stats,
                        detail: None,
                    },
                    None => Solution::without_values(status, stats),
                };
            }

            stats.rounds += 1;
            let values = match relax(model, &squares, &anchors) {
                Ok(values) => values,
                // Secants never cut off an integer point, so an infeasible
                // relaxation means an infeasible model
                Err(ResolutionError::Infeasible) => {
                    finish(SolveStatus::Infeasible, &mut stats);
                    return Solution::without_values(SolveStatus::Infeasible, stats);
                }
                Err(err) => {
                    finish(SolveStatus::ModelInvalid, &mut stats);
                    return Solution::invalid(format!("relaxation failed: {}", err), stats);
                }
            };

            let objective = model.objective_value(&values);
            if best.as_ref().map_or(true, |(incumbent, _)| objective < *incumbent) {
                stats.solutions += 1;
                best = Some((objective, values.clone()));
            }

            let mut added = 0;
            for (square, anchors) in squares.iter().zip(anchors.iter_mut()) {
                if square.weight == 0 {
                    continue;
                }
                let x = values[square.factor.index()];
                for k in [Some(x), x.checked_sub(1)].into_iter().flatten() {
                    if anchors.insert(k) {
                        added += 1;
                    }
                }
            }
            debug!(
                round = stats.rounds,
                objective = %objective,
                added,
                "Relaxation solved"
            );

            if added == 0 {
                finish(SolveStatus::Optimal, &mut stats);
                return Solution {
                    status: SolveStatus::Optimal,
                    values,
                    objective: Some(objective),
                    stats,
                    detail: None,
                };
            }
            stats.cuts += added;
        }
    }
}

/// A product constraint `target == factor * factor`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Square {
    target: VarId,
    factor: VarId,
    /// Objective coefficient of the target
    weight: i64,
}

/// Collect the squares; any other product, a constrained target or a
/// negative weight cannot be relaxed with secants
fn squares(model: &Model) -> Result<Vec<Square>, String> {
    model
        .product_constraints()
        .iter()
        .map(|p| {
            if p.left != p.right {
                return Err(format!("{}: only squares are supported", p.label));
            }
            if model
                .linear_constraints()
                .iter()
                .any(|c| c.terms.iter().any(|(v, _)| *v == p.target))
            {
                return Err(format!("{}: square target appears in a linear constraint", p.label));
            }
            let weight = model
                .objective()
                .terms
                .iter()
                .filter(|(v, _)| *v == p.target)
                .map(|(_, c)| *c)
                .sum::<i64>();
            if weight < 0 {
                return Err(format!("{}: square has a negative objective weight", p.label));
            }
            Ok(Square {
                target: p.target,
                factor: p.left,
                weight,
            })
        })
        .collect()
}

/// Label of an equality over integer variables whose coefficients share a
/// divisor that does not divide the right-hand side
fn divisibility_conflict(model: &Model) -> Option<&str> {
    model
        .linear_constraints()
        .iter()
        .filter(|c| c.relation == Relation::Eq)
        .filter(|c| c.terms.iter().all(|(v, _)| model.var(*v).decision))
        .find(|c| {
            let divisor = c
                .terms
                .iter()
                .fold(0, |g, (_, coef)| gcd(g, i128::from(*coef).abs()));
            match divisor {
                0 => c.rhs != 0,
                d => c.rhs % d != 0,
            }
        })
        .map(|c| c.label.as_str())
}

fn gcd(a: i128, b: i128) -> i128 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Secant anchors before the first round: around zero, at powers of two
/// out to the factor's bounds on both sides, and at the hint
fn seed_anchors(factor: &IntVar) -> BTreeSet<i64> {
    let mut anchors = BTreeSet::from([-1, 0]);
    let reach = factor.lo.unsigned_abs().max(factor.hi.unsigned_abs());
    for shift in 0..62 {
        let point = 1i64 << shift;
        if point.unsigned_abs() > reach {
            break;
        }
        anchors.insert(point);
        anchors.insert(-point - 1);
    }
    if let Some(hint) = factor.hint {
        anchors.insert(hint);
        anchors.extend(hint.checked_sub(1));
    }
    anchors
}

/// `(slope, offset)` of the secant `target >= slope * x - offset` through
/// `x = k` and `x = k + 1`
fn secant(k: i64) -> (i128, i128) {
    let k = i128::from(k);
    (2 * k + 1, k * (k + 1))
}

fn linear(vars: &[Variable], terms: &[(VarId, i64)]) -> Expression {
    let mut expr = Expression::from(0);
    for (var, coef) in terms {
        expr += vars[var.index()] * (*coef as f64);
    }
    expr
}

/// Solve the relaxation with the current secants, rounding to integers and
/// replacing every square target with the exact square
fn relax(
    model: &Model,
    squares: &[Square],
    anchors: &[BTreeSet<i64>],
) -> Result<Vec<i64>, ResolutionError> {
    let mut problem = ProblemVariables::new();
    let vars: Vec<Variable> = model
        .vars()
        .iter()
        .map(|v| {
            let definition = variable().min(v.lo as f64).max(v.hi as f64);
            problem.add(if v.decision {
                definition.integer()
            } else {
                definition
            })
        })
        .collect();

    let mut lp = problem
        .minimise(linear(&vars, &model.objective().terms))
        .using(microlp);

    for c in model.linear_constraints() {
        let lhs = linear(&vars, &c.terms);
        let rhs = c.rhs as f64;
        lp.add_constraint(match c.relation {
            Relation::Eq => constraint::eq(lhs, rhs),
            Relation::Le => constraint::leq(lhs, rhs),
            Relation::Ge => constraint::geq(lhs, rhs),
        });
    }

    for (square, anchors) in squares.iter().zip(anchors) {
        let target = vars[square.target.index()].into_expression();
        let factor = vars[square.factor.index()];
        for k in anchors {
            let (slope, offset) = secant(*k);
            lp.add_constraint(constraint::geq(
                target.clone(),
                factor * (slope as f64) - (offset as f64),
            ));
        }
    }

    let solution = lp.solve()?;
    let mut values: Vec<i64> = vars
        .iter()
        .map(|v| solution.value(*v).round() as i64)
        .collect();
    for square in squares {
        let x = i128::from(values[square.factor.index()]);
        values[square.target.index()] = i64::try_from(x * x).unwrap_or(i64::MAX);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::model::LinearExpr;

    fn solve(model: &Model) -> Solution {
        MilpSolver::new().solve(model, Duration::from_secs(30))
    }

    /// minimize (x - target)^2 with x a multiple of `step` in [0, hi]
    fn nearest_multiple(step: i64, hi: i64, target: i64) -> (Model, VarId) {
        let mut model = Model::new();
        let units = model.new_int_var(0, hi / step, "units");
        let x = model.new_int_var(0, hi, "x");
        let dev = model.new_int_var(-hi, hi, "dev");
        let sq = model.new_int_var(0, hi * hi, "sq");
        model.add_eq("step", LinearExpr::new().term(x, 1).term(units, -step), 0);
        model.add_eq("dev", LinearExpr::new().term(dev, 1).term(x, -1), -target);
        model.add_multiplication_eq("sq", sq, dev, dev);
        model.minimize(LinearExpr::from(sq));
        model.mark_decision(units);
        (model, x)
    }

    #[test]
    fn test_secant_is_exact_at_both_ends_and_below_elsewhere() {
        for k in -6..6 {
            let (slope, offset) = secant(k);
            for x in -10i128..10 {
                let line = slope * x - offset;
                if x == i128::from(k) || x == i128::from(k) + 1 {
                    assert_eq!(line, x * x, "k={} x={}", k, x);
                } else {
                    assert!(line < x * x, "k={} x={}", k, x);
                }
            }
        }
    }

    #[test]
    fn test_seed_anchors() {
        let mut var = IntVar {
            name: "dev".to_string(),
            lo: -10,
            hi: 10,
            hint: None,
            decision: false,
        };
        let anchors: Vec<i64> = seed_anchors(&var).into_iter().collect();
        assert_eq!(anchors, vec![-9, -5, -3, -2, -1, 0, 1, 2, 4, 8]);

        var.hint = Some(7);
        let anchors = seed_anchors(&var);
        assert!(anchors.contains(&7) && anchors.contains(&6));
    }

    #[test]
    fn test_minimizes_squared_distance() {
        let (model, x) = nearest_multiple(5, 20, 7);

        let solution = solve(&model);
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.value(x), Some(5));
        assert_eq!(solution.objective, Some(4));
    }

    #[test]
    fn test_converges_far_from_seeded_anchors() {
        let (model, x) = nearest_multiple(1, 20_000, 12_345);

        let solution = solve(&model);
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.value(x), Some(12_345));
        assert_eq!(solution.objective, Some(0));
        assert!(solution.stats.cuts > 0);
    }

    #[test]
    fn test_gcd_proves_infeasible_before_solving() {
        // 50a + 50b == 125 has no integer solution
        let mut model = Model::new();
        let a = model.new_int_var(0, 100, "a");
        let b = model.new_int_var(0, 100, "b");
        model.mark_decision(a);
        model.mark_decision(b);
        model.add_eq("sum", LinearExpr::new().term(a, 50).term(b, 50), 125);

        let solution = solve(&model);
        assert_eq!(solution.status, SolveStatus::Infeasible);
        assert_eq!(solution.stats.rounds, 0);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_bounds_conflict_is_infeasible() {
        let mut model = Model::new();
        let x = model.new_int_var(0, 10, "x");
        model.mark_decision(x);
        model.add_ge("floor", LinearExpr::from(x), 11);

        assert_eq!(solve(&model).status, SolveStatus::Infeasible);
    }

    #[test]
    fn test_general_product_is_rejected() {
        let mut model = Model::new();
        let x = model.new_int_var(2, 5, "x");
        let y = model.new_int_var(3, 4, "y");
        let p = model.new_int_var(0, 100, "p");
        model.add_multiplication_eq("p", p, x, y);
        model.minimize(LinearExpr::from(p));

        let solution = solve(&model);
        assert_eq!(solution.status, SolveStatus::ModelInvalid);
        assert!(solution.detail.unwrap().contains("only squares"));
    }

    #[test]
    fn test_negative_square_weight_is_rejected() {
        let mut model = Model::new();
        let x = model.new_int_var(-5, 5, "x");
        let sq = model.new_int_var(0, 25, "sq");
        model.add_multiplication_eq("sq", sq, x, x);
        model.minimize(LinearExpr::new().term(sq, -1));

        assert_eq!(solve(&model).status, SolveStatus::ModelInvalid);
    }

    #[test]
    fn test_invalid_model() {
        let mut model = Model::new();
        model.new_int_var(1, 0, "empty");

        let solution = solve(&model);
        assert_eq!(solution.status, SolveStatus::ModelInvalid);
        assert!(solution.detail.unwrap().contains("empty"));
    }

    #[test]
    fn test_zero_budget_times_out() {
        let (model, _) = nearest_multiple(5, 20, 7);

        let solution = MilpSolver::new().solve(&model, Duration::ZERO);
        assert_eq!(solution.status, SolveStatus::Timeout);
        assert!(solution.values.is_empty());
        assert_eq!(solution.stats.rounds, 0);
    }
}
