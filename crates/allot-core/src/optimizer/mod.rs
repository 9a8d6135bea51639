//! Budget reallocation optimizer
//!
//! Given a monthly budget snapshot, finds the allocation closest to it
//! (weighted squared deviation) that satisfies step alignment, the needs and
//! income closures, the 50/30/20 policy and any caller floors.
//!
//! A request moves through these phases, each traced:
//! - **Validating**: income must be positive and every amount, weight
//!   override and floor in range; nothing is built otherwise
//! - **Building**: baseline, weights, variables and constraints
//! - **Solving**: the [`Solver`] runs within the configured time budget
//! - **Extracting**: the solution is mapped to a [`Recommendation`] or a
//!   [`Failure`] and re-validated
//!
//! There are no retries. The optimizer holds only immutable configuration,
//! so one instance can serve concurrent requests.

pub mod accounting;
pub mod builder;
pub mod constraints;
pub mod extract;
pub mod model;
pub mod solver;
pub mod types;
pub mod weights;

pub use accounting::Baseline;
pub use builder::{AllocationModel, CategoryVars};
pub use extract::{check_invariants, weighted_loss};
pub use model::{LinearExpr, Model, VarId};
pub use solver::{MilpSolver, SearchStats, Solution, SolveStatus, Solver};
pub use types::{CategoryChange, Failure, Recommendation, SolveQuality};
pub use weights::WeightPolicy;

use tracing::{debug, error, info, info_span, warn};

use crate::config::OptimizerConfig;
use crate::models::{BudgetState, OptimizeRequest, WeightMap};

use extract::ExtractOptions;

/// Reallocates a budget under the configured policy
#[derive(Debug, Clone)]
pub struct BudgetOptimizer<S = MilpSolver> {
    config: OptimizerConfig,
    solver: S,
}

impl BudgetOptimizer<MilpSolver> {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            solver: MilpSolver::new(),
        }
    }
}

impl Default for BudgetOptimizer<MilpSolver> {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl<S: Solver> BudgetOptimizer<S> {
    /// Use a different solver engine
    pub fn with_solver(config: OptimizerConfig, solver: S) -> Self {
        Self { config, solver }
    }

    /// Optimize a budget snapshot with optional weight overrides
    pub fn optimize_state(
        &self,
        state: &BudgetState,
        weights: Option<&WeightMap>,
    ) -> Result<Recommendation, Failure> {
        let mut request = OptimizeRequest::new(*state);
        if let Some(weights) = weights {
            request.weights = weights.clone();
        }
        self.optimize(&request)
    }

    pub fn optimize(&self, request: &OptimizeRequest) -> Result<Recommendation, Failure> {
        let income = request.state.income;
        let span = info_span!("optimize", income, solver = self.solver.name());
        let _guard = span.enter();

        debug!(phase = "validating", "Checking income and amounts");
        constraints::check_income(income)?;
        constraints::check_request(request)?;

        debug!(phase = "building", "Building allocation model");
        let baseline = Baseline::from_state(&request.state)?;
        let weights = WeightPolicy::new(self.config.scale).derive(&baseline, &request.weights);
        let mut built = AllocationModel::build(baseline, weights)?;
        constraints::apply(&mut built, &self.config.policy, &request.floors)?;
        debug!(
            vars = built.model.num_vars(),
            constraints = built.model.num_constraints(),
            floors = request.floors.iter().count(),
            "Model built"
        );

        debug!(
            phase = "solving",
            budget_ms = self.config.time_budget.as_millis() as u64,
            "Solving"
        );
        let solution = self.solver.solve(&built.model, self.config.time_budget);
        debug!(
            status = ?solution.status,
            rounds = solution.stats.rounds,
            cuts = solution.stats.cuts,
            elapsed_ms = solution.stats.elapsed_ms,
            "Solver finished"
        );

        let options = ExtractOptions {
            policy: &self.config.policy,
            floors: &request.floors,
            accept_feasible: self.config.accept_feasible,
            time_budget: self.config.time_budget,
        };
        let result = extract::extract(&built, &solution, &options);

        match &result {
            Ok(rec) => info!(
                quality = ?rec.quality,
                total_loss = %rec.total_loss,
                "Budget optimized"
            ),
            Err(failure) if failure.is_defect() => error!(%failure, "Optimization defect"),
            Err(failure) => warn!(reason = failure.reason(), "Optimization failed"),
        }

        result
    }
}

/// One-shot optimization with the given configuration
pub fn optimize(
    state: &BudgetState,
    weights: Option<&WeightMap>,
    config: &OptimizerConfig,
) -> Result<Recommendation, Failure> {
    BudgetOptimizer::new(config.clone()).optimize_state(state, weights)
}
