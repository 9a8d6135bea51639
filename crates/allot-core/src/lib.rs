//! Allot Core Library
//!
//! Budget reallocation for the Allot planning tool:
//! - Budget snapshot model with the nine allocation categories
//! - Aggregate accounting (total needs, total wants)
//! - Default and overridden deviation weights
//! - Integer model builder and the 50/30/20 constraint set
//! - Pluggable solver engine (mixed-integer on good_lp by default)
//! - Validated recommendations with per-category changes
//! - TOML configuration with an embedded default

pub mod config;
pub mod error;
pub mod models;
pub mod optimizer;
pub mod source;

pub use config::{OptimizerConfig, PolicyLimits};
pub use error::{Error, Result};
pub use models::{BudgetState, Category, CategoryMap, Floors, OptimizeRequest, WeightMap};
pub use optimizer::{
    optimize, Baseline, BudgetOptimizer, CategoryChange, Failure, MilpSolver, Recommendation,
    SearchStats, SolveQuality, SolveStatus, Solver, WeightPolicy,
};
pub use source::{BudgetSource, JsonFileSource, StaticSource};
