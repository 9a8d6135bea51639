//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use allot_core::{Category, Failure, OptimizerConfig, Recommendation};
use tempfile::TempDir;

use crate::commands::{self, Outcome};

const SNAPSHOT: &str = r#"{
    "monthly_take_home": 4000,
    "transport_expenditure": 100,
    "food_expenditure": 100,
    "housing_expenditure": 1000,
    "insurance_expenditure": 100,
    "other_needs_expenditure": 700,
    "investment_expenditure": 300,
    "savings": 700
}"#;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn config() -> OptimizerConfig {
    OptimizerConfig::default().with_time_budget(Duration::from_secs(2))
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_assignment() {
    assert_eq!(
        commands::parse_assignment("food=25").unwrap(),
        (Category::Food, 25)
    );
    assert_eq!(
        commands::parse_assignment("other-needs= 40").unwrap(),
        (Category::OtherNeeds, 40)
    );
    assert_eq!(
        commands::parse_assignment("savings=0").unwrap(),
        (Category::MonthlySavings, 0)
    );
    assert!(commands::parse_assignment("food").is_err());
    assert!(commands::parse_assignment("groceries=5").is_err());
    assert!(commands::parse_assignment("food=lots").is_err());
}

#[test]
fn test_read_weights_file_then_overrides() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "weights.json", r#"{"food": 5, "housing": 7}"#);

    let weights = commands::read_weights(Some(path.as_path()), &["food=9".to_string()]).unwrap();
    assert_eq!(weights.get(Category::Food), Some(9));
    assert_eq!(weights.get(Category::Housing), Some(7));
    assert_eq!(weights.get(Category::Transport), None);
}

#[test]
fn test_read_weights_rejects_non_positive() {
    assert!(commands::read_weights(None, &["food=0".to_string()]).is_err());
}

#[test]
fn test_parse_floors_rejects_negative() {
    assert!(commands::parse_floors(&["housing=1200".to_string()]).is_ok());
    assert!(commands::parse_floors(&["housing=-1".to_string()]).is_err());
}

// ========== Config Tests ==========

#[test]
fn test_load_config_applies_overrides() {
    let config = commands::load_config(None, Some(500), Some(250), true);
    // The user's own override file may exist; only check the flags we set
    let config = config.unwrap();
    assert_eq!(config.scale, 500);
    assert_eq!(config.time_budget, Duration::from_millis(250));
    assert!(!config.accept_feasible);
}

#[test]
fn test_load_config_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "optimizer.toml", "[weights]\nscale = 42\n");

    let config = commands::load_config(Some(path.as_path()), None, None, false).unwrap();
    assert_eq!(config.scale, 42);
    assert!(config.accept_feasible);
}

#[test]
fn test_load_config_missing_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(commands::load_config(Some(missing.as_path()), None, None, false).is_err());
}

#[test]
fn test_load_config_rejects_bad_scale() {
    assert!(commands::load_config(None, Some(0), None, false).is_err());
}

#[test]
fn test_cmd_config() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "optimizer.toml", "[solver]\ntime_budget_ms = 100\n");

    assert!(commands::cmd_config(Some(path.as_path()), false).is_ok());
    assert!(commands::cmd_config(Some(path.as_path()), true).is_ok());
}

// ========== Optimize Command Tests ==========

#[test]
fn test_cmd_optimize() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "budget.json", SNAPSHOT);

    let result = commands::cmd_optimize(&config(), &input, None, &[], &[], false);
    assert!(result.is_ok());

    let result = commands::cmd_optimize(&config(), &input, None, &[], &[], true);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_optimize_with_overrides() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "budget.json", SNAPSHOT);
    let weights = write_file(&dir, "weights.json", r#"{"investments": 20}"#);

    let result = commands::cmd_optimize(
        &config(),
        &input,
        Some(weights.as_path()),
        &["housing=3".to_string()],
        &["insurance=150".to_string()],
        false,
    );
    assert!(result.is_ok());
}

#[test]
fn test_cmd_optimize_business_failure_is_ok() {
    let dir = TempDir::new().unwrap();
    let zero_income = write_file(&dir, "zero.json", r#"{"income": 0, "housing": 100}"#);
    let off_step = write_file(&dir, "off.json", r#"{"income": 4010}"#);

    assert!(commands::cmd_optimize(&config(), &zero_income, None, &[], &[], true).is_ok());
    assert!(commands::cmd_optimize(&config(), &off_step, None, &[], &[], false).is_ok());
}

#[test]
fn test_cmd_optimize_invalid_input() {
    let dir = TempDir::new().unwrap();
    let negative = write_file(&dir, "neg.json", r#"{"income": 4000, "food": -5}"#);
    let garbage = write_file(&dir, "bad.json", "not json");
    let oversized = write_file(
        &dir,
        "big.json",
        r#"{"income": 4000, "housing": 4611686018427387904, "food": 4611686018427387904}"#,
    );
    let missing = dir.path().join("missing.json");

    assert!(commands::cmd_optimize(&config(), &negative, None, &[], &[], false).is_err());
    assert!(commands::cmd_optimize(&config(), &garbage, None, &[], &[], false).is_err());
    assert!(commands::cmd_optimize(&config(), &oversized, None, &[], &[], false).is_err());
    assert!(commands::cmd_optimize(&config(), &missing, None, &[], &[], false).is_err());
}

#[test]
fn test_fail_on_defect() {
    assert!(commands::fail_on_defect(&Err(Failure::Infeasible)).is_ok());
    assert!(commands::fail_on_defect(&Err(Failure::InternalInvariantViolation {
        detail: "bad".to_string()
    }))
    .is_err());
}

#[test]
fn test_invalid_input_is_not_a_defect() {
    let failure = Failure::InvalidInput {
        detail: "needs leaves overflow their total".to_string(),
    };
    assert!(commands::fail_on_defect(&Err(failure.clone())).is_ok());

    let result: Result<Recommendation, Failure> = Err(failure);
    let json = serde_json::to_value(Outcome::from(&result)).unwrap();
    assert_eq!(json["failure"]["reason"], "invalid_input");
}

#[test]
fn test_outcome_json_shape() {
    let failed: Result<Recommendation, Failure> = Err(Failure::SolverTimeout { budget_ms: 10 });
    let json = serde_json::to_value(Outcome::from(&failed)).unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["failure"]["reason"], "solver_timeout");
}

// ========== Weights Command Tests ==========

#[test]
fn test_cmd_weights() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "budget.json", SNAPSHOT);

    assert!(commands::cmd_weights(&config(), &input, &[], false).is_ok());
    assert!(commands::cmd_weights(&config(), &input, &["food=3".to_string()], true).is_ok());
    assert!(commands::cmd_weights(&config(), &input, &["needs=-3".to_string()], false).is_err());
}

// ========== Batch Command Tests ==========

const BATCH: &str = r#"[
    {"state": {"income": 4000, "transport": 300, "food": 400, "housing": 900,
               "insurance": 200, "other_needs": 200, "investment": 300,
               "monthly_savings": 800}},
    {"budget_data": {"income": 0}},
    {"state": {"income": 100}, "floors": {"housing": 200}},
    {"state": {"income": 4000, "housing": 1000, "monthly_savings": 700},
     "weights": {"savings": 50}}
]"#;

#[test]
fn test_read_requests() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "batch.json", BATCH);

    let requests = commands::read_requests(&path).unwrap();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[1].state.income, 0);
    assert_eq!(requests[2].floors.get(Category::Housing), Some(200));
    assert_eq!(requests[3].weights.get(Category::MonthlySavings), Some(50));
}

#[test]
fn test_read_requests_rejects_invalid_entry() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "batch.json", r#"[{"state": {"income": 10, "food": -1}}]"#);
    assert!(commands::read_requests(&path).is_err());
}

#[tokio::test]
async fn test_run_batch_preserves_order() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "batch.json", BATCH);
    let requests = commands::read_requests(&path).unwrap();

    let results = commands::run_batch(config(), requests).await.unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().map(|r| r.total_loss), Ok(0));
    assert_eq!(results[1], Err(Failure::InvalidIncome { income: 0 }));
    assert_eq!(results[2], Err(Failure::Infeasible));
    assert!(results[3].is_ok());
}

#[tokio::test]
async fn test_cmd_batch() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "batch.json", BATCH);

    assert!(commands::cmd_batch(config(), &path, false).await.is_ok());
    assert!(commands::cmd_batch(config(), &path, true).await.is_ok());
}
