//! Budget snapshot sources
//!
//! The optimizer never computes current spending itself. A forecasting
//! collaborator (or a plain file) hands it a [`BudgetState`] through
//! [`BudgetSource`]; the figures are treated as opaque integers.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::BudgetState;

/// Supplies the current-allocation snapshot for one request
pub trait BudgetSource: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Produce a validated snapshot
    fn budget_state(&self) -> Result<BudgetState>;
}

/// A snapshot that is already in memory
#[derive(Debug, Clone)]
pub struct StaticSource(pub BudgetState);

impl BudgetSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn budget_state(&self) -> Result<BudgetState> {
        self.0.validate()?;
        Ok(self.0)
    }
}

/// Reads a JSON snapshot from disk
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BudgetSource for JsonFileSource {
    fn name(&self) -> &'static str {
        "json_file"
    }

    fn budget_state(&self) -> Result<BudgetState> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::InvalidData(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let state: BudgetState = serde_json::from_str(&content)?;
        state.validate()?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"income": 3000, "housing": 900, "monthly_savings": 600}"#).unwrap();

        let state = JsonFileSource::new(&path).budget_state().unwrap();
        assert_eq!(state.income, 3000);
        assert_eq!(state.housing, 900);
        assert_eq!(state.food, 0);
    }

    #[test]
    fn test_json_file_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = JsonFileSource::new(dir.path().join("nope.json")).budget_state();
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_static_source_rejects_negative_leaf() {
        let state = BudgetState {
            income: 1000,
            housing: -1,
            ..Default::default()
        };
        assert!(StaticSource(state).budget_state().is_err());
    }
}
