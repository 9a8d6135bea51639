//! Optimizer configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the data dir
//!    (~/.local/share/allot/config/optimizer.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Every key is optional; missing keys keep their default value.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/optimizer.toml");

/// Income-percentage limits applied to the aggregate categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PolicyLimits {
    /// Monthly savings must be at least this percent of income
    pub savings_floor_percent: i64,
    /// Total needs may be at most this percent of income
    pub needs_ceiling_percent: i64,
    /// Total wants may be at most this percent of income
    pub wants_ceiling_percent: i64,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            savings_floor_percent: 20,
            needs_ceiling_percent: 50,
            wants_ceiling_percent: 30,
        }
    }
}

impl PolicyLimits {
    /// floor(percent × income / 100), or `None` when it does not fit in `i64`
    pub fn share(income: i64, percent: i64) -> Option<i64> {
        let share = (i128::from(income) * i128::from(percent)).div_euclid(100);
        i64::try_from(share).ok()
    }

    pub fn savings_floor(&self, income: i64) -> Option<i64> {
        Self::share(income, self.savings_floor_percent)
    }

    pub fn needs_ceiling(&self, income: i64) -> Option<i64> {
        Self::share(income, self.needs_ceiling_percent)
    }

    pub fn wants_ceiling(&self, income: i64) -> Option<i64> {
        Self::share(income, self.wants_ceiling_percent)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("savings_floor_percent", self.savings_floor_percent),
            ("needs_ceiling_percent", self.needs_ceiling_percent),
            ("wants_ceiling_percent", self.wants_ceiling_percent),
        ] {
            if !(0..=100).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Full optimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizerConfig {
    /// Scale constant of the default weight formula
    pub scale: i64,
    /// Wall-clock budget for one solve
    #[serde(with = "duration_ms")]
    pub time_budget: Duration,
    /// Accept a non-optimal incumbent when the budget runs out
    pub accept_feasible: bool,
    /// Savings floor and needs/wants ceilings
    pub policy: PolicyLimits,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            scale: 1000,
            time_budget: Duration::from_millis(5000),
            accept_feasible: true,
            policy: PolicyLimits::default(),
        }
    }
}

impl OptimizerConfig {
    /// Load from the default override location, falling back to embedded defaults
    pub fn load() -> Result<Self> {
        load_config(None)
    }

    /// Load from an explicit path, falling back to embedded defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        load_config(Some(path))
    }

    /// Parse config from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }

    pub fn with_scale(mut self, scale: i64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn with_accept_feasible(mut self, accept: bool) -> Self {
        self.accept_feasible = accept;
        self
    }

    pub fn with_policy(mut self, policy: PolicyLimits) -> Self {
        self.policy = policy;
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("allot").join("config").join("optimizer.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<OptimizerConfig> {
    let path = override_path
        .map(Path::to_path_buf)
        .or_else(default_config_path);

    let content = match path {
        Some(path) if path.exists() => {
            tracing::debug!(path = %path.display(), "Loading optimizer config");
            fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?
        }
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    weights: Option<RawWeights>,
    solver: Option<RawSolver>,
    policy: Option<RawPolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWeights {
    scale: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSolver {
    time_budget_ms: Option<u64>,
    accept_feasible: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPolicy {
    savings_floor_percent: Option<i64>,
    needs_ceiling_percent: Option<i64>,
    wants_ceiling_percent: Option<i64>,
}

fn parse_config(content: &str) -> Result<OptimizerConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = OptimizerConfig::default();

    if let Some(weights) = raw.weights {
        if let Some(scale) = weights.scale {
            if scale <= 0 {
                return Err(Error::Config(format!(
                    "weights.scale must be positive, got {}",
                    scale
                )));
            }
            config.scale = scale;
        }
    }

    if let Some(solver) = raw.solver {
        if let Some(ms) = solver.time_budget_ms {
            config.time_budget = Duration::from_millis(ms);
        }
        if let Some(accept) = solver.accept_feasible {
            config.accept_feasible = accept;
        }
    }

    if let Some(policy) = raw.policy {
        if let Some(pct) = policy.savings_floor_percent {
            config.policy.savings_floor_percent = pct;
        }
        if let Some(pct) = policy.needs_ceiling_percent {
            config.policy.needs_ceiling_percent = pct;
        }
        if let Some(pct) = policy.wants_ceiling_percent {
            config.policy.wants_ceiling_percent = pct;
        }
    }
    config.policy.validate()?;

    Ok(config)
}
