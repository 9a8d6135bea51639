//! Weight policy
//!
//! Each category's deviation is penalized by a positive integer weight.
//! Without an override the weight is `max(1, round(scale / (current + 1)))`:
//! small current allocations are expensive to move, large ones are cheap.

use crate::models::{Category, CategoryMap, WeightMap};

use super::accounting::Baseline;

/// Derives per-category weights from a scale constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightPolicy {
    scale: i64,
}

impl WeightPolicy {
    pub fn new(scale: i64) -> Self {
        Self { scale }
    }

    /// Weight for an uncustomized category with the given current value
    pub fn default_weight(&self, current: i64) -> i64 {
        let divisor = current.saturating_add(1);
        if divisor <= 0 || self.scale <= 0 {
            return 1;
        }
        round_half_even(self.scale, divisor).max(1)
    }

    /// Override if present, computed default otherwise
    pub fn weight(&self, category: Category, current: i64, overrides: &WeightMap) -> i64 {
        overrides
            .get(category)
            .unwrap_or_else(|| self.default_weight(current))
    }

    /// Weights for all nine categories
    pub fn derive(&self, baseline: &Baseline, overrides: &WeightMap) -> CategoryMap<i64> {
        CategoryMap::from_fn(|category| {
            self.weight(category, baseline.current(category), overrides)
        })
    }
}

/// `numerator / divisor` rounded to the nearest integer, ties to even.
/// Both operands are positive.
fn round_half_even(numerator: i64, divisor: i64) -> i64 {
    let quotient = numerator / divisor;
    let twice_remainder = 2 * i128::from(numerator % divisor);
    let divisor = i128::from(divisor);
    if twice_remainder > divisor || (twice_remainder == divisor && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}
