//! Domain models for Allot

use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// A budget bucket. The set is closed: five needs leaves, investment,
/// savings and the two derived aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[serde(alias = "transport_expenditure")]
    Transport,
    #[serde(alias = "food_expenditure")]
    Food,
    #[serde(alias = "housing_expenditure")]
    Housing,
    #[serde(alias = "insurance_expenditure")]
    Insurance,
    #[serde(alias = "other_needs_expenditure")]
    OtherNeeds,
    #[serde(alias = "investment_expenditure", alias = "investments")]
    Investment,
    #[serde(alias = "savings")]
    MonthlySavings,
    TotalNeeds,
    TotalWants,
}

impl Category {
    pub const COUNT: usize = 9;

    /// Every category, in declaration order
    pub const ALL: [Category; Category::COUNT] = [
        Self::Transport,
        Self::Food,
        Self::Housing,
        Self::Insurance,
        Self::OtherNeeds,
        Self::Investment,
        Self::MonthlySavings,
        Self::TotalNeeds,
        Self::TotalWants,
    ];

    /// Leaves whose sum defines total needs
    pub const NEEDS_LEAVES: [Category; 5] = [
        Self::Transport,
        Self::Food,
        Self::Housing,
        Self::Insurance,
        Self::OtherNeeds,
    ];

    /// Categories supplied directly by a budget snapshot
    pub const LEAVES: [Category; 7] = [
        Self::Transport,
        Self::Food,
        Self::Housing,
        Self::Insurance,
        Self::OtherNeeds,
        Self::Investment,
        Self::MonthlySavings,
    ];

    /// Position in [`Category::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Allocation granularity in currency units
    pub const fn step(self) -> i64 {
        match self {
            Self::Transport => 10,
            _ => 50,
        }
    }

    /// Smallest allowed allocation
    pub const fn lower_bound(self) -> i64 {
        0
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Food => "food",
            Self::Housing => "housing",
            Self::Insurance => "insurance",
            Self::OtherNeeds => "other_needs",
            Self::Investment => "investment",
            Self::MonthlySavings => "monthly_savings",
            Self::TotalNeeds => "total_needs",
            Self::TotalWants => "total_wants",
        }
    }

    /// Human-readable name for reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Transport => "Transport",
            Self::Food => "Food",
            Self::Housing => "Housing",
            Self::Insurance => "Insurance",
            Self::OtherNeeds => "Other needs",
            Self::Investment => "Investment",
            Self::MonthlySavings => "Monthly savings",
            Self::TotalNeeds => "Total needs",
            Self::TotalWants => "Total wants",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "transport" | "transport_expenditure" => Ok(Self::Transport),
            "food" | "food_expenditure" => Ok(Self::Food),
            "housing" | "housing_expenditure" => Ok(Self::Housing),
            "insurance" | "insurance_expenditure" => Ok(Self::Insurance),
            "other_needs" | "other_needs_expenditure" => Ok(Self::OtherNeeds),
            "investment" | "investments" | "investment_expenditure" => Ok(Self::Investment),
            "monthly_savings" | "savings" => Ok(Self::MonthlySavings),
            "total_needs" | "needs" => Ok(Self::TotalNeeds),
            "total_wants" | "wants" => Ok(Self::TotalWants),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One value per category, stored in a fixed array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryMap<T>([T; Category::COUNT]);

impl<T> CategoryMap<T> {
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        Self(std::array::from_fn(|i| f(Category::ALL[i])))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.iter().copied().zip(self.0.iter())
    }
}

impl<T> Index<Category> for CategoryMap<T> {
    type Output = T;

    fn index(&self, category: Category) -> &T {
        &self.0[category.index()]
    }
}

impl<T> IndexMut<Category> for CategoryMap<T> {
    fn index_mut(&mut self, category: Category) -> &mut T {
        &mut self.0[category.index()]
    }
}

impl<T: Serialize> Serialize for CategoryMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Category::COUNT))?;
        for (category, value) in self.iter() {
            map.serialize_entry(category.as_str(), value)?;
        }
        map.end()
    }
}

/// Accepts integers or floats (truncated toward zero) for currency amounts
fn de_amount<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Int(i64),
        Float(f64),
    }

    // -2^63 and 2^63 are exact in f64; anything truncated into
    // [-2^63, 2^63) converts to i64 without saturating
    const I64_RANGE: std::ops::Range<f64> = -9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0;

    match Amount::deserialize(deserializer)? {
        Amount::Int(v) => Ok(v),
        Amount::Float(v) if I64_RANGE.contains(&v.trunc()) => Ok(v.trunc() as i64),
        Amount::Float(v) => Err(serde::de::Error::custom(format!(
            "amount must be a finite number within the integer range, got {}",
            v
        ))),
    }
}

/// Current monthly allocation of every leaf category plus income.
///
/// Field aliases accept the record shape used by the onboarding flow
/// (`monthly_take_home`, `transport_expenditure`, ...). Unknown fields are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BudgetState {
    #[serde(alias = "monthly_take_home", deserialize_with = "de_amount")]
    pub income: i64,
    #[serde(default, alias = "transport_expenditure", deserialize_with = "de_amount")]
    pub transport: i64,
    #[serde(default, alias = "food_expenditure", deserialize_with = "de_amount")]
    pub food: i64,
    #[serde(default, alias = "housing_expenditure", deserialize_with = "de_amount")]
    pub housing: i64,
    #[serde(default, alias = "insurance_expenditure", deserialize_with = "de_amount")]
    pub insurance: i64,
    #[serde(default, alias = "other_needs_expenditure", deserialize_with = "de_amount")]
    pub other_needs: i64,
    #[serde(default, alias = "investment_expenditure", deserialize_with = "de_amount")]
    pub investment: i64,
    #[serde(default, alias = "savings", deserialize_with = "de_amount")]
    pub monthly_savings: i64,
}

impl BudgetState {
    /// Largest income or leaf amount accepted. Deviations are bounded by
    /// income, so squared deviations stay within `i64`.
    pub const MAX_AMOUNT: i64 = 1_000_000_000;

    /// Current value of a leaf category; `None` for aggregates
    pub fn leaf(&self, category: Category) -> Option<i64> {
        match category {
            Category::Transport => Some(self.transport),
            Category::Food => Some(self.food),
            Category::Housing => Some(self.housing),
            Category::Insurance => Some(self.insurance),
            Category::OtherNeeds => Some(self.other_needs),
            Category::Investment => Some(self.investment),
            Category::MonthlySavings => Some(self.monthly_savings),
            Category::TotalNeeds | Category::TotalWants => None,
        }
    }

    /// Boundary check for amounts: leaves must be non-negative and nothing
    /// may exceed [`BudgetState::MAX_AMOUNT`]. A non-positive income is left
    /// to the optimizer, which reports it as its own failure.
    pub fn validate(&self) -> Result<()> {
        if self.income > Self::MAX_AMOUNT {
            return Err(Error::InvalidData(format!(
                "income must be at most {}, got {}",
                Self::MAX_AMOUNT,
                self.income
            )));
        }
        for category in Category::LEAVES {
            let value = self.leaf(category).unwrap_or_default();
            if value < 0 {
                return Err(Error::InvalidData(format!(
                    "{} must be non-negative, got {}",
                    category, value
                )));
            }
            if value > Self::MAX_AMOUNT {
                return Err(Error::InvalidData(format!(
                    "{} must be at most {}, got {}",
                    category,
                    Self::MAX_AMOUNT,
                    value
                )));
            }
        }
        Ok(())
    }
}

/// Caller overrides of per-category importance weights
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightMap(BTreeMap<Category, i64>);

impl WeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: Category, weight: i64) -> Self {
        self.0.insert(category, weight);
        self
    }

    pub fn set(&mut self, category: Category, weight: i64) {
        self.0.insert(category, weight);
    }

    pub fn get(&self, category: Category) -> Option<i64> {
        self.0.get(&category).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, i64)> + '_ {
        self.0.iter().map(|(c, w)| (*c, *w))
    }

    pub fn validate(&self) -> Result<()> {
        match self.0.iter().find(|(_, w)| **w <= 0) {
            Some((category, weight)) => Err(Error::InvalidData(format!(
                "weight for {} must be a positive integer, got {}",
                category, weight
            ))),
            None => Ok(()),
        }
    }
}

/// Caller-pinned minimum allocations (e.g. a fixed rent)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Floors(BTreeMap<Category, i64>);

impl Floors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: Category, minimum: i64) -> Self {
        self.0.insert(category, minimum);
        self
    }

    pub fn set(&mut self, category: Category, minimum: i64) {
        self.0.insert(category, minimum);
    }

    pub fn get(&self, category: Category) -> Option<i64> {
        self.0.get(&category).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, i64)> + '_ {
        self.0.iter().map(|(c, m)| (*c, *m))
    }

    pub fn validate(&self) -> Result<()> {
        match self.0.iter().find(|(_, m)| **m < 0) {
            Some((category, minimum)) => Err(Error::InvalidData(format!(
                "floor for {} must be non-negative, got {}",
                category, minimum
            ))),
            None => Ok(()),
        }
    }
}

/// One optimization request as handed over by the boundary layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    #[serde(alias = "budget_data")]
    pub state: BudgetState,
    #[serde(default)]
    pub weights: WeightMap,
    #[serde(default)]
    pub floors: Floors,
}

impl OptimizeRequest {
    pub fn new(state: BudgetState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    pub fn with_weights(mut self, weights: WeightMap) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_floors(mut self, floors: Floors) -> Self {
        self.floors = floors;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.state.validate()?;
        self.weights.validate()?;
        self.floors.validate()
    }
}
