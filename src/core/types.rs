use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::PlanError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetClass {
    Etfs,
    SingleStocks,
    RealEstate,
    Bonds,
    Cash,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Etfs,
        AssetClass::SingleStocks,
        AssetClass::RealEstate,
        AssetClass::Bonds,
        AssetClass::Cash,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Etfs => "etfs",
            AssetClass::SingleStocks => "single-stocks",
            AssetClass::RealEstate => "real-estate",
            AssetClass::Bonds => "bonds",
            AssetClass::Cash => "cash",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "etfs" | "etf" | "index" => Ok(AssetClass::Etfs),
            "single-stocks" | "stocks" => Ok(AssetClass::SingleStocks),
            "real-estate" => Ok(AssetClass::RealEstate),
            "bonds" => Ok(AssetClass::Bonds),
            "cash" => Ok(AssetClass::Cash),
            other => Err(format!(
                "unknown asset class '{other}' (expected etfs, single-stocks, real-estate, bonds or cash)"
            )),
        }
    }
}

/// Growth factor applied once per month for an annual return given in percent.
pub fn monthly_multiplier(annual_rate_percent: f64) -> f64 {
    (1.0 + annual_rate_percent / 100.0).powf(1.0 / 12.0)
}

/// Rounds to whole currency units, ties to even.
pub fn round_currency(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Assumed annual return per asset class, in percent. The table also
/// decides which classes take part in a projection; cash is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    rates: BTreeMap<AssetClass, f64>,
}

impl RateTable {
    pub fn new(cash_rate: f64) -> Self {
        Self {
            rates: BTreeMap::from([(AssetClass::Cash, cash_rate)]),
        }
    }

    pub fn with_rate(mut self, class: AssetClass, annual_rate: f64) -> Self {
        self.set_rate(class, annual_rate);
        self
    }

    pub fn set_rate(&mut self, class: AssetClass, annual_rate: f64) {
        self.rates.insert(class, annual_rate);
    }

    pub fn annual_rate(&self, class: AssetClass) -> Option<f64> {
        self.rates.get(&class).copied()
    }

    pub fn contains(&self, class: AssetClass) -> bool {
        self.rates.contains_key(&class)
    }

    pub fn classes(&self) -> impl Iterator<Item = AssetClass> + '_ {
        self.rates.keys().copied()
    }

    pub fn monthly_multipliers(&self) -> BTreeMap<AssetClass, f64> {
        self.rates
            .iter()
            .map(|(class, rate)| (*class, monthly_multiplier(*rate)))
            .collect()
    }
}

/// Split of the monthly deposit across asset classes, in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyDepositPlan {
    entries: Vec<(AssetClass, f64)>,
}

impl MonthlyDepositPlan {
    /// The percentages must add up to exactly 100. The sum is taken in the
    /// given order with plain float addition, so a split such as
    /// 33.333/33.333/33.334 can be rejected by rounding.
    pub fn new(entries: &[(AssetClass, f64)]) -> Result<Self, PlanError> {
        let mut total = 0.0;
        for (_, percent) in entries {
            total += percent;
        }
        if total != 100.0 {
            return Err(PlanError::AllocationPlanInvalid { total });
        }
        Ok(Self {
            entries: entries.to_vec(),
        })
    }

    pub fn entries(&self) -> &[(AssetClass, f64)] {
        &self.entries
    }
}

/// Current value held in each asset class of the rate table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AllocationState {
    balances: BTreeMap<AssetClass, f64>,
}

impl AllocationState {
    pub fn zeroed(classes: impl IntoIterator<Item = AssetClass>) -> Self {
        Self {
            balances: classes.into_iter().map(|class| (class, 0.0)).collect(),
        }
    }

    pub fn contains(&self, class: AssetClass) -> bool {
        self.balances.contains_key(&class)
    }

    pub fn get(&self, class: AssetClass) -> f64 {
        self.balances.get(&class).copied().unwrap_or(0.0)
    }

    pub(crate) fn set(&mut self, class: AssetClass, value: f64) {
        if let Some(balance) = self.balances.get_mut(&class) {
            *balance = value;
        }
    }

    pub(crate) fn add(&mut self, class: AssetClass, amount: f64) {
        if let Some(balance) = self.balances.get_mut(&class) {
            *balance += amount;
        }
    }

    pub(crate) fn compound(&mut self, multipliers: &BTreeMap<AssetClass, f64>) {
        for (class, balance) in &mut self.balances {
            *balance *= multipliers.get(class).copied().unwrap_or(1.0);
        }
    }

    pub fn total(&self) -> f64 {
        let mut total = 0.0;
        for balance in self.balances.values() {
            total += balance;
        }
        total
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetClass, f64)> + '_ {
        self.balances.iter().map(|(class, value)| (*class, *value))
    }
}

/// Tranches of the starting cash deployed at the start of every month while
/// the portfolio is in its initial deployment phase.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeploymentSchedule {
    pub monthly: Vec<(AssetClass, f64)>,
    /// Leave the initial deployment phase as soon as cash is drained.
    pub gated: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentPhase {
    InitialDeployment,
    SteadyState,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionReason {
    CashExhausted,
    Finished,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTransition {
    pub date: NaiveDate,
    pub reason: TransitionReason,
}

/// Rounded balances for one simulated month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub date: NaiveDate,
    pub cash: i64,
    pub etfs: i64,
    pub single_stocks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_estate: Option<i64>,
    pub bonds: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum CheckpointKind {
    DeploymentComplete,
    HorizonYear { years: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    #[serde(flatten)]
    pub kind: CheckpointKind,
    pub date: NaiveDate,
    pub total_worth: f64,
    pub allocation: AllocationState,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProjectionProfile {
    /// Equities, bonds and cash; deployment stops once cash is drained.
    Standard,
    /// Adds real estate and deploys a larger monthly slice, ungated.
    RealEstate,
}

impl ProjectionProfile {
    pub fn rate_table(self) -> RateTable {
        let table = RateTable::new(0.05)
            .with_rate(AssetClass::Etfs, 7.0)
            .with_rate(AssetClass::SingleStocks, 7.0)
            .with_rate(AssetClass::Bonds, 4.0);
        match self {
            ProjectionProfile::Standard => table,
            ProjectionProfile::RealEstate => table.with_rate(AssetClass::RealEstate, 5.8),
        }
    }

    pub fn deployment_schedule(self) -> DeploymentSchedule {
        let (percent, gated) = match self {
            ProjectionProfile::Standard => (0.694, true),
            ProjectionProfile::RealEstate => (0.92, false),
        };
        DeploymentSchedule {
            monthly: vec![
                (AssetClass::SingleStocks, percent),
                (AssetClass::Etfs, percent),
            ],
            gated,
        }
    }

    pub fn upfront_tranches(self) -> Vec<(AssetClass, f64)> {
        vec![(AssetClass::Etfs, 33.0), (AssetClass::Bonds, 17.0)]
    }

    pub fn deposit_plan(self) -> Vec<(AssetClass, f64)> {
        vec![(AssetClass::Etfs, 50.0), (AssetClass::SingleStocks, 50.0)]
    }

    pub fn checkpoint_years(self) -> Vec<u32> {
        match self {
            ProjectionProfile::Standard => Vec::new(),
            ProjectionProfile::RealEstate => vec![5, 25],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionInputs {
    pub starting_date: NaiveDate,
    pub starting_cash: f64,
    pub monthly_deposit: f64,
    pub deposit_plan: Vec<(AssetClass, f64)>,
    pub rates: RateTable,
    pub upfront_tranches: Vec<(AssetClass, f64)>,
    pub schedule: DeploymentSchedule,
    pub horizon_years: u32,
    pub checkpoint_years: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub starting_date: NaiveDate,
    pub horizon_end: NaiveDate,
    pub deployment_completed_on: Option<NaiveDate>,
    pub months_simulated: u32,
    pub final_total_worth: f64,
    pub checkpoints: Vec<Checkpoint>,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, Copy)]
pub struct InflationInputs {
    pub annual_inflation_percent: f64,
    pub initial_amount: f64,
    pub monthly_deposit: f64,
    pub years: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InflationProjection {
    pub annual_inflation_percent: f64,
    pub initial_amount: f64,
    pub monthly_deposit: f64,
    pub years: u32,
    pub months: u32,
    pub required_amount: f64,
    pub required_amount_rounded: i64,
}
