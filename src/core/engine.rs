use std::collections::BTreeMap;

use chrono::{Months, NaiveDate};
use tracing::{debug, info, warn};

use super::error::PlanError;
use super::types::{
    AllocationState, AssetClass, Checkpoint, CheckpointKind, DeploymentPhase, DeploymentSchedule,
    MonthlyDepositPlan, PhaseTransition, ProjectionInputs, ProjectionResult, RateTable,
    ReportRow, TransitionReason, round_currency,
};

/// Upper bound on months spent draining the starting cash, for schedules
/// that never empty it.
const MAX_DEPLOYMENT_MONTHS: u32 = 1_200;

#[derive(Debug, Clone)]
pub struct Portfolio {
    starting_date: NaiveDate,
    date: NaiveDate,
    starting_cash: f64,
    monthly_deposit: f64,
    allocation: AllocationState,
    deposit_plan: MonthlyDepositPlan,
    multipliers: BTreeMap<AssetClass, f64>,
    schedule: DeploymentSchedule,
    phase: DeploymentPhase,
}

impl Portfolio {
    pub fn new(
        starting_date: NaiveDate,
        starting_cash: f64,
        monthly_deposit: f64,
        deposit_percentages: &[(AssetClass, f64)],
        rates: &RateTable,
        schedule: DeploymentSchedule,
    ) -> Result<Self, PlanError> {
        let deposit_plan = MonthlyDepositPlan::new(deposit_percentages)?;
        for (class, _) in deposit_plan.entries().iter().chain(&schedule.monthly) {
            if !rates.contains(*class) {
                return Err(PlanError::UnknownAssetClass { class: *class });
            }
        }

        let mut allocation = AllocationState::zeroed(rates.classes());
        allocation.set(AssetClass::Cash, starting_cash);

        Ok(Self {
            starting_date,
            date: starting_date,
            starting_cash,
            monthly_deposit,
            allocation,
            deposit_plan,
            multipliers: rates.monthly_multipliers(),
            schedule,
            phase: DeploymentPhase::InitialDeployment,
        })
    }

    pub fn starting_date(&self) -> NaiveDate {
        self.starting_date
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn phase(&self) -> DeploymentPhase {
        self.phase
    }

    pub fn allocation(&self) -> &AllocationState {
        &self.allocation
    }

    pub fn balance(&self, class: AssetClass) -> f64 {
        self.allocation.get(class)
    }

    pub fn total_worth(&self) -> f64 {
        self.allocation.total()
    }

    /// Moves `percent_of_starting_cash` of the starting cash into `class`.
    /// When that would not leave a positive cash balance, whatever cash is
    /// left is swept into `class` instead and cash ends at exactly zero.
    pub fn deploy_starting_cash(
        &mut self,
        class: AssetClass,
        percent_of_starting_cash: f64,
    ) -> Option<PhaseTransition> {
        if !self.allocation.contains(class) {
            warn!(%class, "ignoring deployment into an asset class outside the rate table");
            return None;
        }

        let amount = percent_of_starting_cash / 100.0 * self.starting_cash;
        let cash = self.allocation.get(AssetClass::Cash);
        if cash - amount > 0.0 {
            self.allocation.set(AssetClass::Cash, cash - amount);
            self.allocation.add(class, amount);
            return None;
        }

        self.allocation.add(class, cash);
        self.allocation.set(AssetClass::Cash, 0.0);
        if self.schedule.gated {
            self.enter_steady_state(TransitionReason::CashExhausted)
        } else {
            None
        }
    }

    /// Simulates one month: scheduled deployment of the starting cash, the
    /// monthly deposit, then growth. Deposits land before growth, so they
    /// earn the return of the month they arrive in.
    pub fn advance_one_month(&mut self) -> Option<PhaseTransition> {
        let mut transition = None;
        if self.phase == DeploymentPhase::InitialDeployment {
            for step in 0..self.schedule.monthly.len() {
                let (class, percent) = self.schedule.monthly[step];
                if let Some(event) = self.deploy_starting_cash(class, percent) {
                    transition = Some(event);
                }
            }
        }

        for &(class, percent) in self.deposit_plan.entries() {
            self.allocation.add(class, percent / 100.0 * self.monthly_deposit);
        }

        self.allocation.compound(&self.multipliers);

        self.date = self
            .date
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);

        debug!(
            date = %self.date,
            total = self.total_worth(),
            cash = self.balance(AssetClass::Cash),
            "simulated month"
        );
        transition
    }

    /// Stops scheduled deployment of the starting cash. Returns `None` when
    /// the portfolio already left the initial deployment phase.
    pub fn finish_initial_deployment(&mut self) -> Option<PhaseTransition> {
        self.enter_steady_state(TransitionReason::Finished)
    }

    fn enter_steady_state(&mut self, reason: TransitionReason) -> Option<PhaseTransition> {
        if self.phase == DeploymentPhase::SteadyState {
            return None;
        }
        self.phase = DeploymentPhase::SteadyState;
        info!(date = %self.date, ?reason, "initial deployment finished");
        Some(PhaseTransition {
            date: self.date,
            reason,
        })
    }

    pub fn report_row(&self) -> ReportRow {
        let rounded = |class| round_currency(self.balance(class));
        ReportRow {
            date: self.date,
            cash: rounded(AssetClass::Cash),
            etfs: rounded(AssetClass::Etfs),
            single_stocks: rounded(AssetClass::SingleStocks),
            real_estate: self
                .allocation
                .contains(AssetClass::RealEstate)
                .then(|| rounded(AssetClass::RealEstate)),
            bonds: rounded(AssetClass::Bonds),
            total: round_currency(self.total_worth()),
        }
    }

    fn checkpoint(&self, kind: CheckpointKind) -> Checkpoint {
        Checkpoint {
            kind,
            date: self.date,
            total_worth: self.total_worth(),
            allocation: self.allocation.clone(),
        }
    }
}

struct CheckpointTracker {
    pending: Vec<(u32, NaiveDate)>,
}

impl CheckpointTracker {
    fn new(starting_date: NaiveDate, years: &[u32]) -> Self {
        let mut pending: Vec<(u32, NaiveDate)> = years
            .iter()
            .map(|&y| (y, add_years(starting_date, y)))
            .collect();
        pending.sort_by_key(|(y, _)| *y);
        pending.dedup_by_key(|(y, _)| *y);
        pending.reverse();
        Self { pending }
    }

    fn record_due(&mut self, portfolio: &Portfolio, out: &mut Vec<Checkpoint>) {
        while let Some(&(years, due)) = self.pending.last() {
            if portfolio.date() < due {
                break;
            }
            self.pending.pop();
            out.push(portfolio.checkpoint(CheckpointKind::HorizonYear { years }));
        }
    }
}

fn add_years(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_add_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MAX)
}

/// Runs a full projection: up-front tranches, monthly deployment until the
/// starting cash is drained, then steady monthly deposits until the horizon.
pub fn run_projection(inputs: &ProjectionInputs) -> Result<ProjectionResult, PlanError> {
    for &(class, _) in &inputs.upfront_tranches {
        if !inputs.rates.contains(class) {
            return Err(PlanError::UnknownAssetClass { class });
        }
    }

    let mut portfolio = Portfolio::new(
        inputs.starting_date,
        inputs.starting_cash,
        inputs.monthly_deposit,
        &inputs.deposit_plan,
        &inputs.rates,
        inputs.schedule.clone(),
    )?;
    let horizon_end = add_years(inputs.starting_date, inputs.horizon_years);
    info!(
        start = %inputs.starting_date,
        %horizon_end,
        starting_cash = inputs.starting_cash,
        monthly_deposit = inputs.monthly_deposit,
        "starting projection"
    );

    let mut rows = vec![portfolio.report_row()];
    let mut checkpoints = Vec::new();
    let mut tracker = CheckpointTracker::new(inputs.starting_date, &inputs.checkpoint_years);
    let mut months_simulated = 0u32;

    for &(class, percent) in &inputs.upfront_tranches {
        portfolio.deploy_starting_cash(class, percent);
    }

    let mut deployment_months = 0u32;
    while portfolio.balance(AssetClass::Cash) != 0.0
        && portfolio.phase() == DeploymentPhase::InitialDeployment
    {
        if deployment_months == MAX_DEPLOYMENT_MONTHS {
            warn!(
                months = deployment_months,
                cash = portfolio.balance(AssetClass::Cash),
                "starting cash was not drained, continuing with remaining cash"
            );
            break;
        }
        portfolio.advance_one_month();
        deployment_months += 1;
        months_simulated += 1;
        rows.push(portfolio.report_row());
        tracker.record_due(&portfolio, &mut checkpoints);
    }

    let deployment_completed_on = if portfolio.balance(AssetClass::Cash) == 0.0
        || portfolio.phase() == DeploymentPhase::SteadyState
    {
        checkpoints.push(portfolio.checkpoint(CheckpointKind::DeploymentComplete));
        Some(portfolio.date())
    } else {
        None
    };
    if inputs.schedule.gated {
        portfolio.finish_initial_deployment();
    }

    while portfolio.date() < horizon_end {
        portfolio.advance_one_month();
        months_simulated += 1;
        rows.push(portfolio.report_row());
        tracker.record_due(&portfolio, &mut checkpoints);
    }

    let final_total_worth = portfolio.total_worth();
    info!(
        date = %portfolio.date(),
        months = months_simulated,
        total = final_total_worth,
        "projection finished"
    );

    Ok(ProjectionResult {
        starting_date: inputs.starting_date,
        horizon_end,
        deployment_completed_on,
        months_simulated,
        final_total_worth,
        checkpoints,
        rows,
    })
}
