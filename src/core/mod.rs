mod engine;
mod error;
mod inflation;
mod report;
mod types;

pub use engine::{Portfolio, run_projection};
pub use error::PlanError;
pub use inflation::project_inflation;
pub use report::{format_thousands, markdown_row, markdown_table};
pub use types::{
    AllocationState, AssetClass, Checkpoint, CheckpointKind, DeploymentPhase, DeploymentSchedule,
    InflationInputs, InflationProjection, MonthlyDepositPlan, PhaseTransition, ProjectionInputs,
    ProjectionProfile, ProjectionResult, RateTable, ReportRow, TransitionReason,
    monthly_multiplier, round_currency,
};
