use thiserror::Error;

use super::types::AssetClass;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Not everything of the monthly deposit is allocated, only {total}%")]
    AllocationPlanInvalid { total: f64 },

    #[error("Asset class {class} is not part of the rate table")]
    UnknownAssetClass { class: AssetClass },
}
