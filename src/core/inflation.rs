use super::types::{InflationInputs, InflationProjection, monthly_multiplier, round_currency};

/// Amount a running total (starting amount plus monthly deposits) must reach
/// to keep today's purchasing power after `years` of constant inflation.
pub fn project_inflation(inputs: &InflationInputs) -> InflationProjection {
    let multiplier = monthly_multiplier(inputs.annual_inflation_percent);
    let months = inputs.years.saturating_mul(12);

    let mut total = inputs.initial_amount;
    for _ in 0..months {
        total = (total + inputs.monthly_deposit) * multiplier;
    }

    InflationProjection {
        annual_inflation_percent: inputs.annual_inflation_percent,
        initial_amount: inputs.initial_amount,
        monthly_deposit: inputs.monthly_deposit,
        years: inputs.years,
        months,
        required_amount: total,
        required_amount_rounded: round_currency(total),
    }
}

impl InflationProjection {
    pub fn summary(&self) -> String {
        format!(
            "With an inflation of {}% each year, over a period of {} years, \
             just to not have lost any buying power, \
             your investment would need to be at least {}",
            self.annual_inflation_percent, self.years, self.required_amount_rounded
        )
    }
}
