use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_calc_core::closing_costs::{
    estimate_closing_costs, ClosingCostInputs, ClosingCostRequest, FeeSchedule,
};
use mortgage_calc_core::config::EngineConfig;

use super::parse_wire;
use crate::input;

/// Arguments for a closing-cost estimate
#[derive(Args)]
pub struct ClosingCostArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Purchase price / appraised value
    #[arg(long)]
    pub property_value: Option<Decimal>,

    /// Cash down payment
    #[arg(long)]
    pub down_payment: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long, default_value_t = 30)]
    pub term_years: u32,

    /// single-family, condo, townhouse or multi-family
    #[arg(long, default_value = "single-family")]
    pub property_type: String,

    /// Two-letter state code (e.g. CA)
    #[arg(long)]
    pub state: Option<String>,

    /// conventional, fha, va, usda or jumbo
    #[arg(long, default_value = "conventional")]
    pub loan_type: String,

    /// Annual property tax as a percent of value
    #[arg(long, default_value = "1.2")]
    pub property_tax_rate: Decimal,

    /// Monthly homeowners insurance premium
    #[arg(long, default_value = "100")]
    pub insurance: Decimal,
}

pub fn run_closing_costs(
    args: ClosingCostArgs,
    engine: Option<&EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: ClosingCostRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(request) = input::stdin::read_stdin()? {
        request
    } else {
        let property_value = args
            .property_value
            .ok_or("--property-value is required (or provide --input)")?;
        let state = args
            .state
            .as_deref()
            .ok_or("--state is required (or provide --input)")?;

        ClosingCostRequest {
            inputs: ClosingCostInputs {
                property_value,
                down_payment: args
                    .down_payment
                    .ok_or("--down-payment is required (or provide --input)")?,
                annual_rate_percent: args.rate.ok_or("--rate is required (or provide --input)")?,
                term_years: args.term_years,
                property_type: parse_wire("property-type", &args.property_type)?,
                property_state: parse_wire("state", &state.to_uppercase())?,
                loan_type: parse_wire("loan-type", &args.loan_type.to_lowercase())?,
                property_tax_rate_percent: args.property_tax_rate,
                monthly_homeowners_insurance: args.insurance,
            },
            fee_schedule: None,
        }
    };

    if request.fee_schedule.is_none() {
        request.fee_schedule = engine.map(|c| c.fee_schedule.clone());
    }

    let result = estimate_closing_costs(&request)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for printing the fee schedule
#[derive(Args)]
pub struct FeesArgs {
    /// Only list the adjustment rules
    #[arg(long)]
    pub rules: bool,
}

pub fn run_fees(
    args: FeesArgs,
    engine: Option<&EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule = match engine {
        Some(config) => config.fee_schedule.clone(),
        None => FeeSchedule::default(),
    };
    if args.rules {
        Ok(serde_json::to_value(&schedule.rules)?)
    } else {
        Ok(serde_json::to_value(&schedule)?)
    }
}
