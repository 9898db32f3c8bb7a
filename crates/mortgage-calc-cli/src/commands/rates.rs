use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_calc_core::config::EngineConfig;
use mortgage_calc_core::rate_comparison::{analyze_rates, RateComparisonInput, RateFilter};

use super::parse_wire;
use crate::input;

/// Arguments for rate comparison
#[derive(Args)]
pub struct CompareRatesArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan amount to price every candidate at
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Only compare this loan type (conventional, fha, va, usda, jumbo)
    #[arg(long)]
    pub loan_type: Option<String>,

    /// Only compare this term in years
    #[arg(long)]
    pub term_years: Option<u32>,
}

pub fn run_compare_rates(
    args: CompareRatesArgs,
    engine: Option<&EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: RateComparisonInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(request) = input::stdin::read_stdin()? {
        request
    } else {
        let principal = args
            .principal
            .ok_or("--principal is required (or provide --input)")?;
        let loan_type = match args.loan_type.as_deref() {
            Some(t) => Some(parse_wire("loan-type", &t.to_lowercase())?),
            None => None,
        };
        RateComparisonInput {
            principal,
            candidates: None,
            filter: RateFilter {
                loan_type,
                term_years: args.term_years,
            },
        }
    };

    if request.candidates.is_none() {
        request.candidates = engine.map(|c| c.rate_table.clone());
    }

    let result = analyze_rates(&request)?;
    Ok(serde_json::to_value(result)?)
}
