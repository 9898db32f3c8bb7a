use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_calc_core::config::EngineConfig;
use mortgage_calc_core::loan_programs::{match_programs, BorrowerProfile, LoanProgramSearch};

use super::parse_wire;
use crate::input;

/// Arguments for loan-program screening
#[derive(Args)]
pub struct LoanProgramArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Borrower credit score (300-850)
    #[arg(long)]
    pub credit_score: Option<u32>,

    /// Down payment as a percent of the purchase price
    #[arg(long)]
    pub down_payment_percent: Option<Decimal>,

    /// Requested loan amount
    #[arg(long)]
    pub loan_amount: Option<Decimal>,

    /// primary, secondary or investment
    #[arg(long, default_value = "primary")]
    pub property_use: String,

    /// Borrower has VA eligibility
    #[arg(long)]
    pub veteran: bool,

    /// Property is in a USDA-eligible rural area
    #[arg(long)]
    pub rural: bool,
}

pub fn run_loan_programs(
    args: LoanProgramArgs,
    engine: Option<&EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut search: LoanProgramSearch = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(search) = input::stdin::read_stdin()? {
        search
    } else {
        LoanProgramSearch {
            profile: BorrowerProfile {
                credit_score: args
                    .credit_score
                    .ok_or("--credit-score is required (or provide --input)")?,
                down_payment_percent: args
                    .down_payment_percent
                    .ok_or("--down-payment-percent is required (or provide --input)")?,
                loan_amount: args
                    .loan_amount
                    .ok_or("--loan-amount is required (or provide --input)")?,
                property_use: parse_wire("property-use", &args.property_use.to_lowercase())?,
                is_veteran: args.veteran,
                is_rural: args.rural,
            },
            programs: None,
        }
    };

    if search.programs.is_none() {
        search.programs = engine.map(|c| c.loan_programs.clone());
    }

    let result = match_programs(&search)?;
    Ok(serde_json::to_value(result)?)
}
