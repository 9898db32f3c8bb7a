use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_calc_core::amortization::{self, AmortizationInput, LoanInputs};

use crate::input;

/// Loan flags shared by `payment` and `schedule`.
#[derive(Args)]
pub struct LoanFlags {
    /// Amount financed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent (e.g. 6.5)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long, default_value_t = 30)]
    pub term_years: u32,
}

impl LoanFlags {
    fn to_loan(
        &self,
        first_payment_date: Option<NaiveDate>,
    ) -> Result<LoanInputs, Box<dyn std::error::Error>> {
        let principal = self
            .principal
            .ok_or("--principal is required (or provide --input)")?;
        let rate = self.rate.ok_or("--rate is required (or provide --input)")?;
        Ok(LoanInputs {
            principal,
            annual_rate_percent: rate,
            term_years: self.term_years,
            first_payment_date,
        })
    }
}

/// Arguments for the level monthly payment
#[derive(Args)]
pub struct PaymentArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanFlags,
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan: LoanInputs = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(loan) = input::stdin::read_stdin()? {
        loan
    } else {
        args.loan.to_loan(None)?
    };

    let result = amortization::analyze_payment(&loan)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanFlags,

    /// Due date of the first payment (YYYY-MM-DD); dates every row
    #[arg(long)]
    pub first_payment_date: Option<NaiveDate>,

    /// Only list the first N payments (totals still cover the full term)
    #[arg(long)]
    pub max_periods: Option<u32>,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: AmortizationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(request) = input::stdin::read_stdin()? {
        request
    } else {
        AmortizationInput {
            loan: args.loan.to_loan(args.first_payment_date)?,
            max_periods: None,
        }
    };
    if args.max_periods.is_some() {
        request.max_periods = args.max_periods;
    }

    let result = amortization::analyze_loan(&request)?;
    Ok(serde_json::to_value(result)?)
}
