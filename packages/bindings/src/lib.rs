use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Amortization
// ---------------------------------------------------------------------------

#[napi]
pub fn monthly_payment(input_json: String) -> NapiResult<String> {
    let input: mortgage_calc_core::amortization::LoanInputs =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        mortgage_calc_core::amortization::analyze_payment(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let input: mortgage_calc_core::amortization::AmortizationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        mortgage_calc_core::amortization::analyze_loan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Closing costs
// ---------------------------------------------------------------------------

#[napi]
pub fn closing_costs(input_json: String) -> NapiResult<String> {
    let input: mortgage_calc_core::closing_costs::ClosingCostRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = mortgage_calc_core::closing_costs::estimate_closing_costs(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// The built-in fee schedule, as a starting point for overrides.
#[napi]
pub fn default_fee_schedule() -> NapiResult<String> {
    let schedule = mortgage_calc_core::closing_costs::FeeSchedule::default();
    serde_json::to_string(&schedule).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Rates and programs
// ---------------------------------------------------------------------------

#[napi]
pub fn compare_rates(input_json: String) -> NapiResult<String> {
    let input: mortgage_calc_core::rate_comparison::RateComparisonInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        mortgage_calc_core::rate_comparison::analyze_rates(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn match_loan_programs(input_json: String) -> NapiResult<String> {
    let input: mortgage_calc_core::loan_programs::LoanProgramSearch =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        mortgage_calc_core::loan_programs::match_programs(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Format a decimal string as US currency (`$1,234.56`).
#[napi]
pub fn format_currency(amount: String) -> NapiResult<String> {
    let value = Decimal::from_str(amount.trim()).map_err(to_napi_error)?;
    Ok(mortgage_calc_core::format::format_currency(value))
}

/// Format a decimal percent string (`4.5` -> `4.500%`).
#[napi]
pub fn format_percent(value: String, places: u32) -> NapiResult<String> {
    let value = Decimal::from_str(value.trim()).map_err(to_napi_error)?;
    Ok(mortgage_calc_core::format::format_percent(value, places))
}
