pub mod amortization;
pub mod closing_costs;
pub mod loan_programs;
pub mod rates;

use serde::de::DeserializeOwned;

/// Parse a flag value by its wire name (`single-family`, `CA`, `fha`, ...).
pub(crate) fn parse_wire<T: DeserializeOwned>(
    flag: &str,
    value: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("--{flag}: unrecognised value '{value}'").into())
}
