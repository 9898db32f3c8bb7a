use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%).
pub type Rate = Decimal;

/// Rates expressed as percentages (4.5 = 4.5%), as entered on loan forms.
pub type Percent = Decimal;

/// Loan programme / product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanType {
    Conventional,
    Fha,
    Va,
    Usda,
    Jumbo,
}

impl LoanType {
    pub fn label(&self) -> &'static str {
        match self {
            LoanType::Conventional => "Conventional",
            LoanType::Fha => "FHA",
            LoanType::Va => "VA",
            LoanType::Usda => "USDA",
            LoanType::Jumbo => "Jumbo",
        }
    }
}

/// Collateral property type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    SingleFamily,
    Condo,
    Townhouse,
    MultiFamily,
}

/// States the desk originates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyState {
    CA,
    FL,
    NY,
    TX,
    IL,
    OH,
    PA,
    GA,
    NC,
    MI,
    NJ,
    VA,
    WA,
    AZ,
    CO,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&PropertyType::MultiFamily).unwrap(),
            "\"multi-family\""
        );
        assert_eq!(serde_json::to_string(&LoanType::Fha).unwrap(), "\"fha\"");
        let state: PropertyState = serde_json::from_str("\"NJ\"").unwrap();
        assert_eq!(state, PropertyState::NJ);
    }
}
