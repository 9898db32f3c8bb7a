//! Engine configuration: the fee schedule, rate sheet and program catalog.
//!
//! Every section is optional on the wire and falls back to the built-in
//! tables, so a config file only needs to carry what it overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::MortgageCalcError;
use crate::MortgageCalcResult;

#[cfg(feature = "closing_costs")]
use crate::closing_costs::FeeSchedule;
#[cfg(feature = "loan_programs")]
use crate::loan_programs::{default_catalog, LoanProgram};
#[cfg(feature = "rate_comparison")]
use crate::rate_comparison::{default_rate_table, RateCandidate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[cfg(feature = "closing_costs")]
    pub fee_schedule: FeeSchedule,
    #[cfg(feature = "rate_comparison")]
    pub rate_table: Vec<RateCandidate>,
    #[cfg(feature = "loan_programs")]
    pub loan_programs: Vec<LoanProgram>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            #[cfg(feature = "closing_costs")]
            fee_schedule: FeeSchedule::default(),
            #[cfg(feature = "rate_comparison")]
            rate_table: default_rate_table(),
            #[cfg(feature = "loan_programs")]
            loan_programs: default_catalog(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(contents: &str) -> MortgageCalcResult<Self> {
        let config: EngineConfig = serde_json::from_str(contents)
            .map_err(|e| MortgageCalcError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MortgageCalcResult<()> {
        #[cfg(feature = "closing_costs")]
        self.fee_schedule.validate()?;

        #[cfg(feature = "rate_comparison")]
        {
            let mut ids = HashSet::new();
            for candidate in &self.rate_table {
                if !ids.insert(candidate.id) {
                    return Err(MortgageCalcError::invalid(
                        "rate_table",
                        format!("Duplicate rate candidate id {}", candidate.id),
                    ));
                }
                crate::amortization::LoanInputs::new(
                    rust_decimal::Decimal::ONE,
                    candidate.rate_percent,
                    candidate.term_years,
                )
                .validate()
                .map_err(|e| match e {
                    MortgageCalcError::InvalidInput { field, reason } => MortgageCalcError::invalid(
                        format!("rate_table[{}].{field}", candidate.id),
                        reason,
                    ),
                    other => other,
                })?;
            }
        }

        #[cfg(feature = "loan_programs")]
        {
            let mut ids = HashSet::new();
            for program in &self.loan_programs {
                if !ids.insert(program.id) {
                    return Err(MortgageCalcError::invalid(
                        "loan_programs",
                        format!("Duplicate loan program id {}", program.id),
                    ));
                }
                let range = &program.rate_range;
                if range.min.is_sign_negative() || range.min > range.max {
                    return Err(MortgageCalcError::invalid(
                        format!("loan_programs[{}].rate_range", program.id),
                        "Rate range must satisfy 0 <= min <= max",
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_builtins() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_malformed_document_is_config_error() {
        match EngineConfig::from_json_str("{ not json") {
            Err(MortgageCalcError::Config(_)) => {}
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[cfg(feature = "rate_comparison")]
    #[test]
    fn test_rate_table_override() {
        let config = EngineConfig::from_json_str(
            r#"{ "rate_table": [
                { "id": 1, "loan_type": "conventional", "term_years": 30, "rate_percent": "6.125" }
            ] }"#,
        )
        .unwrap();
        assert_eq!(config.rate_table.len(), 1);
        #[cfg(feature = "closing_costs")]
        assert_eq!(config.fee_schedule, FeeSchedule::default());
    }

    #[cfg(feature = "rate_comparison")]
    #[test]
    fn test_duplicate_rate_ids_rejected() {
        let mut config = EngineConfig::default();
        let first = config.rate_table[0].clone();
        config.rate_table.push(first);
        assert!(config.validate().is_err());
    }
}
