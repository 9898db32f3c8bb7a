//! Side-by-side rate comparison.
//!
//! Re-prices each candidate product for a single principal using the level
//! payment from [`crate::amortization`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::amortization::{compute_totals, LoanInputs};
use crate::error::MortgageCalcError;
use crate::types::{with_metadata, ComputationOutput, LoanType, Money, Percent};
use crate::MortgageCalcResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A quoted product: loan type, term and note rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCandidate {
    pub id: u32,
    pub loan_type: LoanType,
    pub term_years: u32,
    pub rate_percent: Percent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apr_percent: Option<Percent>,
    /// Discount points (1 point = 1% of the loan).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_for: Option<String>,
}

impl RateCandidate {
    fn quoted(
        id: u32,
        loan_type: LoanType,
        term_years: u32,
        rate_percent: Decimal,
        apr_percent: Decimal,
        points: Decimal,
        best_for: &str,
    ) -> Self {
        RateCandidate {
            id,
            loan_type,
            term_years,
            rate_percent,
            apr_percent: Some(apr_percent),
            points: Some(points),
            best_for: Some(best_for.to_string()),
        }
    }
}

/// A candidate re-priced for a given principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    #[serde(flatten)]
    pub candidate: RateCandidate,
    pub monthly_payment: Money,
    pub total_payment: Money,
    pub total_interest: Money,
}

/// Narrows a rate table; `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_type: Option<LoanType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_years: Option<u32>,
}

impl RateFilter {
    pub fn matches(&self, candidate: &RateCandidate) -> bool {
        self.loan_type.map_or(true, |t| t == candidate.loan_type)
            && self.term_years.map_or(true, |y| y == candidate.term_years)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateComparisonInput {
    pub principal: Money,
    /// Rate table to compare; the built-in table when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<RateCandidate>>,
    #[serde(default)]
    pub filter: RateFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateComparisonOutput {
    pub quotes: Vec<RateQuote>,
    pub lowest_payment_id: Option<u32>,
    pub lowest_total_interest_id: Option<u32>,
}

// ---------------------------------------------------------------------------
// Rate table
// ---------------------------------------------------------------------------

/// Desk rate sheet used when no table is supplied.
pub fn default_rate_table() -> Vec<RateCandidate> {
    use LoanType::*;
    vec![
        RateCandidate::quoted(1, Conventional, 30, dec!(4.25), dec!(4.35), dec!(0), "Low monthly payments"),
        RateCandidate::quoted(2, Conventional, 15, dec!(3.75), dec!(3.85), dec!(0.25), "Faster equity building"),
        RateCandidate::quoted(3, Fha, 30, dec!(4.00), dec!(4.75), dec!(0), "Lower credit scores"),
        RateCandidate::quoted(4, Va, 30, dec!(3.75), dec!(3.95), dec!(0.5), "Military veterans"),
        RateCandidate::quoted(5, Jumbo, 30, dec!(4.50), dec!(4.65), dec!(0.75), "High-value properties"),
        RateCandidate::quoted(6, Conventional, 20, dec!(4.00), dec!(4.15), dec!(0.25), "Balance of term and interest"),
        RateCandidate::quoted(7, Usda, 30, dec!(3.85), dec!(4.35), dec!(0), "Rural properties"),
    ]
}

pub fn filter_candidates(candidates: &[RateCandidate], filter: &RateFilter) -> Vec<RateCandidate> {
    candidates
        .iter()
        .filter(|c| filter.matches(c))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Price every candidate for `principal`, preserving input order.
pub fn compare_rates(
    principal: Money,
    candidates: &[RateCandidate],
) -> MortgageCalcResult<Vec<RateQuote>> {
    candidates
        .iter()
        .map(|candidate| -> MortgageCalcResult<RateQuote> {
            let loan = LoanInputs::new(principal, candidate.rate_percent, candidate.term_years);
            let totals = compute_totals(&loan).map_err(|e| match e {
                MortgageCalcError::InvalidInput { field, reason } => MortgageCalcError::InvalidInput {
                    field: format!("candidates[{}].{field}", candidate.id),
                    reason,
                },
                other => other,
            })?;
            Ok(RateQuote {
                candidate: candidate.clone(),
                monthly_payment: totals.monthly_payment,
                total_payment: totals.total_payment,
                total_interest: totals.total_interest,
            })
        })
        .collect()
}

/// Filter the rate table, price it, and flag the cheapest options.
pub fn analyze_rates(
    input: &RateComparisonInput,
) -> MortgageCalcResult<ComputationOutput<RateComparisonOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let table_source = if input.candidates.is_some() {
        "supplied"
    } else {
        "default"
    };
    let table = match &input.candidates {
        Some(candidates) => candidates.clone(),
        None => default_rate_table(),
    };
    let selected = filter_candidates(&table, &input.filter);
    if selected.is_empty() {
        warnings.push("No rate candidates match the filter".into());
    }

    let quotes = compare_rates(input.principal, &selected)?;
    let lowest_payment_id = quotes
        .iter()
        .min_by_key(|q| q.monthly_payment)
        .map(|q| q.candidate.id);
    let lowest_total_interest_id = quotes
        .iter()
        .min_by_key(|q| q.total_interest)
        .map(|q| q.candidate.id);

    debug!(
        principal = %input.principal,
        candidates = table.len(),
        quoted = quotes.len(),
        "compared rates"
    );

    let output = RateComparisonOutput {
        quotes,
        lowest_payment_id,
        lowest_total_interest_id,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Rate Comparison (level payment per candidate)",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "filter": input.filter,
            "table": table_source,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jumbo_quote_matches_rate_sheet() {
        let table = default_rate_table();
        let jumbo: Vec<_> = table.into_iter().filter(|c| c.id == 5).collect();
        let quotes = compare_rates(dec!(300000), &jumbo).unwrap();
        assert_eq!(quotes[0].monthly_payment, dec!(1520.06));
        assert_eq!(quotes[0].total_interest, dec!(247221.60));
    }

    #[test]
    fn test_filter() {
        let table = default_rate_table();
        let filter = RateFilter {
            loan_type: Some(LoanType::Conventional),
            term_years: None,
        };
        let ids: Vec<u32> = filter_candidates(&table, &filter).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 6]);

        let filter = RateFilter {
            loan_type: None,
            term_years: Some(15),
        };
        assert_eq!(filter_candidates(&table, &filter).len(), 1);
        assert_eq!(filter_candidates(&table, &RateFilter::default()).len(), 7);
    }

    #[test]
    fn test_invalid_candidate_is_named() {
        let mut table = default_rate_table();
        table[2].term_years = 0;
        match compare_rates(dec!(300000), &table) {
            Err(MortgageCalcError::InvalidInput { field, .. }) => {
                assert_eq!(field, "candidates[3].term_years")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_filter_result_warns() {
        let input = RateComparisonInput {
            principal: dec!(300000),
            candidates: None,
            filter: RateFilter {
                loan_type: Some(LoanType::Va),
                term_years: Some(15),
            },
        };
        let out = analyze_rates(&input).unwrap();
        assert!(out.result.quotes.is_empty());
        assert_eq!(out.result.lowest_payment_id, None);
        assert_eq!(out.warnings.len(), 1);
    }
}
