use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

use super::fee_rules::{Fee, FeeGroup, FeeRule, FeeSchedule, RuleEffect};
use crate::amortization::{self, LoanInputs, MAX_PRINCIPAL, MONTHS_PER_YEAR};
use crate::error::MortgageCalcError;
use crate::format::round_currency;
use crate::types::*;
use crate::MortgageCalcResult;

/// Highest annual property tax rate accepted, in percent of value.
pub const MAX_PROPERTY_TAX_RATE_PERCENT: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Purchase and loan details for a closing-cost estimate.
/// The loan principal is derived as `property_value - down_payment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosingCostInputs {
    pub property_value: Money,
    pub down_payment: Money,
    pub annual_rate_percent: Percent,
    pub term_years: u32,
    pub property_type: PropertyType,
    pub property_state: PropertyState,
    pub loan_type: LoanType,
    /// Annual property tax as a percentage of property value.
    pub property_tax_rate_percent: Percent,
    pub monthly_homeowners_insurance: Money,
}

impl ClosingCostInputs {
    pub fn principal(&self) -> Money {
        self.property_value - self.down_payment
    }

    pub fn loan(&self) -> LoanInputs {
        LoanInputs::new(self.principal(), self.annual_rate_percent, self.term_years)
    }

    pub fn monthly_property_tax(&self) -> Money {
        self.property_value * (self.property_tax_rate_percent / dec!(100))
            / Decimal::from(MONTHS_PER_YEAR)
    }

    pub fn validate(&self) -> MortgageCalcResult<()> {
        if self.property_value <= Decimal::ZERO {
            return Err(MortgageCalcError::invalid(
                "property_value",
                "Property value must be positive",
            ));
        }
        if self.down_payment < Decimal::ZERO {
            return Err(MortgageCalcError::invalid(
                "down_payment",
                "Down payment cannot be negative",
            ));
        }
        if self.down_payment > self.property_value {
            return Err(MortgageCalcError::invalid(
                "down_payment",
                "Down payment cannot exceed property value",
            ));
        }
        if self.property_value > MAX_PRINCIPAL {
            return Err(MortgageCalcError::invalid(
                "property_value",
                format!("Property value must not exceed {MAX_PRINCIPAL}"),
            ));
        }
        if self.property_tax_rate_percent < Decimal::ZERO {
            return Err(MortgageCalcError::invalid(
                "property_tax_rate_percent",
                "Property tax rate cannot be negative",
            ));
        }
        if self.property_tax_rate_percent > MAX_PROPERTY_TAX_RATE_PERCENT {
            return Err(MortgageCalcError::invalid(
                "property_tax_rate_percent",
                "Property tax rate must not exceed 100%",
            ));
        }
        if self.monthly_homeowners_insurance < Decimal::ZERO {
            return Err(MortgageCalcError::invalid(
                "monthly_homeowners_insurance",
                "Homeowners insurance cannot be negative",
            ));
        }
        if self.monthly_homeowners_insurance > MAX_PRINCIPAL {
            return Err(MortgageCalcError::invalid(
                "monthly_homeowners_insurance",
                format!("Homeowners insurance must not exceed {MAX_PRINCIPAL}"),
            ));
        }
        self.loan().validate()
    }
}

/// Estimate request: inputs plus an optional fee schedule override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosingCostRequest {
    #[serde(flatten)]
    pub inputs: ClosingCostInputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_schedule: Option<FeeSchedule>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Itemised closing costs. Every fee is rounded to cents, so the totals
/// are exact sums of the listed amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosingCostBreakdown {
    pub lender_fees: BTreeMap<Fee, Money>,
    pub lender_fees_total: Money,
    pub third_party_fees: BTreeMap<Fee, Money>,
    pub third_party_fees_total: Money,
    pub total_closing_costs: Money,
    pub down_payment: Money,
    pub cash_to_close: Money,
    /// Rules that adjusted a fee, in schedule order.
    pub applied_rules: Vec<String>,
    pub notes: Vec<String>,
}

impl ClosingCostBreakdown {
    pub fn fee(&self, fee: Fee) -> Option<Money> {
        self.lender_fees
            .get(&fee)
            .or_else(|| self.third_party_fees.get(&fee))
            .copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosingCostEstimate {
    pub principal: Money,
    pub down_payment_percent: Percent,
    pub breakdown: ClosingCostBreakdown,
    pub closing_costs_percent_of_loan: Percent,
    pub monthly_principal_and_interest: Money,
    pub monthly_property_tax: Money,
    pub monthly_insurance: Money,
    pub estimated_monthly_piti: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Itemise closing costs for `inputs` under `schedule`. Pure: identical
/// inputs always produce an identical breakdown.
pub fn compute_closing_costs(
    inputs: &ClosingCostInputs,
    schedule: &FeeSchedule,
) -> MortgageCalcResult<ClosingCostBreakdown> {
    inputs.validate()?;
    schedule.validate()?;

    let matched: Vec<&FeeRule> = schedule
        .rules
        .iter()
        .filter(|rule| rule.when.matches(inputs))
        .collect();

    let mut applied_rules = Vec::new();
    let mut notes: Vec<String> = Vec::new();
    for rule in &matched {
        if schedule.definition(rule.fee).is_none() {
            warn!(
                rule = %rule.name,
                fee = rule.fee.label(),
                "rule matched but its fee is not in the schedule; skipped"
            );
            continue;
        }
        applied_rules.push(rule.name.clone());
        if let Some(note) = &rule.note {
            if !notes.contains(note) {
                notes.push(note.clone());
            }
        }
    }

    let mut lender_fees = BTreeMap::new();
    let mut third_party_fees = BTreeMap::new();

    for def in &schedule.fees {
        let rules: Vec<&&FeeRule> = matched.iter().filter(|r| r.fee == def.fee).collect();

        let rate_override = rules.iter().rev().find_map(|r| match r.effect {
            RuleEffect::SetRate(rate) => Some(rate),
            _ => None,
        });

        let overflow = || MortgageCalcError::NumericOverflow {
            context: def.fee.label().to_lowercase(),
        };
        let mut amount = def.basis.evaluate(inputs, rate_override).ok_or_else(overflow)?;
        for rule in &rules {
            match rule.effect {
                RuleEffect::Add(delta) => {
                    amount = amount.checked_add(delta).ok_or_else(overflow)?;
                }
                RuleEffect::Set(value) => amount = value,
                RuleEffect::SetRate(_) => {}
            }
        }
        let amount = round_currency(amount.max(Decimal::ZERO));

        match def.group {
            FeeGroup::Lender => lender_fees.insert(def.fee, amount),
            FeeGroup::ThirdParty => third_party_fees.insert(def.fee, amount),
        };
    }

    let lender_fees_total = checked_sum(lender_fees.values(), "lender fees total")?;
    let third_party_fees_total = checked_sum(third_party_fees.values(), "third-party fees total")?;
    let total_closing_costs = checked_sum(
        [lender_fees_total, third_party_fees_total].iter(),
        "total closing costs",
    )?;
    let cash_to_close = checked_sum(
        [total_closing_costs, inputs.down_payment].iter(),
        "cash to close",
    )?;

    debug!(
        state = ?inputs.property_state,
        property_type = ?inputs.property_type,
        loan_type = ?inputs.loan_type,
        rules = applied_rules.len(),
        %total_closing_costs,
        "computed closing costs"
    );

    Ok(ClosingCostBreakdown {
        lender_fees,
        lender_fees_total,
        third_party_fees,
        third_party_fees_total,
        total_closing_costs,
        down_payment: inputs.down_payment,
        cash_to_close,
        applied_rules,
        notes,
    })
}

fn checked_sum<'a>(
    mut amounts: impl Iterator<Item = &'a Money>,
    context: &str,
) -> MortgageCalcResult<Money> {
    amounts
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(*amount))
        .ok_or_else(|| MortgageCalcError::NumericOverflow {
            context: context.into(),
        })
}

/// Closing costs plus the loan figures shown alongside an estimate.
pub fn estimate_closing_costs(
    request: &ClosingCostRequest,
) -> MortgageCalcResult<ComputationOutput<ClosingCostEstimate>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let inputs = &request.inputs;

    let default_schedule;
    let schedule = match &request.fee_schedule {
        Some(custom) => {
            warnings.push("Custom fee schedule in use".into());
            custom
        }
        None => {
            default_schedule = FeeSchedule::default();
            &default_schedule
        }
    };

    let breakdown = compute_closing_costs(inputs, schedule)?;
    warnings.extend(breakdown.notes.iter().cloned());

    let principal = inputs.principal();
    let monthly_principal_and_interest = amortization::compute_monthly_payment(&inputs.loan())?;
    let monthly_property_tax = round_currency(inputs.monthly_property_tax());
    let monthly_insurance = round_currency(inputs.monthly_homeowners_insurance);

    let estimate = ClosingCostEstimate {
        principal,
        down_payment_percent: (inputs.down_payment / inputs.property_value * dec!(100)).round_dp(2),
        closing_costs_percent_of_loan: breakdown
            .total_closing_costs
            .checked_div(principal)
            .and_then(|share| share.checked_mul(dec!(100)))
            .ok_or_else(|| MortgageCalcError::NumericOverflow {
                context: "closing costs percent of loan".into(),
            })?
            .round_dp(2),
        monthly_principal_and_interest,
        monthly_property_tax,
        monthly_insurance,
        estimated_monthly_piti: monthly_principal_and_interest
            + monthly_property_tax
            + monthly_insurance,
        breakdown,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Closing Cost Estimate (rule-adjusted fee schedule)",
        &serde_json::json!({
            "property_value": inputs.property_value.to_string(),
            "down_payment": inputs.down_payment.to_string(),
            "property_state": inputs.property_state,
            "property_type": inputs.property_type,
            "loan_type": inputs.loan_type,
            "fee_rules": schedule.rules.len(),
        }),
        warnings,
        elapsed,
        estimate,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closing_costs::fee_rules::{FeeBasis, FeeDefinition, RuleCondition};
    use rust_decimal_macros::dec;

    fn california_purchase() -> ClosingCostInputs {
        ClosingCostInputs {
            property_value: dec!(350000),
            down_payment: dec!(50000),
            annual_rate_percent: dec!(4.5),
            term_years: 30,
            property_type: PropertyType::SingleFamily,
            property_state: PropertyState::CA,
            loan_type: LoanType::Conventional,
            property_tax_rate_percent: dec!(1.2),
            monthly_homeowners_insurance: dec!(100),
        }
    }

    #[test]
    fn test_principal_is_derived() {
        assert_eq!(california_purchase().principal(), dec!(300000));
    }

    #[test]
    fn test_california_breakdown() {
        let b = compute_closing_costs(&california_purchase(), &FeeSchedule::default()).unwrap();
        assert_eq!(b.fee(Fee::Origination), Some(dec!(3000)));
        assert_eq!(b.fee(Fee::TransferTaxes), Some(dec!(385.00)));
        assert_eq!(b.fee(Fee::TitleServices), Some(dec!(1800)));
        assert_eq!(b.fee(Fee::PrepaidInterest), Some(dec!(1109.59)));
        assert_eq!(b.fee(Fee::EscrowDeposit), Some(dec!(900)));
        assert_eq!(b.lender_fees_total, dec!(5225));
        assert_eq!(b.third_party_fees_total, dec!(5969.59));
        assert_eq!(b.total_closing_costs, dec!(11194.59));
        assert_eq!(b.cash_to_close, dec!(61194.59));
        assert_eq!(b.applied_rules, vec!["ca-title", "ca-transfer-tax"]);
    }

    #[test]
    fn test_down_payment_exceeds_value() {
        let mut inputs = california_purchase();
        inputs.down_payment = dec!(400000);
        match compute_closing_costs(&inputs, &FeeSchedule::default()) {
            Err(MortgageCalcError::InvalidInput { field, .. }) => assert_eq!(field, "down_payment"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_full_down_payment_leaves_no_loan() {
        let mut inputs = california_purchase();
        inputs.down_payment = inputs.property_value;
        assert!(compute_closing_costs(&inputs, &FeeSchedule::default()).is_err());
    }

    #[test]
    fn test_oversized_property_value_rejected() {
        let mut inputs = california_purchase();
        inputs.property_value = Decimal::from_scientific("5e28").unwrap();
        inputs.down_payment = inputs.property_value - dec!(300000);
        inputs.property_tax_rate_percent = dec!(5000);
        match compute_closing_costs(&inputs, &FeeSchedule::default()) {
            Err(MortgageCalcError::InvalidInput { field, .. }) => assert_eq!(field, "property_value"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_tax_rate_above_hundred_percent_rejected() {
        let mut inputs = california_purchase();
        inputs.property_tax_rate_percent = dec!(5000);
        match compute_closing_costs(&inputs, &FeeSchedule::default()) {
            Err(MortgageCalcError::InvalidInput { field, .. }) => {
                assert_eq!(field, "property_tax_rate_percent")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_amounts_overflow_as_error() {
        let schedule = FeeSchedule::default()
            .with_fee(FeeDefinition::new(
                Fee::HomeInspection,
                FeeGroup::ThirdParty,
                FeeBasis::Flat(Decimal::MAX),
            ))
            .with_rule(FeeRule::new(
                "inspection-surcharge",
                RuleCondition::StateIn(vec![PropertyState::CA]),
                Fee::HomeInspection,
                RuleEffect::Add(dec!(1)),
            ));
        match compute_closing_costs(&california_purchase(), &schedule) {
            Err(MortgageCalcError::NumericOverflow { context }) => {
                assert_eq!(context, "home inspection")
            }
            other => panic!("expected NumericOverflow, got {other:?}"),
        }
    }

    #[test]
    fn test_fee_totals_overflow_as_error() {
        let schedule = FeeSchedule::default().with_fee(FeeDefinition::new(
            Fee::HomeInspection,
            FeeGroup::ThirdParty,
            FeeBasis::Flat(Decimal::MAX),
        ));
        assert!(matches!(
            compute_closing_costs(&california_purchase(), &schedule),
            Err(MortgageCalcError::NumericOverflow { .. })
        ));
    }

    #[test]
    fn test_estimate_envelope() {
        let request = ClosingCostRequest {
            inputs: california_purchase(),
            fee_schedule: None,
        };
        let out = estimate_closing_costs(&request).unwrap();
        let e = &out.result;
        assert_eq!(e.monthly_principal_and_interest, dec!(1520.06));
        assert_eq!(e.monthly_property_tax, dec!(350.00));
        assert_eq!(e.estimated_monthly_piti, dec!(1970.06));
        assert_eq!(e.down_payment_percent, dec!(14.29));
        assert_eq!(e.closing_costs_percent_of_loan, dec!(3.73));
        assert!(out.warnings.is_empty());
    }
}
