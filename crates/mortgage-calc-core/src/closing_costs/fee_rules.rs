//! Closing-cost fee schedule: fee definitions plus named adjustment rules.
//!
//! Every fee starts from a basis (flat amount, percentage of loan or
//! property value, per-diem interest, escrow months). Rules keyed on state,
//! property type and loan type then adjust it. All matching rules apply, so
//! a jumbo multi-family loan in New York picks up every delta at once.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::estimator::ClosingCostInputs;
use crate::error::MortgageCalcError;
use crate::types::{LoanType, Money, PropertyState, PropertyType, Rate};
use crate::MortgageCalcResult;

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// Every fee an estimate can carry. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fee {
    Origination,
    Application,
    Underwriting,
    Processing,
    CreditReport,
    Appraisal,
    TitleServices,
    Survey,
    HomeInspection,
    Attorney,
    Recording,
    TransferTaxes,
    PrepaidInterest,
    EscrowDeposit,
}

impl Fee {
    pub fn label(&self) -> &'static str {
        match self {
            Fee::Origination => "Origination fee",
            Fee::Application => "Application fee",
            Fee::Underwriting => "Underwriting fee",
            Fee::Processing => "Processing fee",
            Fee::CreditReport => "Credit report fee",
            Fee::Appraisal => "Appraisal fee",
            Fee::TitleServices => "Title services",
            Fee::Survey => "Survey fee",
            Fee::HomeInspection => "Home inspection",
            Fee::Attorney => "Attorney fee",
            Fee::Recording => "Recording fees",
            Fee::TransferTaxes => "Transfer taxes",
            Fee::PrepaidInterest => "Prepaid interest",
            Fee::EscrowDeposit => "Escrow deposit",
        }
    }
}

/// Which subtotal a fee rolls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeGroup {
    Lender,
    ThirdParty,
}

/// How a fee's starting amount is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeBasis {
    Flat(Money),
    PercentOfLoan(Rate),
    PercentOfPropertyValue(Rate),
    /// `principal * annual rate / day_count * days`
    PrepaidInterest { days: u32, day_count: u32 },
    /// `months * (monthly property tax + monthly insurance)`
    EscrowDeposit { months: u32 },
}

impl FeeBasis {
    fn is_percentage(&self) -> bool {
        matches!(
            self,
            FeeBasis::PercentOfLoan(_) | FeeBasis::PercentOfPropertyValue(_)
        )
    }

    /// Unrounded amount, `None` on overflow. `rate_override` replaces the
    /// rate of a percentage basis.
    pub(crate) fn evaluate(
        &self,
        inputs: &ClosingCostInputs,
        rate_override: Option<Rate>,
    ) -> Option<Money> {
        match self {
            FeeBasis::Flat(amount) => Some(*amount),
            FeeBasis::PercentOfLoan(rate) => inputs
                .principal()
                .checked_mul(rate_override.unwrap_or(*rate)),
            FeeBasis::PercentOfPropertyValue(rate) => inputs
                .property_value
                .checked_mul(rate_override.unwrap_or(*rate)),
            FeeBasis::PrepaidInterest { days, day_count } => inputs
                .principal()
                .checked_mul(inputs.annual_rate_percent / dec!(100))
                .and_then(|yearly| yearly.checked_div(Decimal::from(*day_count)))
                .and_then(|daily| daily.checked_mul(Decimal::from(*days))),
            FeeBasis::EscrowDeposit { months } => inputs
                .monthly_property_tax()
                .checked_add(inputs.monthly_homeowners_insurance)
                .and_then(|monthly| monthly.checked_mul(Decimal::from(*months))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeDefinition {
    pub fee: Fee,
    pub group: FeeGroup,
    pub basis: FeeBasis,
}

impl FeeDefinition {
    pub fn new(fee: Fee, group: FeeGroup, basis: FeeBasis) -> Self {
        FeeDefinition { fee, group, basis }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    StateIn(Vec<PropertyState>),
    PropertyTypeIs(PropertyType),
    LoanTypeIs(LoanType),
}

impl RuleCondition {
    pub fn matches(&self, inputs: &ClosingCostInputs) -> bool {
        match self {
            RuleCondition::StateIn(states) => states.contains(&inputs.property_state),
            RuleCondition::PropertyTypeIs(t) => *t == inputs.property_type,
            RuleCondition::LoanTypeIs(t) => *t == inputs.loan_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleEffect {
    /// Add a flat amount.
    Add(Money),
    /// Replace the amount.
    Set(Money),
    /// Replace the rate of a percentage-based fee.
    SetRate(Rate),
}

/// A named adjustment applied when its condition matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRule {
    pub name: String,
    pub when: RuleCondition,
    pub fee: Fee,
    pub effect: RuleEffect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FeeRule {
    pub fn new(name: &str, when: RuleCondition, fee: Fee, effect: RuleEffect) -> Self {
        FeeRule {
            name: name.to_string(),
            when,
            fee,
            effect,
            note: None,
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Fee definitions and adjustment rules.
///
/// For each fee the last matching `SetRate` replaces the basis rate, then
/// `Set` and `Add` effects apply in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub fees: Vec<FeeDefinition>,
    #[serde(default)]
    pub rules: Vec<FeeRule>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        use FeeBasis::*;
        use FeeGroup::*;
        use PropertyState::{CA, FL, NJ, NY};
        use RuleCondition::*;
        use RuleEffect::*;

        let fees = vec![
            FeeDefinition::new(Fee::Origination, Lender, PercentOfLoan(dec!(0.01))),
            FeeDefinition::new(Fee::Application, Lender, Flat(dec!(500))),
            FeeDefinition::new(Fee::Underwriting, Lender, Flat(dec!(750))),
            FeeDefinition::new(Fee::Processing, Lender, Flat(dec!(450))),
            FeeDefinition::new(Fee::CreditReport, Lender, Flat(dec!(25))),
            FeeDefinition::new(Fee::Appraisal, Lender, Flat(dec!(500))),
            FeeDefinition::new(Fee::TitleServices, ThirdParty, Flat(dec!(1500))),
            FeeDefinition::new(Fee::Survey, ThirdParty, Flat(dec!(400))),
            FeeDefinition::new(Fee::HomeInspection, ThirdParty, Flat(dec!(450))),
            FeeDefinition::new(Fee::Attorney, ThirdParty, Flat(dec!(800))),
            FeeDefinition::new(Fee::Recording, ThirdParty, Flat(dec!(125))),
            FeeDefinition::new(
                Fee::TransferTaxes,
                ThirdParty,
                PercentOfPropertyValue(dec!(0.001)),
            ),
            FeeDefinition::new(
                Fee::PrepaidInterest,
                ThirdParty,
                PrepaidInterest {
                    days: 30,
                    day_count: 365,
                },
            ),
            FeeDefinition::new(Fee::EscrowDeposit, ThirdParty, EscrowDeposit { months: 2 }),
        ];

        let rules = vec![
            // State
            FeeRule::new("ny-nj-title", StateIn(vec![NY, NJ]), Fee::TitleServices, Add(dec!(500))),
            FeeRule::new("ny-nj-attorney", StateIn(vec![NY, NJ]), Fee::Attorney, Add(dec!(700))),
            FeeRule::new(
                "ny-nj-transfer-tax",
                StateIn(vec![NY, NJ]),
                Fee::TransferTaxes,
                SetRate(dec!(0.004)),
            ),
            FeeRule::new("ca-title", StateIn(vec![CA]), Fee::TitleServices, Add(dec!(300))),
            FeeRule::new(
                "ca-transfer-tax",
                StateIn(vec![CA]),
                Fee::TransferTaxes,
                SetRate(dec!(0.0011)),
            ),
            FeeRule::new("fl-title", StateIn(vec![FL]), Fee::TitleServices, Add(dec!(100))),
            FeeRule::new(
                "fl-transfer-tax",
                StateIn(vec![FL]),
                Fee::TransferTaxes,
                SetRate(dec!(0.007)),
            ),
            // Property type
            FeeRule::new(
                "condo-survey",
                PropertyTypeIs(PropertyType::Condo),
                Fee::Survey,
                Set(Decimal::ZERO),
            ),
            FeeRule::new(
                "multi-family-appraisal",
                PropertyTypeIs(PropertyType::MultiFamily),
                Fee::Appraisal,
                Add(dec!(300)),
            ),
            FeeRule::new(
                "multi-family-survey",
                PropertyTypeIs(PropertyType::MultiFamily),
                Fee::Survey,
                Add(dec!(200)),
            ),
            // Loan type
            FeeRule::new(
                "fha-underwriting",
                LoanTypeIs(LoanType::Fha),
                Fee::Underwriting,
                Add(dec!(150)),
            ),
            FeeRule::new(
                "va-underwriting",
                LoanTypeIs(LoanType::Va),
                Fee::Underwriting,
                Add(dec!(100)),
            )
            .with_note("VA funding fee is not included; it varies with service history and down payment"),
            FeeRule::new(
                "jumbo-appraisal",
                LoanTypeIs(LoanType::Jumbo),
                Fee::Appraisal,
                Add(dec!(250)),
            ),
            FeeRule::new(
                "jumbo-underwriting",
                LoanTypeIs(LoanType::Jumbo),
                Fee::Underwriting,
                Add(dec!(200)),
            ),
        ];

        FeeSchedule { fees, rules }
    }
}

impl FeeSchedule {
    pub fn definition(&self, fee: Fee) -> Option<&FeeDefinition> {
        self.fees.iter().find(|d| d.fee == fee)
    }

    pub fn rule(&self, name: &str) -> Option<&FeeRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Replace the definition of the same fee, or append it.
    pub fn with_fee(mut self, definition: FeeDefinition) -> Self {
        match self.fees.iter_mut().find(|d| d.fee == definition.fee) {
            Some(existing) => *existing = definition,
            None => self.fees.push(definition),
        }
        self
    }

    /// Replace the rule with the same name in place, or append it.
    pub fn with_rule(mut self, rule: FeeRule) -> Self {
        match self.rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        self
    }

    pub fn without_rule(mut self, name: &str) -> Self {
        self.rules.retain(|r| r.name != name);
        self
    }

    /// Every amount and rate must be non-negative, fees and rule names
    /// unique, and `SetRate` may only target percentage-based fees.
    /// Rules targeting a fee the schedule does not define are allowed and
    /// skipped at evaluation time.
    pub fn validate(&self) -> MortgageCalcResult<()> {
        let mut seen_fees = HashSet::new();
        for def in &self.fees {
            if !seen_fees.insert(def.fee) {
                return Err(MortgageCalcError::invalid(
                    "fee_schedule.fees",
                    format!("{} is defined more than once", def.fee.label()),
                ));
            }
            let field = format!("fee_schedule.fees.{}", def.fee.label());
            match &def.basis {
                FeeBasis::Flat(v) | FeeBasis::PercentOfLoan(v) | FeeBasis::PercentOfPropertyValue(v)
                    if *v < Decimal::ZERO =>
                {
                    return Err(MortgageCalcError::invalid(field, "Amount or rate cannot be negative"));
                }
                FeeBasis::PrepaidInterest { day_count: 0, .. } => {
                    return Err(MortgageCalcError::invalid(field, "Day count must be > 0"));
                }
                _ => {}
            }
        }

        let mut seen_rules = HashSet::new();
        for rule in &self.rules {
            let field = format!("fee_schedule.rules.{}", rule.name);
            if rule.name.trim().is_empty() {
                return Err(MortgageCalcError::invalid("fee_schedule.rules", "Rule name cannot be empty"));
            }
            if !seen_rules.insert(rule.name.as_str()) {
                return Err(MortgageCalcError::invalid(field, "Rule name is not unique"));
            }
            if let RuleCondition::StateIn(states) = &rule.when {
                if states.is_empty() {
                    return Err(MortgageCalcError::invalid(field, "State list cannot be empty"));
                }
            }
            match rule.effect {
                RuleEffect::Add(v) | RuleEffect::Set(v) | RuleEffect::SetRate(v) if v < Decimal::ZERO => {
                    return Err(MortgageCalcError::invalid(field, "Adjustment cannot be negative"));
                }
                RuleEffect::SetRate(_) => {
                    if let Some(def) = self.definition(rule.fee) {
                        if !def.basis.is_percentage() {
                            return Err(MortgageCalcError::invalid(
                                field,
                                format!("{} is not percentage-based", rule.fee.label()),
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
