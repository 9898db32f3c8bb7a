//! Fixed-rate mortgage amortization.
//!
//! Level monthly payment from the standard annuity formula, a lazily
//! generated payment schedule rounded to cents, and lifetime totals. The
//! final scheduled payment absorbs accumulated rounding so the balance
//! lands exactly on zero. All math in `rust_decimal::Decimal`.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;
use std::time::Instant;
use tracing::debug;

use crate::error::MortgageCalcError;
use crate::format::round_currency;
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate};
use crate::MortgageCalcResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MONTHS_PER_YEAR: u32 = 12;

/// Longest term accepted, in years.
pub const MAX_TERM_YEARS: u32 = 50;

/// Highest nominal annual rate accepted, in percent.
pub const MAX_ANNUAL_RATE_PERCENT: Decimal = dec!(100);

/// Largest principal accepted. Keeps every intermediate product well inside
/// the 96-bit decimal range.
pub const MAX_PRINCIPAL: Decimal = dec!(1_000_000_000_000);

/// Smallest principal repaid in any month while a balance is outstanding.
const MIN_PRINCIPAL_PAYMENT: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Loan parameters shared by every amortization calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanInputs {
    /// Amount financed.
    pub principal: Money,
    /// Nominal annual interest rate in percent (4.5 = 4.5%).
    pub annual_rate_percent: Percent,
    /// Amortization term in years.
    pub term_years: u32,
    /// Due date of the first payment; dates every schedule row when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_payment_date: Option<NaiveDate>,
}

impl LoanInputs {
    pub fn new(principal: Money, annual_rate_percent: Percent, term_years: u32) -> Self {
        LoanInputs {
            principal,
            annual_rate_percent,
            term_years,
            first_payment_date: None,
        }
    }

    /// Reject inputs the annuity formula cannot price.
    pub fn validate(&self) -> MortgageCalcResult<()> {
        if self.principal <= Decimal::ZERO {
            return Err(MortgageCalcError::invalid(
                "principal",
                "Loan principal must be positive",
            ));
        }
        if self.principal > MAX_PRINCIPAL {
            return Err(MortgageCalcError::invalid(
                "principal",
                format!("Loan principal must not exceed {MAX_PRINCIPAL}"),
            ));
        }
        if self.annual_rate_percent < Decimal::ZERO {
            return Err(MortgageCalcError::invalid(
                "annual_rate_percent",
                "Interest rate cannot be negative",
            ));
        }
        if self.annual_rate_percent > MAX_ANNUAL_RATE_PERCENT {
            return Err(MortgageCalcError::invalid(
                "annual_rate_percent",
                "Interest rate must not exceed 100%",
            ));
        }
        if self.term_years == 0 {
            return Err(MortgageCalcError::invalid(
                "term_years",
                "Loan term must be at least 1 year",
            ));
        }
        if self.term_years > MAX_TERM_YEARS {
            return Err(MortgageCalcError::invalid(
                "term_years",
                format!("Loan term must not exceed {MAX_TERM_YEARS} years"),
            ));
        }
        Ok(())
    }

    /// Monthly rate as a decimal: `annual% / 100 / 12`.
    pub fn periodic_rate(&self) -> Rate {
        self.annual_rate_percent / dec!(100) / Decimal::from(MONTHS_PER_YEAR)
    }

    /// Number of monthly payments over the full term.
    pub fn total_periods(&self) -> u32 {
        self.term_years * MONTHS_PER_YEAR
    }
}

/// Request for a full loan analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationInput {
    #[serde(flatten)]
    pub loan: LoanInputs,
    /// Rows to include in the returned schedule; full term when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_periods: Option<u32>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One month of the amortization schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationRow {
    /// 1-based month number.
    pub period: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
    pub payment_amount: Money,
    pub principal_component: Money,
    pub interest_component: Money,
    pub remaining_balance: Money,
}

/// Lifetime payment totals at the level monthly payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTotals {
    pub monthly_payment: Money,
    pub number_of_payments: u32,
    pub total_payment: Money,
    pub total_interest: Money,
}

/// Full loan analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationOutput {
    pub monthly_payment: Money,
    pub number_of_payments: u32,
    /// Level payment times number of payments.
    pub total_payment: Money,
    pub total_interest: Money,
    /// Sum of scheduled payments, including the final-payment correction.
    pub schedule_total_payment: Money,
    pub schedule_total_interest: Money,
    pub final_payment: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payoff_date: Option<NaiveDate>,
    pub schedule: Vec<AmortizationRow>,
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

/// Level monthly payment rounded to cents.
pub fn compute_monthly_payment(inputs: &LoanInputs) -> MortgageCalcResult<Money> {
    inputs.validate()?;
    let payment = round_currency(level_payment(
        inputs.principal,
        inputs.periodic_rate(),
        inputs.total_periods(),
    )?);
    debug!(
        principal = %inputs.principal,
        rate = %inputs.annual_rate_percent,
        term_years = inputs.term_years,
        %payment,
        "computed monthly payment"
    );
    Ok(payment)
}

/// Unrounded annuity payment `P * r(1+r)^n / ((1+r)^n - 1)`, evaluated as
/// `P * r / (1 - (1+r)^-n)` so the principal is never multiplied by the
/// growth factor. A zero rate pays the principal down in equal parts.
pub(crate) fn level_payment(principal: Money, rate: Rate, periods: u32) -> MortgageCalcResult<Money> {
    if periods == 0 {
        return Err(MortgageCalcError::invalid(
            "periods",
            "Number of periods must be > 0",
        ));
    }
    let n = Decimal::from(periods);
    if rate.is_zero() {
        return Ok(principal / n);
    }

    let growth = (Decimal::ONE + rate)
        .checked_powi(i64::from(periods))
        .ok_or_else(|| MortgageCalcError::NumericOverflow {
            context: "compound growth factor (1 + r)^n".into(),
        })?;
    let discount = Decimal::ONE
        .checked_div(growth)
        .ok_or_else(|| MortgageCalcError::DivisionByZero {
            context: "compound growth factor".into(),
        })?;
    let annuity_denominator = Decimal::ONE - discount;

    // Rates below decimal resolution leave 1 + r == 1.
    if annuity_denominator.is_zero() {
        debug!(%rate, "periodic rate below decimal resolution; using straight-line payment");
        return Ok(principal / n);
    }

    principal
        .checked_mul(rate)
        .and_then(|interest| interest.checked_div(annuity_denominator))
        .ok_or_else(|| MortgageCalcError::NumericOverflow {
            context: "annuity payment".into(),
        })
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// A restartable amortization schedule. Rows are produced on iteration;
/// iterating twice yields identical rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AmortizationSchedule {
    principal: Money,
    periodic_rate: Rate,
    payment: Money,
    total_periods: u32,
    periods: u32,
    first_payment_date: Option<NaiveDate>,
}

impl AmortizationSchedule {
    pub fn monthly_payment(&self) -> Money {
        self.payment
    }

    /// Payments over the full term, regardless of how many rows are produced.
    pub fn total_periods(&self) -> u32 {
        self.total_periods
    }

    pub fn len(&self) -> usize {
        self.periods as usize
    }

    pub fn is_empty(&self) -> bool {
        self.periods == 0
    }

    pub fn iter(&self) -> ScheduleIter<'_> {
        ScheduleIter {
            schedule: self,
            next_period: 1,
            balance: self.principal,
        }
    }

    pub fn rows(&self) -> Vec<AmortizationRow> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &'a AmortizationSchedule {
    type Item = AmortizationRow;
    type IntoIter = ScheduleIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the rows of an [`AmortizationSchedule`].
#[derive(Debug, Clone)]
pub struct ScheduleIter<'a> {
    schedule: &'a AmortizationSchedule,
    next_period: u32,
    balance: Money,
}

impl Iterator for ScheduleIter<'_> {
    type Item = AmortizationRow;

    fn next(&mut self) -> Option<AmortizationRow> {
        let s = self.schedule;
        if self.next_period > s.periods {
            return None;
        }
        let period = self.next_period;
        self.next_period += 1;

        let interest = round_currency(self.balance * s.periodic_rate);
        // A level payment that rounds to the interest would stall the balance.
        let mut principal = (s.payment - interest).max(MIN_PRINCIPAL_PAYMENT);
        if period == s.total_periods || principal > self.balance {
            principal = self.balance;
        }
        self.balance -= principal;

        let payment_date = s
            .first_payment_date
            .and_then(|d| d.checked_add_months(Months::new(period - 1)));

        Some(AmortizationRow {
            period,
            payment_date,
            payment_amount: principal + interest,
            principal_component: principal,
            interest_component: interest,
            remaining_balance: self.balance,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.schedule.periods + 1).saturating_sub(self.next_period) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ScheduleIter<'_> {}

impl FusedIterator for ScheduleIter<'_> {}

/// Build a schedule covering the first `min(max_periods, term * 12)` months.
pub fn generate_schedule(
    inputs: &LoanInputs,
    max_periods: u32,
) -> MortgageCalcResult<AmortizationSchedule> {
    let payment = compute_monthly_payment(inputs)?;
    let total_periods = inputs.total_periods();
    Ok(AmortizationSchedule {
        principal: round_currency(inputs.principal),
        periodic_rate: inputs.periodic_rate(),
        payment,
        total_periods,
        periods: max_periods.min(total_periods),
        first_payment_date: inputs.first_payment_date,
    })
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Lifetime totals: `payment * n` and `payment * n - principal`.
pub fn compute_totals(inputs: &LoanInputs) -> MortgageCalcResult<LoanTotals> {
    let monthly_payment = compute_monthly_payment(inputs)?;
    let number_of_payments = inputs.total_periods();
    let total_payment = monthly_payment * Decimal::from(number_of_payments);
    Ok(LoanTotals {
        monthly_payment,
        number_of_payments,
        total_payment,
        total_interest: total_payment - inputs.principal,
    })
}

/// Level payment and lifetime totals in the standard envelope.
pub fn analyze_payment(inputs: &LoanInputs) -> MortgageCalcResult<ComputationOutput<LoanTotals>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let totals = compute_totals(inputs)?;
    if inputs.annual_rate_percent.is_zero() {
        warnings.push("Zero interest rate: payment is principal divided by number of payments".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fixed-Rate Level Payment (annuity formula)",
        &serde_json::json!({
            "principal": inputs.principal.to_string(),
            "annual_rate_percent": inputs.annual_rate_percent.to_string(),
            "term_years": inputs.term_years,
            "compounding": "monthly",
            "rounding": "cents, half away from zero",
        }),
        warnings,
        elapsed,
        totals,
    ))
}

/// Payment, totals and schedule in one envelope.
pub fn analyze_loan(
    input: &AmortizationInput,
) -> MortgageCalcResult<ComputationOutput<AmortizationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let loan = &input.loan;
    let totals = compute_totals(loan)?;
    let full = generate_schedule(loan, totals.number_of_payments)?;

    if loan.annual_rate_percent.is_zero() {
        warnings.push("Zero interest rate: payment is principal divided by number of payments".into());
    }

    let mut schedule_total_payment = Decimal::ZERO;
    let mut schedule_total_interest = Decimal::ZERO;
    let mut last: Option<AmortizationRow> = None;
    let mut rows = Vec::new();
    let keep = input.max_periods.unwrap_or(totals.number_of_payments) as usize;

    for (i, row) in full.iter().enumerate() {
        schedule_total_payment += row.payment_amount;
        schedule_total_interest += row.interest_component;
        if i < keep {
            rows.push(row.clone());
        }
        last = Some(row);
    }

    if keep < totals.number_of_payments as usize {
        warnings.push(format!(
            "Schedule truncated to {} of {} payments",
            keep, totals.number_of_payments
        ));
    }

    let final_payment = last
        .as_ref()
        .map(|r| r.payment_amount)
        .unwrap_or(Decimal::ZERO);
    if final_payment != totals.monthly_payment {
        warnings.push(format!(
            "Final payment adjusted to {final_payment} to absorb rounding"
        ));
    }

    let output = AmortizationOutput {
        monthly_payment: totals.monthly_payment,
        number_of_payments: totals.number_of_payments,
        total_payment: totals.total_payment,
        total_interest: totals.total_interest,
        schedule_total_payment,
        schedule_total_interest,
        final_payment,
        payoff_date: last.and_then(|r| r.payment_date),
        schedule: rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fixed-Rate Level Payment Amortization",
        &serde_json::json!({
            "principal": loan.principal.to_string(),
            "annual_rate_percent": loan.annual_rate_percent.to_string(),
            "term_years": loan.term_years,
            "compounding": "monthly",
            "rounding": "cents, half away from zero; final payment absorbs residual",
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn standard_loan() -> LoanInputs {
        LoanInputs::new(dec!(300000), dec!(4.5), 30)
    }

    #[test]
    fn test_monthly_payment_30_year() {
        let payment = compute_monthly_payment(&standard_loan()).unwrap();
        assert_eq!(payment, dec!(1520.06));
    }

    #[test]
    fn test_zero_rate_payment() {
        let loan = LoanInputs::new(dec!(120000), Decimal::ZERO, 10);
        assert_eq!(compute_monthly_payment(&loan).unwrap(), dec!(1000.00));
    }

    #[test]
    fn test_near_zero_rate_converges() {
        let loan = LoanInputs::new(dec!(120000), dec!(0.00001), 10);
        let payment = compute_monthly_payment(&loan).unwrap();
        assert!((payment - dec!(1000)).abs() <= dec!(0.01));
    }

    #[test]
    fn test_validation_errors() {
        let mut loan = standard_loan();
        loan.principal = Decimal::ZERO;
        assert!(compute_monthly_payment(&loan).is_err());

        let mut loan = standard_loan();
        loan.annual_rate_percent = dec!(-1);
        assert!(compute_monthly_payment(&loan).is_err());

        let mut loan = standard_loan();
        loan.annual_rate_percent = dec!(100.01);
        assert!(compute_monthly_payment(&loan).is_err());

        let mut loan = standard_loan();
        loan.term_years = 0;
        match compute_monthly_payment(&loan) {
            Err(MortgageCalcError::InvalidInput { field, .. }) => assert_eq!(field, "term_years"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_extreme_rate_and_term_do_not_overflow() {
        let loan = LoanInputs::new(MAX_PRINCIPAL, dec!(100), MAX_TERM_YEARS);
        let payment = compute_monthly_payment(&loan).unwrap();
        // Nearly interest-only at 100% over 50 years
        assert!(payment >= round_currency(MAX_PRINCIPAL / dec!(12)));
    }

    #[test]
    fn test_schedule_first_rows() {
        let schedule = generate_schedule(&standard_loan(), 12).unwrap();
        let rows = schedule.rows();
        assert_eq!(rows.len(), 12);

        assert_eq!(rows[0].period, 1);
        assert_eq!(rows[0].interest_component, dec!(1125.00));
        assert_eq!(rows[0].principal_component, dec!(395.06));
        assert_eq!(rows[0].remaining_balance, dec!(299604.94));

        assert_eq!(rows[1].interest_component, dec!(1123.52));
        assert_eq!(rows[1].principal_component, dec!(396.54));
        assert_eq!(rows[1].remaining_balance, dec!(299208.40));
    }

    #[test]
    fn test_final_payment_absorbs_rounding() {
        let loan = LoanInputs::new(dec!(100000), dec!(5), 1);
        let rows = generate_schedule(&loan, 12).unwrap().rows();
        let last = rows.last().unwrap();
        assert_eq!(last.period, 12);
        assert_eq!(last.principal_component, dec!(8525.21));
        assert_eq!(last.interest_component, dec!(35.52));
        assert_eq!(last.payment_amount, dec!(8560.73));
        assert_eq!(last.remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_tiny_principal_still_amortizes() {
        let loan = LoanInputs::new(dec!(1), dec!(18), 30);
        let schedule = generate_schedule(&loan, 360).unwrap();
        assert_eq!(schedule.monthly_payment(), dec!(0.02));

        let rows = schedule.rows();
        assert_eq!(rows[0].interest_component, dec!(0.02));
        assert_eq!(rows[0].principal_component, dec!(0.01));
        assert_eq!(rows[0].remaining_balance, dec!(0.99));
        assert_eq!(rows[82].remaining_balance, dec!(0.01));
        assert_eq!(rows[83].remaining_balance, Decimal::ZERO);
        assert!(rows[84..].iter().all(|r| r.payment_amount.is_zero()));
    }

    #[test]
    fn test_schedule_is_restartable() {
        let schedule = generate_schedule(&standard_loan(), 360).unwrap();
        let first: Vec<_> = schedule.iter().collect();
        let second: Vec<_> = (&schedule).into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_schedule_truncation_and_size_hint() {
        let schedule = generate_schedule(&standard_loan(), 1000).unwrap();
        assert_eq!(schedule.len(), 360);

        let short = generate_schedule(&standard_loan(), 3).unwrap();
        let mut iter = short.iter();
        assert_eq!(iter.len(), 3);
        iter.next();
        assert_eq!(iter.len(), 2);
        iter.next();
        iter.next();
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());

        assert!(generate_schedule(&standard_loan(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_payment_dates() {
        let mut loan = LoanInputs::new(dec!(10000), dec!(6), 2);
        loan.first_payment_date = NaiveDate::from_ymd_opt(2025, 1, 31);
        let rows = generate_schedule(&loan, 24).unwrap().rows();
        assert_eq!(rows[0].payment_date, NaiveDate::from_ymd_opt(2025, 1, 31));
        assert_eq!(rows[1].payment_date, NaiveDate::from_ymd_opt(2025, 2, 28));
        assert_eq!(rows[12].payment_date, NaiveDate::from_ymd_opt(2026, 1, 31));
    }

    #[test]
    fn test_totals() {
        let totals = compute_totals(&standard_loan()).unwrap();
        assert_eq!(totals.number_of_payments, 360);
        assert_eq!(totals.total_payment, dec!(547221.60));
        assert_eq!(totals.total_interest, dec!(247221.60));
    }

    #[test]
    fn test_analyze_payment_envelope() {
        let out = analyze_payment(&standard_loan()).unwrap();
        assert_eq!(out.result, compute_totals(&standard_loan()).unwrap());
        assert!(out.methodology.contains("Level Payment"));
        assert_eq!(out.assumptions["term_years"], 30);
        assert!(out.warnings.is_empty());

        let zero = analyze_payment(&LoanInputs::new(dec!(120000), Decimal::ZERO, 10)).unwrap();
        assert_eq!(zero.result.monthly_payment, dec!(1000.00));
        assert_eq!(zero.warnings.len(), 1);
    }

    #[test]
    fn test_analyze_loan_envelope() {
        let input = AmortizationInput {
            loan: standard_loan(),
            max_periods: Some(12),
        };
        let out = analyze_loan(&input).unwrap();
        let r = &out.result;
        assert_eq!(r.schedule.len(), 12);
        assert_eq!(r.monthly_payment, dec!(1520.06));
        assert_eq!(r.final_payment, dec!(1516.71));
        assert_eq!(r.schedule_total_payment - r.schedule_total_interest, dec!(300000));
        assert!(out.warnings.iter().any(|w| w.contains("truncated")));
    }
}
