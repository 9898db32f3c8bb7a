//! Loan-program matching.
//!
//! Screens a borrower against a catalog of loan programs on credit score,
//! down payment, loan amount, occupancy and program-specific eligibility
//! (VA service, USDA rural location). Matches carry an estimated 30-year
//! payment range across the program's quoted rate band.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::amortization::{compute_monthly_payment, LoanInputs};
use crate::error::MortgageCalcError;
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::MortgageCalcResult;

/// Term used for payment estimates on matched programs.
const ESTIMATE_TERM_YEARS: u32 = 30;

const MIN_CREDIT_SCORE: u32 = 300;
const MAX_CREDIT_SCORE: u32 = 850;

// ---------------------------------------------------------------------------
// Catalog types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramType {
    Conventional,
    Fha,
    Va,
    Usda,
    Jumbo,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateRange {
    pub min: Percent,
    pub max: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanProgram {
    pub id: u32,
    pub name: String,
    pub program_type: ProgramType,
    pub description: String,
    pub min_down_payment_percent: Percent,
    pub min_credit_score: u32,
    pub max_loan_amount: Money,
    pub rate_range: RateRange,
    #[serde(default)]
    pub primary_residence_only: bool,
    #[serde(default)]
    pub terms_available: Vec<String>,
    #[serde(default)]
    pub eligibility_requirements: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub considerations: Vec<String>,
    #[serde(default)]
    pub best_for: Vec<String>,
}

// ---------------------------------------------------------------------------
// Borrower / search types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyUse {
    #[default]
    Primary,
    Secondary,
    Investment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowerProfile {
    pub credit_score: u32,
    /// Down payment as a percentage of the purchase price.
    pub down_payment_percent: Percent,
    pub loan_amount: Money,
    #[serde(default)]
    pub property_use: PropertyUse,
    #[serde(default)]
    pub is_veteran: bool,
    #[serde(default)]
    pub is_rural: bool,
}

impl BorrowerProfile {
    pub fn validate(&self) -> MortgageCalcResult<()> {
        if !(MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&self.credit_score) {
            return Err(MortgageCalcError::invalid(
                "credit_score",
                format!("Credit score must be between {MIN_CREDIT_SCORE} and {MAX_CREDIT_SCORE}"),
            ));
        }
        if self.down_payment_percent < Decimal::ZERO || self.down_payment_percent >= dec!(100) {
            return Err(MortgageCalcError::invalid(
                "down_payment_percent",
                "Down payment must be at least 0% and below 100%",
            ));
        }
        if self.loan_amount <= Decimal::ZERO {
            return Err(MortgageCalcError::invalid(
                "loan_amount",
                "Loan amount must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanProgramSearch {
    #[serde(flatten)]
    pub profile: BorrowerProfile,
    /// Catalog to search; the built-in catalog when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programs: Option<Vec<LoanProgram>>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Why a program rejected the borrower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Ineligibility {
    CreditScoreBelowMinimum { required: u32, actual: u32 },
    DownPaymentBelowMinimum { required_percent: Percent, actual_percent: Percent },
    LoanAmountAboveMaximum { maximum: Money, requested: Money },
    PrimaryResidenceRequired,
    VeteranStatusRequired,
    RuralPropertyRequired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramEvaluation {
    pub program_id: u32,
    pub program_name: String,
    pub eligible: bool,
    pub reasons: Vec<Ineligibility>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramMatch {
    pub program: LoanProgram,
    /// 30-year payment at the bottom of the rate band.
    pub estimated_payment_low: Money,
    /// 30-year payment at the top of the rate band.
    pub estimated_payment_high: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramMatchOutput {
    pub matches: Vec<ProgramMatch>,
    pub rejections: Vec<ProgramEvaluation>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Programs offered by the desk.
pub fn default_catalog() -> Vec<LoanProgram> {
    vec![
        LoanProgram {
            id: 1,
            name: "Conventional 97".into(),
            program_type: ProgramType::Conventional,
            description: "A conventional loan option with a low down payment requirement.".into(),
            min_down_payment_percent: dec!(3),
            min_credit_score: 620,
            max_loan_amount: dec!(726200),
            rate_range: RateRange { min: dec!(6.5), max: dec!(7.25) },
            primary_residence_only: true,
            terms_available: strings(&["30-year fixed", "15-year fixed"]),
            eligibility_requirements: strings(&[
                "Credit score of 620 or higher",
                "Debt-to-income ratio below 45%",
                "Primary residence only",
                "First-time homebuyers or repeat buyers",
            ]),
            benefits: strings(&[
                "Low down payment option (3%)",
                "Private mortgage insurance (PMI) can be cancelled",
                "Flexible property options",
            ]),
            considerations: strings(&[
                "PMI required until 20% equity is reached",
                "Higher interest rates for lower credit scores",
                "Higher monthly payments with low down payment",
            ]),
            best_for: strings(&[
                "First-time homebuyers with good credit",
                "Buyers with limited savings for down payment",
                "Borrowers wanting to build equity quickly",
            ]),
        },
        LoanProgram {
            id: 2,
            name: "FHA 203(b)".into(),
            program_type: ProgramType::Fha,
            description: "Government-backed loan with flexible qualification requirements.".into(),
            min_down_payment_percent: dec!(3.5),
            min_credit_score: 580,
            max_loan_amount: dec!(472030),
            rate_range: RateRange { min: dec!(6.25), max: dec!(7.0) },
            primary_residence_only: true,
            terms_available: strings(&["30-year fixed", "15-year fixed"]),
            eligibility_requirements: strings(&[
                "Credit score of 580+ for 3.5% down",
                "Credit score of 500-579 for 10% down",
                "Debt-to-income ratio below 50%",
                "Primary residence only",
            ]),
            benefits: strings(&[
                "Lower credit score requirements",
                "Competitive interest rates",
                "Down payment can come from gifts",
            ]),
            considerations: strings(&[
                "Mortgage insurance premium (MIP) for the life of loan in most cases",
                "Upfront MIP fee (1.75% of loan amount)",
                "Property must meet minimum standards",
            ]),
            best_for: strings(&[
                "First-time homebuyers with lower credit scores",
                "Buyers with limited down payment funds",
                "Borrowers recovering from credit challenges",
            ]),
        },
        LoanProgram {
            id: 3,
            name: "VA Home Loan".into(),
            program_type: ProgramType::Va,
            description: "Loans for veterans, active military, and eligible spouses with no down payment required.".into(),
            min_down_payment_percent: dec!(0),
            min_credit_score: 620,
            max_loan_amount: dec!(726200),
            rate_range: RateRange { min: dec!(6.0), max: dec!(6.75) },
            primary_residence_only: true,
            terms_available: strings(&["30-year fixed", "15-year fixed"]),
            eligibility_requirements: strings(&[
                "VA eligibility based on service requirements",
                "Certificate of Eligibility (COE) required",
                "Credit score typically 620+ (lender specific)",
                "Primary residence only",
            ]),
            benefits: strings(&[
                "No down payment required",
                "No monthly mortgage insurance",
                "Competitive interest rates",
                "Limited closing costs",
            ]),
            considerations: strings(&[
                "VA funding fee required (unless exempt)",
                "Property must meet VA appraisal standards",
                "Some limitations on property types",
            ]),
            best_for: strings(&[
                "Eligible veterans and service members",
                "Military personnel with limited savings",
                "VA-eligible borrowers wanting to maximize buying power",
            ]),
        },
        LoanProgram {
            id: 4,
            name: "USDA Rural Development".into(),
            program_type: ProgramType::Usda,
            description: "Zero down payment loans for moderate-income buyers in eligible rural areas.".into(),
            min_down_payment_percent: dec!(0),
            min_credit_score: 640,
            max_loan_amount: dec!(336500),
            rate_range: RateRange { min: dec!(6.25), max: dec!(6.85) },
            primary_residence_only: true,
            terms_available: strings(&["30-year fixed"]),
            eligibility_requirements: strings(&[
                "Property must be in USDA-eligible rural area",
                "Household income within 115% of area median income",
                "Credit score typically 640+",
                "Primary residence only",
            ]),
            benefits: strings(&[
                "No down payment required",
                "Lower mortgage insurance costs than FHA",
                "Competitive interest rates",
            ]),
            considerations: strings(&[
                "Upfront guarantee fee (1% of loan amount)",
                "Annual fee (0.35% of outstanding balance)",
                "Income limits apply",
                "Geographic restrictions",
            ]),
            best_for: strings(&[
                "Moderate-income buyers in rural areas",
                "First-time homebuyers with limited savings",
                "Buyers wanting to purchase in smaller communities",
            ]),
        },
        LoanProgram {
            id: 5,
            name: "Jumbo Loan".into(),
            program_type: ProgramType::Jumbo,
            description: "Loans that exceed the conforming loan limits for higher-priced properties.".into(),
            min_down_payment_percent: dec!(10),
            min_credit_score: 700,
            max_loan_amount: dec!(2000000),
            rate_range: RateRange { min: dec!(6.75), max: dec!(7.5) },
            primary_residence_only: false,
            terms_available: strings(&["30-year fixed", "15-year fixed", "7/1 ARM", "10/1 ARM"]),
            eligibility_requirements: strings(&[
                "Credit score typically 700+",
                "Debt-to-income ratio below 43%",
                "Significant cash reserves (6-12 months)",
                "Higher income requirements",
            ]),
            benefits: strings(&[
                "Finance high-value properties",
                "Competitive rates for strong borrowers",
                "Various loan terms available",
            ]),
            considerations: strings(&[
                "Higher down payment requirements",
                "Stricter qualification standards",
                "More documentation required",
                "Higher closing costs",
            ]),
            best_for: strings(&[
                "High-income buyers in expensive markets",
                "Purchasers of luxury properties",
                "Borrowers with strong financial profiles",
            ]),
        },
    ]
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Check one program; every failing criterion is reported.
pub fn evaluate_program(profile: &BorrowerProfile, program: &LoanProgram) -> ProgramEvaluation {
    let mut reasons = Vec::new();

    if profile.credit_score < program.min_credit_score {
        reasons.push(Ineligibility::CreditScoreBelowMinimum {
            required: program.min_credit_score,
            actual: profile.credit_score,
        });
    }
    if profile.down_payment_percent < program.min_down_payment_percent {
        reasons.push(Ineligibility::DownPaymentBelowMinimum {
            required_percent: program.min_down_payment_percent,
            actual_percent: profile.down_payment_percent,
        });
    }
    if profile.loan_amount > program.max_loan_amount {
        reasons.push(Ineligibility::LoanAmountAboveMaximum {
            maximum: program.max_loan_amount,
            requested: profile.loan_amount,
        });
    }
    if program.primary_residence_only && profile.property_use != PropertyUse::Primary {
        reasons.push(Ineligibility::PrimaryResidenceRequired);
    }
    if program.program_type == ProgramType::Va && !profile.is_veteran {
        reasons.push(Ineligibility::VeteranStatusRequired);
    }
    if program.program_type == ProgramType::Usda && !profile.is_rural {
        reasons.push(Ineligibility::RuralPropertyRequired);
    }

    ProgramEvaluation {
        program_id: program.id,
        program_name: program.name.clone(),
        eligible: reasons.is_empty(),
        reasons,
    }
}

/// Screen the borrower against every program in the catalog.
pub fn match_programs(
    search: &LoanProgramSearch,
) -> MortgageCalcResult<ComputationOutput<ProgramMatchOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let profile = &search.profile;
    profile.validate()?;

    let catalog = match &search.programs {
        Some(programs) => programs.clone(),
        None => default_catalog(),
    };

    let mut matches = Vec::new();
    let mut rejections = Vec::new();

    for program in catalog {
        let evaluation = evaluate_program(profile, &program);
        if !evaluation.eligible {
            rejections.push(evaluation);
            continue;
        }
        let payment_at = |rate: Percent| {
            compute_monthly_payment(&LoanInputs::new(
                profile.loan_amount,
                rate,
                ESTIMATE_TERM_YEARS,
            ))
        };
        let estimated_payment_low = payment_at(program.rate_range.min)?;
        let estimated_payment_high = payment_at(program.rate_range.max)?;
        matches.push(ProgramMatch {
            program,
            estimated_payment_low,
            estimated_payment_high,
        });
    }

    if matches.is_empty() {
        warnings.push("No loan programs match the borrower profile".into());
    }

    debug!(
        credit_score = profile.credit_score,
        loan_amount = %profile.loan_amount,
        matched = matches.len(),
        rejected = rejections.len(),
        "screened loan programs"
    );

    let output = ProgramMatchOutput {
        matches,
        rejections,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Loan Program Eligibility Screen",
        &serde_json::json!({
            "credit_score": profile.credit_score,
            "down_payment_percent": profile.down_payment_percent.to_string(),
            "loan_amount": profile.loan_amount.to_string(),
            "estimate_term_years": ESTIMATE_TERM_YEARS,
        }),
        warnings,
        elapsed,
        output,
    ))
}
