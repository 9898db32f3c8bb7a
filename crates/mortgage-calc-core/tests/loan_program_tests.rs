#![cfg(feature = "loan_programs")]

use mortgage_calc_core::loan_programs::{
    default_catalog, evaluate_program, match_programs, BorrowerProfile, Ineligibility,
    LoanProgramSearch, PropertyUse,
};
use mortgage_calc_core::MortgageCalcError;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn rural_veteran() -> BorrowerProfile {
    BorrowerProfile {
        credit_score: 650,
        down_payment_percent: dec!(0),
        loan_amount: dec!(300000),
        property_use: PropertyUse::Primary,
        is_veteran: true,
        is_rural: true,
    }
}

#[test]
fn test_zero_down_veteran_in_rural_area() {
    let search = LoanProgramSearch {
        profile: rural_veteran(),
        programs: None,
    };
    let out = match_programs(&search).unwrap();

    let ids: Vec<u32> = out.result.matches.iter().map(|m| m.program.id).collect();
    assert_eq!(ids, vec![3, 4]);

    let va = &out.result.matches[0];
    assert_eq!(va.estimated_payment_low, dec!(1798.65));
    assert_eq!(va.estimated_payment_high, dec!(1945.79));
    let usda = &out.result.matches[1];
    assert_eq!(usda.estimated_payment_low, dec!(1847.15));
    assert_eq!(usda.estimated_payment_high, dec!(1965.78));

    let rejected: Vec<u32> = out.result.rejections.iter().map(|r| r.program_id).collect();
    assert_eq!(rejected, vec![1, 2, 5]);
    assert!(out.warnings.is_empty());
}

#[test]
fn test_jumbo_rejection_lists_every_shortfall() {
    let catalog = default_catalog();
    let jumbo = catalog.iter().find(|p| p.id == 5).unwrap();
    let eval = evaluate_program(&rural_veteran(), jumbo);
    assert_eq!(
        eval.reasons,
        vec![
            Ineligibility::CreditScoreBelowMinimum {
                required: 700,
                actual: 650,
            },
            Ineligibility::DownPaymentBelowMinimum {
                required_percent: dec!(10),
                actual_percent: dec!(0),
            },
        ]
    );
}

#[test]
fn test_no_match_warns() {
    let search = LoanProgramSearch {
        profile: BorrowerProfile {
            credit_score: 560,
            down_payment_percent: dec!(2),
            loan_amount: dec!(250000),
            property_use: PropertyUse::Secondary,
            is_veteran: false,
            is_rural: false,
        },
        programs: None,
    };
    let out = match_programs(&search).unwrap();
    assert!(out.result.matches.is_empty());
    assert_eq!(out.result.rejections.len(), 5);
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn test_search_parses_with_defaults() {
    let search: LoanProgramSearch = serde_json::from_value(serde_json::json!({
        "credit_score": 720,
        "down_payment_percent": "20",
        "loan_amount": "900000"
    }))
    .unwrap();
    assert_eq!(search.profile.property_use, PropertyUse::Primary);
    assert!(!search.profile.is_veteran);

    let out = match_programs(&search).unwrap();
    let ids: Vec<u32> = out.result.matches.iter().map(|m| m.program.id).collect();
    assert_eq!(ids, vec![5]);
}

#[test]
fn test_rejection_reason_wire_format() {
    let catalog = default_catalog();
    let va = catalog.iter().find(|p| p.id == 3).unwrap();
    let mut profile = rural_veteran();
    profile.is_veteran = false;
    let eval = evaluate_program(&profile, va);
    let value = serde_json::to_value(&eval.reasons).unwrap();
    assert_eq!(value, serde_json::json!([{ "reason": "veteran_status_required" }]));
}

#[test]
fn test_custom_catalog_is_used() {
    let mut programs = default_catalog();
    programs.retain(|p| p.id == 2);
    programs[0].min_credit_score = 500;
    let search = LoanProgramSearch {
        profile: BorrowerProfile {
            credit_score: 540,
            down_payment_percent: dec!(10),
            loan_amount: dec!(200000),
            property_use: PropertyUse::Primary,
            is_veteran: false,
            is_rural: false,
        },
        programs: Some(programs),
    };
    let out = match_programs(&search).unwrap();
    assert_eq!(out.result.matches.len(), 1);
    assert!(out.result.rejections.is_empty());
}

#[test]
fn test_invalid_profile_fails_fast() {
    let mut profile = rural_veteran();
    profile.down_payment_percent = dec!(100);
    let search = LoanProgramSearch {
        profile,
        programs: None,
    };
    match match_programs(&search) {
        Err(MortgageCalcError::InvalidInput { field, .. }) => {
            assert_eq!(field, "down_payment_percent")
        }
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}
