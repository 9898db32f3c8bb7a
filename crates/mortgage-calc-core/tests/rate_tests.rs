#![cfg(feature = "rate_comparison")]

use mortgage_calc_core::rate_comparison::{
    analyze_rates, compare_rates, default_rate_table, RateCandidate, RateComparisonInput,
    RateFilter,
};
use mortgage_calc_core::LoanType;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[test]
fn test_default_table_quotes() {
    let quotes = compare_rates(dec!(300000), &default_rate_table()).unwrap();
    let payments: Vec<(u32, Decimal)> = quotes
        .iter()
        .map(|q| (q.candidate.id, q.monthly_payment))
        .collect();
    assert_eq!(
        payments,
        vec![
            (1, dec!(1475.82)),
            (2, dec!(2181.67)),
            (3, dec!(1432.25)),
            (4, dec!(1389.35)),
            (5, dec!(1520.06)),
            (6, dec!(1817.94)),
            (7, dec!(1406.42)),
        ]
    );
}

#[test]
fn test_quote_totals_follow_payment() {
    for quote in compare_rates(dec!(412345.67), &default_rate_table()).unwrap() {
        let n = Decimal::from(quote.candidate.term_years * 12);
        assert_eq!(quote.total_payment, quote.monthly_payment * n);
        assert_eq!(quote.total_interest, quote.total_payment - dec!(412345.67));
    }
}

#[test]
fn test_higher_rate_never_cheaper_for_same_term() {
    let candidates: Vec<RateCandidate> = [dec!(5.5), dec!(5.625), dec!(5.75), dec!(6.0), dec!(7.125)]
        .iter()
        .enumerate()
        .map(|(i, rate)| RateCandidate {
            id: i as u32 + 1,
            loan_type: LoanType::Conventional,
            term_years: 30,
            rate_percent: *rate,
            apr_percent: None,
            points: None,
            best_for: None,
        })
        .collect();
    let quotes = compare_rates(dec!(250000), &candidates).unwrap();
    for pair in quotes.windows(2) {
        assert!(pair[0].monthly_payment < pair[1].monthly_payment);
        assert!(pair[0].total_interest < pair[1].total_interest);
    }
}

#[test]
fn test_analyze_flags_cheapest_candidates() {
    let input = RateComparisonInput {
        principal: dec!(300000),
        candidates: None,
        filter: RateFilter::default(),
    };
    let out = analyze_rates(&input).unwrap();
    assert_eq!(out.result.quotes.len(), 7);
    assert_eq!(out.result.lowest_payment_id, Some(4));
    assert_eq!(out.result.lowest_total_interest_id, Some(2));
    assert!(out.warnings.is_empty());
}

#[test]
fn test_filtered_comparison_from_json() {
    let input: RateComparisonInput = serde_json::from_value(serde_json::json!({
        "principal": "300000",
        "filter": { "term_years": 30 }
    }))
    .unwrap();
    let out = analyze_rates(&input).unwrap();
    let ids: Vec<u32> = out.result.quotes.iter().map(|q| q.candidate.id).collect();
    assert_eq!(ids, vec![1, 3, 4, 5, 7]);
    assert_eq!(out.result.lowest_total_interest_id, Some(4));
}

#[test]
fn test_quote_serializes_flat() {
    let quotes = compare_rates(dec!(300000), &default_rate_table()[..1]).unwrap();
    let value = serde_json::to_value(&quotes[0]).unwrap();
    assert_eq!(value["id"], 1);
    assert_eq!(value["loan_type"], "conventional");
    assert_eq!(value["monthly_payment"], "1475.82");
}

#[test]
fn test_non_positive_principal_rejected() {
    assert!(compare_rates(Decimal::ZERO, &default_rate_table()).is_err());
}
