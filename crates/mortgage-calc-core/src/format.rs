//! Currency and percentage presentation helpers.
//!
//! The engine computes in `Decimal`; these helpers produce the US-locale
//! strings shown on estimates (`$1,520.06`, `4.500%`).

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places for USD amounts.
pub const CURRENCY_PLACES: u32 = 2;

/// Round to cents, half away from zero.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Format as US dollars with thousands separators, e.g. `-$1,234.56`.
pub fn format_currency(value: Decimal) -> String {
    let rounded = round_currency(value);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// Most decimal places a `Decimal` can carry.
pub const MAX_DECIMAL_PLACES: u32 = 28;

/// Format a percentage value (4.5 = 4.5%) with a fixed number of places,
/// at most [`MAX_DECIMAL_PLACES`].
pub fn format_percent(value: Decimal, places: u32) -> String {
    let places = places.min(MAX_DECIMAL_PLACES);
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}%", places as usize, rounded)
}

fn group_thousands(whole: &str) -> String {
    let mut out = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_currency_half_away_from_zero() {
        assert_eq!(round_currency(dec!(1109.589041)), dec!(1109.59));
        assert_eq!(round_currency(dec!(0.125)), dec!(0.13));
        assert_eq!(round_currency(dec!(-0.125)), dec!(-0.13));
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(dec!(1520.06)), "$1,520.06");
        assert_eq!(format_currency(dec!(247221.6)), "$247,221.60");
        assert_eq!(format_currency(dec!(1000000)), "$1,000,000.00");
        assert_eq!(format_currency(dec!(999.999)), "$1,000.00");
        assert_eq!(format_currency(dec!(0)), "$0.00");
        assert_eq!(format_currency(dec!(-42.5)), "-$42.50");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(dec!(4.5), 3), "4.500%");
        assert_eq!(format_percent(dec!(3.19828), 2), "3.20%");
        assert_eq!(format_percent(dec!(12), 0), "12%");
    }

    #[test]
    fn test_format_percent_places_clamped() {
        let formatted = format_percent(dec!(4.5), u32::MAX);
        assert_eq!(formatted, format!("4.5{}%", "0".repeat(27)));
    }
}
