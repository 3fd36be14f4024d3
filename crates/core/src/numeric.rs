//! Fixed-precision numeric helpers.
//!
//! Numeric fields are parsed into [`Decimal`] so sums and averages over large
//! scans do not accumulate binary floating point drift. Aggregate outputs are
//! rendered at [`OUTPUT_SCALE`] fractional digits with half-up rounding.

use crate::error::{Error, Result};
use rust_decimal::prelude::*;

pub use rust_decimal::Decimal;

/// Number of fractional digits in rendered aggregate values.
pub const OUTPUT_SCALE: u32 = 10;

/// Parses the text representation of a numeric field.
///
/// Leading and trailing whitespace is ignored, a leading `+` is accepted, and
/// scientific notation (`1.5e3`) is accepted.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .ok()
        .or_else(|| Decimal::from_scientific(trimmed).ok())
}

/// Parses a numeric field, reporting the column on failure.
pub fn parse_field(column: &str, text: &str) -> Result<Decimal> {
    parse_decimal(text).ok_or_else(|| Error::malformed_number(column, text))
}

/// Renders a value at [`OUTPUT_SCALE`] fractional digits, rounding half-up.
pub fn format_scaled(value: Decimal) -> String {
    let mut rounded =
        value.round_dp_with_strategy(OUTPUT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(OUTPUT_SCALE);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded.to_string()
}

/// Renders an evaluated number without trailing fractional zeros.
pub fn format_plain(value: Decimal) -> String {
    let normalized = value.normalize();
    if normalized.is_zero() {
        return "0".into();
    }
    normalized.to_string()
}

/// Adds two decimals, failing on overflow.
pub fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or(Error::NumericOverflow { operation: "addition" })
}

/// Subtracts two decimals, failing on overflow.
pub fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b).ok_or(Error::NumericOverflow {
        operation: "subtraction",
    })
}

/// Multiplies two decimals, failing on overflow.
pub fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_mul(b).ok_or(Error::NumericOverflow {
        operation: "multiplication",
    })
}

/// Divides two decimals, failing on a zero divisor or overflow.
pub fn checked_div(a: Decimal, b: Decimal) -> Result<Decimal> {
    if b.is_zero() {
        return Err(Error::DivisionByZero);
    }
    a.checked_div(b)
        .ok_or(Error::NumericOverflow { operation: "division" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("10"), Some(Decimal::from(10)));
        assert_eq!(parse_decimal(" -2.5 "), Some(Decimal::new(-25, 1)));
        assert_eq!(parse_decimal("+7"), Some(Decimal::from(7)));
        assert_eq!(parse_decimal("1.5e3"), Some(Decimal::from(1500)));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("12abc"), None);
    }

    #[test]
    fn test_parse_field_reports_column() {
        let err = parse_field("t.price", "n/a").unwrap_err();
        match err {
            Error::MalformedNumber { column, value } => {
                assert_eq!(column, "t.price");
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_format_scaled_pads_and_rounds_half_up() {
        assert_eq!(format_scaled(Decimal::from(30)), "30.0000000000");
        assert_eq!(
            format_scaled(Decimal::from_str("0.00000000005").unwrap()),
            "0.0000000001"
        );
        assert_eq!(
            format_scaled(Decimal::from_str("-0.00000000005").unwrap()),
            "-0.0000000001"
        );
        assert_eq!(
            format_scaled(Decimal::from_str("-0.000000000001").unwrap()),
            "0.0000000000"
        );
    }

    #[test]
    fn test_division_by_third_is_stable() {
        let third = checked_div(Decimal::ONE, Decimal::from(3)).unwrap();
        assert_eq!(format_scaled(third), "0.3333333333");
        let two_thirds = checked_div(Decimal::from(2), Decimal::from(3)).unwrap();
        assert_eq!(format_scaled(two_thirds), "0.6666666667");
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            checked_div(Decimal::ONE, Decimal::ZERO),
            Err(Error::DivisionByZero)
        ));
    }

    #[test]
    fn test_format_plain() {
        assert_eq!(format_plain(Decimal::from_str("2.500").unwrap()), "2.5");
        assert_eq!(format_plain(Decimal::from_str("-0.0").unwrap()), "0");
        assert_eq!(format_plain(Decimal::from(42)), "42");
    }
}
