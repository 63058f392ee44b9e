//! Money helpers.
//!
//! All cash, price and quantity values are `rust_decimal::Decimal`. Amounts
//! that are persisted or returned to clients are rounded to cents with
//! midpoint-to-even rounding.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Decimal places kept on persisted cash amounts.
pub const CENTS_DP: u32 = 2;

/// Round a cash amount to cents.
pub fn round2(x: Decimal) -> Decimal {
    x.round_dp(CENTS_DP)
}

/// Coerce a loosely-typed JSON value into a decimal.
///
/// Accepts JSON numbers and numeric strings (`"12.5"`, `" 3 "`, `"1e3"`).
/// Returns `None` for anything else, including booleans, nulls and blank
/// strings.
pub fn coerce_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// Parse a decimal from text, accepting plain and scientific notation.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    Decimal::from_str(t)
        .or_else(|_| Decimal::from_scientific(t))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn round2_uses_midpoint_to_even() {
        assert_eq!(round2(dec!(1.005)), dec!(1.00));
        assert_eq!(round2(dec!(1.015)), dec!(1.02));
        assert_eq!(round2(dec!(8500)), dec!(8500));
    }

    #[test]
    fn coerce_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce_decimal(&json!(10)), Some(dec!(10)));
        assert_eq!(coerce_decimal(&json!(2.5)), Some(dec!(2.5)));
        assert_eq!(coerce_decimal(&json!("7.25")), Some(dec!(7.25)));
        assert_eq!(coerce_decimal(&json!(" 4 ")), Some(dec!(4)));
        assert_eq!(coerce_decimal(&json!("1e3")), Some(dec!(1000)));
    }

    #[test]
    fn coerce_rejects_non_numeric() {
        assert_eq!(coerce_decimal(&json!("ten")), None);
        assert_eq!(coerce_decimal(&json!("")), None);
        assert_eq!(coerce_decimal(&json!(true)), None);
        assert_eq!(coerce_decimal(&Value::Null), None);
        assert_eq!(coerce_decimal(&json!({"qty": 1})), None);
    }
}
