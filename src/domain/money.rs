use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Whole currency units, truncating any fractional part. Used by providers
/// that take integer PKR.
pub fn whole_units(amount: Decimal) -> Option<i64> {
    amount.trunc().to_i64()
}

/// Fixed two-decimal rendering, e.g. `3000.00`.
pub fn two_decimals(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn truncates_to_whole_rupees() {
        assert_eq!(whole_units(dec!(3000)), Some(3000));
        assert_eq!(whole_units(dec!(2499.99)), Some(2499));
        assert_eq!(whole_units(dec!(0.50)), Some(0));
    }

    #[test]
    fn renders_two_decimals() {
        assert_eq!(two_decimals(dec!(3000)), "3000.00");
        assert_eq!(two_decimals(dec!(12.5)), "12.50");
        assert_eq!(two_decimals(dec!(9.999)), "10.00");
    }
}
