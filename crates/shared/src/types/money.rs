//! Credit amounts with fixed-point decimal precision.
//!
//! CRITICAL: Never use floating-point for credit calculations.
//! Balances and amounts are `rust_decimal::Decimal` limited to [`CREDIT_SCALE`]
//! fractional digits.

use rust_decimal::Decimal;
use thiserror::Error;

/// Maximum number of fractional digits a credit amount may carry (cents).
pub const CREDIT_SCALE: u32 = 2;

/// Largest amount or balance the ledger stores: `NUMERIC(14, 2)`.
pub const MAX_CREDIT_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Reasons a credit amount is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Amount is zero or negative.
    #[error("amount must be greater than zero")]
    NotPositive,

    /// Amount has more fractional digits than the ledger stores.
    #[error("amount has more than {CREDIT_SCALE} decimal places")]
    TooPrecise,

    /// Amount exceeds [`MAX_CREDIT_AMOUNT`].
    #[error("amount must not exceed {MAX_CREDIT_AMOUNT}")]
    TooLarge,
}

/// Validates a caller-supplied credit amount.
///
/// Trailing zeros are ignored, so `10.500` is accepted as `10.50`.
///
/// # Errors
///
/// Returns `AmountError` if the amount is not strictly positive, exceeds
/// [`MAX_CREDIT_AMOUNT`] or is not representable at [`CREDIT_SCALE`].
pub fn validate_credit_amount(amount: Decimal) -> Result<Decimal, AmountError> {
    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive);
    }
    if amount > MAX_CREDIT_AMOUNT {
        return Err(AmountError::TooLarge);
    }
    let normalized = amount.normalize();
    if normalized.scale() > CREDIT_SCALE {
        return Err(AmountError::TooPrecise);
    }
    let mut fixed = normalized;
    fixed.rescale(CREDIT_SCALE);
    Ok(fixed)
}

/// Formats an amount with exactly [`CREDIT_SCALE`] fractional digits.
#[must_use]
pub fn format_credits(amount: Decimal) -> String {
    let mut fixed = amount;
    fixed.rescale(CREDIT_SCALE);
    fixed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valid_amounts() {
        assert_eq!(validate_credit_amount(dec!(500)).unwrap(), dec!(500.00));
        assert_eq!(validate_credit_amount(dec!(0.01)).unwrap(), dec!(0.01));
        assert_eq!(validate_credit_amount(dec!(10.500)).unwrap(), dec!(10.50));
    }

    #[test]
    fn test_rejects_non_positive() {
        assert_eq!(
            validate_credit_amount(Decimal::ZERO),
            Err(AmountError::NotPositive)
        );
        assert_eq!(
            validate_credit_amount(dec!(-5)),
            Err(AmountError::NotPositive)
        );
    }

    #[test]
    fn test_rejects_sub_cent_amounts() {
        assert_eq!(
            validate_credit_amount(dec!(1.005)),
            Err(AmountError::TooPrecise)
        );
    }

    #[test]
    fn test_amount_cap_matches_column_width() {
        assert_eq!(MAX_CREDIT_AMOUNT, dec!(999_999_999_999.99));
        assert_eq!(
            validate_credit_amount(MAX_CREDIT_AMOUNT).unwrap(),
            dec!(999999999999.99)
        );
        assert_eq!(
            validate_credit_amount(dec!(1_000_000_000_000)),
            Err(AmountError::TooLarge)
        );
        assert_eq!(
            validate_credit_amount(Decimal::MAX),
            Err(AmountError::TooLarge)
        );
    }

    #[test]
    fn test_format_credits() {
        assert_eq!(format_credits(dec!(120)), "120.00");
        assert_eq!(format_credits(dec!(-7.5)), "-7.50");
    }
}
