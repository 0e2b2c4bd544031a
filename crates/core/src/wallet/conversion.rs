//! Credit/currency conversion.
//!
//! Amounts are stored as `numeric(20,9)`: at most [`MAX_INTEGER_DIGITS`] integer
//! digits and [`MAX_SCALE`] fractional digits. Conversion results are rounded to
//! that scale with banker's rounding.

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use super::error::WalletError;

/// Maximum number of fractional digits persisted for any amount.
pub const MAX_SCALE: u32 = 9;

/// Maximum number of integer digits persisted for any amount.
pub const MAX_INTEGER_DIGITS: u32 = 11;

fn storage_limit() -> Decimal {
    Decimal::from(10_i64.pow(MAX_INTEGER_DIGITS))
}

/// Checks that `value` fits the integer part of a stored amount.
///
/// # Errors
///
/// Returns `InvalidAmount` if `value` has more than [`MAX_INTEGER_DIGITS`] integer digits.
pub fn ensure_storable(value: Decimal) -> Result<Decimal, WalletError> {
    if value.abs() >= storage_limit() {
        return Err(WalletError::InvalidAmount(format!(
            "{value} has more than {MAX_INTEGER_DIGITS} integer digits"
        )));
    }
    Ok(value)
}

/// Converts credits into currency units.
///
/// # Errors
///
/// Returns `InvalidAmount` if the product overflows.
pub fn credits_to_currency(credits: Decimal, rate: Decimal) -> Result<Decimal, WalletError> {
    let amount = credits.checked_mul(rate).ok_or_else(|| {
        WalletError::InvalidAmount(format!("cannot convert {credits} credits at rate {rate}"))
    })?;
    Ok(amount.round_dp_with_strategy(MAX_SCALE, RoundingStrategy::MidpointNearestEven))
}

/// Converts a currency amount into credits.
///
/// # Errors
///
/// Returns `InvalidAmount` if `rate` is not positive.
pub fn currency_to_credits(amount: Decimal, rate: Decimal) -> Result<Decimal, WalletError> {
    validate_rate(rate)?;
    let credits = amount
        .checked_div(rate)
        .ok_or_else(|| WalletError::InvalidAmount(format!("cannot convert {amount} at rate {rate}")))?;
    Ok(credits.round_dp_with_strategy(MAX_SCALE, RoundingStrategy::MidpointNearestEven))
}

/// Validates a conversion rate.
///
/// # Errors
///
/// Returns `InvalidAmount` if `rate` is zero or negative.
pub fn validate_rate(rate: Decimal) -> Result<(), WalletError> {
    if rate <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(format!(
            "conversion rate must be positive, got {rate}"
        )));
    }
    Ok(())
}

/// Validates an operation amount: strictly positive and storable as `numeric(20,9)`.
///
/// # Errors
///
/// Returns `InvalidAmount` otherwise.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, WalletError> {
    if amount <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    ensure_storable(amount)?;
    let normalized = amount.normalize();
    if normalized.scale() > MAX_SCALE {
        return Err(WalletError::InvalidAmount(format!(
            "amount {amount} has more than {MAX_SCALE} decimal places"
        )));
    }
    Ok(normalized)
}

/// An operation amount, expressed either in credits or in the wallet currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationAmount {
    /// Amount in credit units.
    Credits(Decimal),
    /// Amount in the wallet's currency.
    Currency(Decimal),
}

/// A validated amount in both units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAmount {
    /// Currency units.
    pub amount: Decimal,
    /// Credit units.
    pub credit_amount: Decimal,
}

impl OperationAmount {
    /// Validates the amount and resolves both units at `rate`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive, oversized or over-precise amounts,
    /// and for a currency amount that converts to zero credits.
    pub fn resolve(self, rate: Decimal) -> Result<ResolvedAmount, WalletError> {
        validate_rate(rate)?;
        match self {
            Self::Credits(credits) => {
                let credit_amount = validate_amount(credits)?;
                Ok(ResolvedAmount {
                    amount: ensure_storable(credits_to_currency(credit_amount, rate)?)?,
                    credit_amount,
                })
            }
            Self::Currency(amount) => {
                let amount = validate_amount(amount)?;
                let credit_amount = validate_amount(currency_to_credits(amount, rate)?)?;
                Ok(ResolvedAmount {
                    amount,
                    credit_amount,
                })
            }
        }
    }
}
