//! Money helpers using rust_decimal for precision
//!
//! All monetary values are `Decimal`; nothing in the engine touches `f64`.
//! Amounts are rounded to 2 decimal places (half away from zero) wherever a
//! rate is applied.

use crate::error::{EngineError, EngineResult};
use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: i32 = 9999;

/// Maximum allowed single payment / price (1,000,000)
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Round to 2 decimal places, half away from zero
#[inline]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether two amounts differ by more than `epsilon`
#[inline]
pub fn differs(a: Decimal, b: Decimal, epsilon: Decimal) -> bool {
    (a - b).abs() > epsilon
}

/// Validate a line quantity: 1..=MAX_QUANTITY
pub fn validate_quantity(quantity: i32) -> EngineResult<()> {
    if quantity <= 0 {
        return Err(EngineError::Validation(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(EngineError::Validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, quantity
        )));
    }
    Ok(())
}

/// Validate a positive money amount (payments, refunds)
pub fn validate_amount(amount: Decimal, field_name: &str) -> EngineResult<()> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::Validation(format!(
            "{} must be positive, got {}",
            field_name, amount
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(EngineError::Validation(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field_name, MAX_AMOUNT, amount
        )));
    }
    if amount.scale() > DECIMAL_PLACES && amount != round2(amount) {
        return Err(EngineError::Validation(format!(
            "{} has more than {} decimal places: {}",
            field_name, DECIMAL_PLACES, amount
        )));
    }
    Ok(())
}

/// Validate a non-negative money amount (coupon discounts, credits)
pub fn validate_non_negative(amount: Decimal, field_name: &str) -> EngineResult<()> {
    if amount < Decimal::ZERO {
        return Err(EngineError::Validation(format!(
            "{} must be non-negative, got {}",
            field_name, amount
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(EngineError::Validation(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field_name, MAX_AMOUNT, amount
        )));
    }
    Ok(())
}
