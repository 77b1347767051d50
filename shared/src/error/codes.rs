//! Stable numeric error codes
//!
//! The thousands digit names the family (see [`super::ErrorCategory`]):
//! 0 general, 3 cart, 4 order, 5 payment/invoice, 6 product, 7 shipment,
//! 9 system. Numbers are never reused once published.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kind a client can branch on; serialized as its number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    /// Malformed input, rejected before any write
    ValidationFailed = 2,

    // cart
    CartNotFound = 3001,
    CartEmpty = 3002,
    /// Converted carts refuse every mutation
    CartNotActive = 3003,
    CartLineNotFound = 3004,
    /// Duplicate-key race on cart creation outlasted the retry budget
    CartConflict = 3005,

    // order
    OrderNotFound = 4001,
    InvalidStatusTransition = 4002,
    OrderAlreadyRated = 4003,
    ShippingLabelRequired = 4004,

    // payment / invoice
    PaymentNotFound = 5001,
    PaymentExceedsRemaining = 5002,
    PaymentAlreadyRefunded = 5004,
    PaymentRefundExceedsAmount = 5005,
    InvoiceNotFound = 5006,
    PaymentVerificationNotAllowed = 5007,

    // product / stock
    ProductNotFound = 6001,
    ProductUnavailable = 6002,
    InsufficientStock = 6003,

    // shipment
    ShipmentNotFound = 7001,
    InvalidShipmentTransition = 7002,

    // system
    InternalError = 9001,
    DatabaseError = 9002,
    /// Oracle or IO trouble; safe to retry later
    SystemBusy = 9404,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 25] = [
        ErrorCode::Success,
        ErrorCode::ValidationFailed,
        ErrorCode::CartNotFound,
        ErrorCode::CartEmpty,
        ErrorCode::CartNotActive,
        ErrorCode::CartLineNotFound,
        ErrorCode::CartConflict,
        ErrorCode::OrderNotFound,
        ErrorCode::InvalidStatusTransition,
        ErrorCode::OrderAlreadyRated,
        ErrorCode::ShippingLabelRequired,
        ErrorCode::PaymentNotFound,
        ErrorCode::PaymentExceedsRemaining,
        ErrorCode::PaymentAlreadyRefunded,
        ErrorCode::PaymentRefundExceedsAmount,
        ErrorCode::InvoiceNotFound,
        ErrorCode::PaymentVerificationNotAllowed,
        ErrorCode::ProductNotFound,
        ErrorCode::ProductUnavailable,
        ErrorCode::InsufficientStock,
        ErrorCode::ShipmentNotFound,
        ErrorCode::InvalidShipmentTransition,
        ErrorCode::InternalError,
        ErrorCode::DatabaseError,
        ErrorCode::SystemBusy,
    ];

    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Default English message, used when no specific message is given
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "OK",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::CartNotFound => "Cart not found",
            ErrorCode::CartEmpty => "Cart is empty",
            ErrorCode::CartNotActive => "Cart is no longer active",
            ErrorCode::CartLineNotFound => "Cart line not found",
            ErrorCode::CartConflict => "Cart is being modified concurrently",
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidStatusTransition => "Invalid status transition",
            ErrorCode::OrderAlreadyRated => "Order has already been rated",
            ErrorCode::ShippingLabelRequired => "Shipping label is required",
            ErrorCode::PaymentNotFound => "Payment not found",
            ErrorCode::PaymentExceedsRemaining => "Payment exceeds remaining amount",
            ErrorCode::PaymentAlreadyRefunded => "Payment has already been refunded",
            ErrorCode::PaymentRefundExceedsAmount => "Refund amount exceeds payment",
            ErrorCode::InvoiceNotFound => "Invoice not found",
            ErrorCode::PaymentVerificationNotAllowed => "Payment verification not allowed",
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductUnavailable => "Product is not available",
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::ShipmentNotFound => "Shipment not found",
            ErrorCode::InvalidShipmentTransition => "Invalid shipment status transition",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::SystemBusy => "System busy, please retry",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// A number that names no [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_numbers_are_unique_and_parse_back() {
        let numbers: HashSet<u16> = ErrorCode::ALL.iter().map(ErrorCode::code).collect();
        assert_eq!(numbers.len(), ErrorCode::ALL.len());
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
        assert_eq!(ErrorCode::try_from(3), Err(InvalidErrorCode(3)));
    }

    #[test]
    fn test_wire_form_is_numeric() {
        assert_eq!(serde_json::to_string(&ErrorCode::OrderNotFound).unwrap(), "4001");
        let code: ErrorCode = serde_json::from_str("3002").unwrap();
        assert_eq!(code, ErrorCode::CartEmpty);
        assert!(serde_json::from_str::<ErrorCode>("999").is_err());
    }

    #[test]
    fn test_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::CartEmpty.is_success());
        assert_eq!(ErrorCode::SystemBusy.to_string(), "9404");
    }
}
