//! Engine errors
//!
//! Every engine operation returns [`EngineResult`]. Callers branch on
//! [`EngineError::code`] (a stable [`ErrorCode`]); the admin and storefront
//! layers convert into [`AppError`] for the uniform API envelope.

use crate::oracles::OracleError;
use crate::storage::StorageError;
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use std::fmt;
use thiserror::Error;

/// Kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Cart,
    CartLine,
    Order,
    Invoice,
    Payment,
    Shipment,
    Product,
}

impl Entity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Entity::Cart => "cart",
            Entity::CartLine => "cart line",
            Entity::Order => "order",
            Entity::Invoice => "invoice",
            Entity::Payment => "payment",
            Entity::Shipment => "shipment",
            Entity::Product => "product",
        }
    }

    const fn not_found_code(&self) -> ErrorCode {
        match self {
            Entity::Cart => ErrorCode::CartNotFound,
            Entity::CartLine => ErrorCode::CartLineNotFound,
            Entity::Order => ErrorCode::OrderNotFound,
            Entity::Invoice => ErrorCode::InvoiceNotFound,
            Entity::Payment => ErrorCode::PaymentNotFound,
            Entity::Shipment => ErrorCode::ShipmentNotFound,
            Entity::Product => ErrorCode::ProductNotFound,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    /// Rejected before any write; nothing is recorded
    #[error("{entity}: cannot transition from {from} to {to}")]
    InvalidTransition {
        entity: Entity,
        from: String,
        to: String,
    },

    #[error("Cart is empty: {0}")]
    EmptyCart(String),

    /// Cart was converted into an order and is read-only
    #[error("Cart is not active: {0}")]
    CartNotActive(String),

    /// Duplicate-key race that outlived the retry budget
    #[error("Transient conflict: {0}")]
    TransientConflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Payment of {amount} exceeds remaining amount {remaining}")]
    PaymentExceedsRemaining { amount: Decimal, remaining: Decimal },

    #[error("Refund of {amount} exceeds refundable amount {refundable}")]
    RefundExceedsAmount { amount: Decimal, refundable: Decimal },

    #[error("Payment already refunded: {0}")]
    PaymentAlreadyRefunded(String),

    #[error("Payment verification not allowed: {0}")]
    VerificationNotAllowed(String),

    #[error("Shipping label required to ship order {0}")]
    ShippingLabelRequired(String),

    #[error("Order already rated: {0}")]
    AlreadyRated(String),

    #[error("Product unavailable: {0}")]
    ProductUnavailable(String),

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i32,
        available: i32,
    },

    /// Oracle failure outside reconciliation (sync degrades these per line)
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Retryable class: duplicate-key races on creation
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::Storage(StorageError::DuplicateKey(_)) | EngineError::TransientConflict(_)
        )
    }

    /// Stable error code for client branching
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Storage(StorageError::DuplicateKey(_)) => ErrorCode::CartConflict,
            EngineError::Storage(StorageError::Serialization(_)) => ErrorCode::InternalError,
            EngineError::Storage(_) => ErrorCode::DatabaseError,
            EngineError::NotFound { entity, .. } => entity.not_found_code(),
            EngineError::InvalidTransition { entity, .. } => match entity {
                Entity::Shipment => ErrorCode::InvalidShipmentTransition,
                _ => ErrorCode::InvalidStatusTransition,
            },
            EngineError::EmptyCart(_) => ErrorCode::CartEmpty,
            EngineError::CartNotActive(_) => ErrorCode::CartNotActive,
            EngineError::TransientConflict(_) => ErrorCode::CartConflict,
            EngineError::Validation(_) => ErrorCode::ValidationFailed,
            EngineError::PaymentExceedsRemaining { .. } => ErrorCode::PaymentExceedsRemaining,
            EngineError::RefundExceedsAmount { .. } => ErrorCode::PaymentRefundExceedsAmount,
            EngineError::PaymentAlreadyRefunded(_) => ErrorCode::PaymentAlreadyRefunded,
            EngineError::VerificationNotAllowed(_) => ErrorCode::PaymentVerificationNotAllowed,
            EngineError::ShippingLabelRequired(_) => ErrorCode::ShippingLabelRequired,
            EngineError::AlreadyRated(_) => ErrorCode::OrderAlreadyRated,
            EngineError::ProductUnavailable(_) => ErrorCode::ProductUnavailable,
            EngineError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            EngineError::Oracle(_) | EngineError::Io(_) => ErrorCode::SystemBusy,
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            EngineError::NotFound { entity, id } => AppError::with_message(code, message)
                .with_detail("entity", entity.as_str())
                .with_detail("id", id),
            EngineError::InvalidTransition { from, to, .. } => {
                AppError::with_message(code, message)
                    .with_detail("from", from)
                    .with_detail("to", to)
            }
            EngineError::InsufficientStock {
                product_id,
                available,
                ..
            } => AppError::with_message(code, message)
                .with_detail("product_id", product_id)
                .with_detail("available", available),
            _ => AppError::with_message(code, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ApiResponse;

    #[test]
    fn test_transient_classification() {
        let dup = EngineError::Storage(StorageError::DuplicateKey("x".into()));
        assert!(dup.is_transient());
        assert!(EngineError::TransientConflict("x".into()).is_transient());
        assert!(!EngineError::Validation("x".into()).is_transient());
        assert!(!EngineError::not_found(Entity::Cart, "c").is_transient());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            EngineError::not_found(Entity::Order, "o").code(),
            ErrorCode::OrderNotFound
        );
        assert_eq!(
            EngineError::not_found(Entity::CartLine, "p").code(),
            ErrorCode::CartLineNotFound
        );
        let err = EngineError::InvalidTransition {
            entity: Entity::Shipment,
            from: "returned".into(),
            to: "shipped".into(),
        };
        assert_eq!(err.code(), ErrorCode::InvalidShipmentTransition);
        assert_eq!(EngineError::EmptyCart("c".into()).code(), ErrorCode::CartEmpty);
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = EngineError::InvalidTransition {
            entity: Entity::Order,
            from: "pending".into(),
            to: "delivered".into(),
        };
        assert_eq!(
            err.to_string(),
            "order: cannot transition from pending to delivered"
        );
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = EngineError::not_found(Entity::Shipment, "s-1").into();
        assert_eq!(app.code, ErrorCode::ShipmentNotFound);
        assert!(app.message.contains("s-1"));
        assert_eq!(app.http_status().as_u16(), 404);

        let response: ApiResponse<()> = app.into();
        assert_eq!(response.code, ErrorCode::ShipmentNotFound.code());
        assert!(response.data.is_none());
    }
}
