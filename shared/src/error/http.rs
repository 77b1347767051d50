//! ErrorCode -> HTTP status

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Status a gateway should answer with for this code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::CartNotFound
            | Self::CartLineNotFound
            | Self::OrderNotFound
            | Self::PaymentNotFound
            | Self::InvoiceNotFound
            | Self::ProductNotFound
            | Self::ShipmentNotFound => StatusCode::NOT_FOUND,

            Self::CartNotActive
            | Self::CartConflict
            | Self::InvalidStatusTransition
            | Self::InvalidShipmentTransition
            | Self::OrderAlreadyRated
            | Self::PaymentAlreadyRefunded
            | Self::PaymentVerificationNotAllowed => StatusCode::CONFLICT,

            // business rule rejected a well-formed request
            Self::CartEmpty
            | Self::ShippingLabelRequired
            | Self::PaymentExceedsRemaining
            | Self::PaymentRefundExceedsAmount
            | Self::ProductUnavailable
            | Self::InsufficientStock => StatusCode::UNPROCESSABLE_ENTITY,

            Self::ValidationFailed => StatusCode::BAD_REQUEST,

            Self::SystemBusy => StatusCode::SERVICE_UNAVAILABLE,

            Self::InternalError | Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
