//! Shared input and value types for the order lifecycle

use super::snapshot::{OrderStatus, PaymentStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Payment Method
// ============================================================================

/// How the customer pays
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
    Card,
    Cash,
    CashOnDelivery,
    Wallet,
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Other => "other",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Address
// ============================================================================

/// Shipping address copied into the order at checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AddressSnapshot {
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub country: String,
}

// ============================================================================
// Checkout
// ============================================================================

/// Everything checkout needs beyond the cart itself
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CheckoutInput {
    pub shipping_address: AddressSnapshot,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_notes: Option<String>,
    /// Store credit already reserved by the wallet service
    #[serde(default)]
    pub wallet_amount: Decimal,
    /// Loyalty points value already redeemed by the loyalty service
    #[serde(default)]
    pub loyalty_amount: Decimal,
}

// ============================================================================
// Status update
// ============================================================================

/// Who is driving a status change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// Admin console user
    Admin(String),
    /// The customer who owns the order
    Customer(String),
    /// Engine-internal cascade
    System,
}

impl Actor {
    pub fn id(&self) -> Option<&str> {
        match self {
            Actor::Admin(id) | Actor::Customer(id) => Some(id.as_str()),
            Actor::System => None,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Actor::System)
    }
}

/// Status update request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionRequest {
    pub status: OrderStatus,
    pub actor: Actor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Required when an admin moves an order to `shipped`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_label: Option<String>,
}

impl TransitionRequest {
    pub fn new(status: OrderStatus, actor: Actor) -> Self {
        Self {
            status,
            actor,
            notes: None,
            shipping_label: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_shipping_label(mut self, label: impl Into<String>) -> Self {
        self.shipping_label = Some(label.into());
        self
    }
}

// ============================================================================
// Shipments
// ============================================================================

/// Carrier details supplied when a shipment is created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CarrierInfo {
    pub carrier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<i64>,
}

// ============================================================================
// Queries
// ============================================================================

/// Order list filter; `None` fields match everything
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OrderFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    /// Inclusive lower bound on `created_at` (Unix millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_from: Option<i64>,
    /// Exclusive upper bound on `created_at` (Unix millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_to: Option<i64>,
}
