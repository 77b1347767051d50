//! Order aggregate
//!
//! An order is created once from a cart snapshot. Its line items and
//! address are copies, so catalog or address-book edits made later never
//! reach a placed order.

use super::types::{AddressSnapshot, PaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status
///
/// | From | To |
/// |------|----|
/// | pending | confirmed, cancelled |
/// | confirmed | processing, cancelled |
/// | processing | ready_for_pickup, shipped, cancelled |
/// | ready_for_pickup | shipped, cancelled |
/// | shipped | out_for_delivery, delivered |
/// | out_for_delivery | delivered |
/// | delivered | completed, refunded |
/// | completed | refunded |
///
/// `cancelled` and `refunded` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    ReadyForPickup,
    Shipped,
    OutForDelivery,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 10] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::ReadyForPickup,
        OrderStatus::Shipped,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    /// Legal targets from this status
    pub const fn allowed_transitions(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Processing, Cancelled],
            Processing => &[ReadyForPickup, Shipped, Cancelled],
            ReadyForPickup => &[Shipped, Cancelled],
            Shipped => &[OutForDelivery, Delivered],
            OutForDelivery => &[Delivered],
            Delivered => &[Completed, Refunded],
            Completed => &[Refunded],
            Cancelled | Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// No outbound transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    /// Position along the fulfilment path, `None` for cancelled/refunded
    ///
    /// Used to tell whether an order has already reached (or passed) a
    /// status pushed by a shipment.
    pub const fn fulfilment_rank(&self) -> Option<u8> {
        use OrderStatus::*;
        match self {
            Pending => Some(0),
            Confirmed => Some(1),
            Processing => Some(2),
            ReadyForPickup => Some(3),
            Shipped => Some(4),
            OutForDelivery => Some(5),
            Delivered => Some(6),
            Completed => Some(7),
            Cancelled | Refunded => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        use OrderStatus::*;
        match self {
            Pending => "pending",
            Confirmed => "confirmed",
            Processing => "processing",
            ReadyForPickup => "ready_for_pickup",
            Shipped => "shipped",
            OutForDelivery => "out_for_delivery",
            Delivered => "delivered",
            Completed => "completed",
            Cancelled => "cancelled",
            Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status, stored redundantly for filtering
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
    Refunded,
}

impl PaymentStatus {
    /// Derive the status from paid vs total
    ///
    /// `refunded` wins when money came in and all of it went back out.
    pub fn derive(total: Decimal, paid: Decimal, refunded: Decimal) -> Self {
        if paid <= Decimal::ZERO {
            if refunded > Decimal::ZERO {
                PaymentStatus::Refunded
            } else {
                PaymentStatus::Unpaid
            }
        } else if paid >= total {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        }
    }
}

/// Bank-transfer receipt verification state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    NotSubmitted,
    Pending,
    Verified,
    Rejected,
}

/// Uploaded payment receipt and its review outcome
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PaymentReceipt {
    pub status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Customer rating left after delivery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRating {
    /// 1..=5
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub rated_at: i64,
}

/// Immutable order line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: String,
    pub product_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_localized: Option<String>,
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount: Decimal,
    /// Informational per-line tax; the order-level `tax` is authoritative
    pub tax: Decimal,
    /// quantity × unit_price − discount
    pub total: Decimal,
    /// Mirrors the parent order status
    pub status: OrderStatus,
}

/// Order aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    /// Human-readable number, e.g. `ORD202610160001`
    pub order_number: String,
    pub customer_id: String,
    /// Source cart
    pub cart_id: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,

    // === Money ===
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    /// Non-coupon discount
    pub discount: Decimal,
    pub coupon_discount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub wallet_amount: Decimal,
    pub loyalty_amount: Decimal,
    pub total: Decimal,
    pub paid_amount: Decimal,
    /// Cumulative refunds (already subtracted from `paid_amount`)
    #[serde(default)]
    pub refunded_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub receipt: PaymentReceipt,

    pub shipping_address: AddressSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<OrderRating>,

    // === Timestamps ===
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<i64>,
}

impl Order {
    /// total − paid; negative only while an overpayment is on record
    pub fn remaining_amount(&self) -> Decimal {
        self.total - self.paid_amount
    }

    pub fn is_fully_paid(&self) -> bool {
        self.paid_amount >= self.total
    }

    /// Σ item totals + tax + shipping − all discounts and credits
    pub fn computed_total(&self) -> Decimal {
        let items: Decimal = self.items.iter().map(|i| i.total).sum();
        items + self.tax + self.shipping_cost
            - self.discount
            - self.coupon_discount
            - self.wallet_amount
            - self.loyalty_amount
    }
}
