//! Invoice, payment and shipment records tied to an order

use super::snapshot::PaymentStatus;
use super::types::{CarrierInfo, PaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Invoice
// ============================================================================

/// Invoice created together with the order
///
/// Mirrors the order's money at creation and then tracks its own paid
/// amount, updated wherever the order's paid amount changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: String,
    /// e.g. `INV2026100007`
    pub invoice_number: String,
    pub order_id: String,
    pub customer_id: String,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    /// All discounts and credits combined
    pub discount: Decimal,
    pub total: Decimal,
    pub paid_amount: Decimal,
    pub status: PaymentStatus,
    pub issued_at: i64,
    pub updated_at: i64,
}

impl Invoice {
    pub fn remaining_amount(&self) -> Decimal {
        self.total - self.paid_amount
    }
}

// ============================================================================
// Payment
// ============================================================================

/// Payment record status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRecordStatus {
    #[default]
    Completed,
    PartiallyRefunded,
    Refunded,
}

/// A single settled payment
///
/// Only `refunded_amount` (bounded by `amount`) and the derived status may
/// change after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: String,
    /// e.g. `PAY202610160012`
    pub payment_number: String,
    pub order_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentRecordStatus,
    #[serde(default)]
    pub refunded_amount: Decimal,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_by: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_reason: Option<String>,
}

impl Payment {
    /// Amount that can still be refunded
    pub fn refundable_amount(&self) -> Decimal {
        self.amount - self.refunded_amount
    }
}

// ============================================================================
// Shipment
// ============================================================================

/// Shipment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[default]
    Pending,
    Picked,
    Packed,
    Shipped,
    InTransit,
    OutForDelivery,
    Delivered,
    Failed,
    Returned,
}

impl ShipmentStatus {
    /// Legal targets from this status
    ///
    /// Warehouse steps (picked, packed) and carrier steps (in_transit,
    /// out_for_delivery) may be skipped; failed shipments can only be returned.
    pub const fn allowed_transitions(&self) -> &'static [ShipmentStatus] {
        use ShipmentStatus::*;
        match self {
            Pending => &[Picked, Packed, Shipped],
            Picked => &[Packed, Shipped],
            Packed => &[Shipped],
            Shipped => &[InTransit, OutForDelivery, Delivered, Failed],
            InTransit => &[OutForDelivery, Delivered, Failed],
            OutForDelivery => &[Delivered, Failed],
            Delivered => &[Returned],
            Failed => &[Returned],
            Returned => &[],
        }
    }

    pub fn can_transition_to(&self, to: ShipmentStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    pub const fn as_str(&self) -> &'static str {
        use ShipmentStatus::*;
        match self {
            Pending => "pending",
            Picked => "picked",
            Packed => "packed",
            Shipped => "shipped",
            InTransit => "in_transit",
            OutForDelivery => "out_for_delivery",
            Delivered => "delivered",
            Failed => "failed",
            Returned => "returned",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order item carried by a shipment (snapshot)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentItem {
    pub order_item_id: String,
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub quantity: i32,
}

/// Physical shipment of (part of) an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shipment {
    pub id: String,
    /// e.g. `SHP202610160003`
    pub shipment_number: String,
    pub order_id: String,
    pub status: ShipmentStatus,
    pub carrier: CarrierInfo,
    pub items: Vec<ShipmentItem>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picked_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipment_forward_path() {
        use ShipmentStatus::*;
        let path = [Pending, Picked, Packed, Shipped, InTransit, OutForDelivery, Delivered];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!Delivered.can_transition_to(Pending));
        assert!(Failed.can_transition_to(Returned));
        assert!(Returned.allowed_transitions().is_empty());
    }

    #[test]
    fn test_shipment_skips_and_dead_ends() {
        use ShipmentStatus::*;
        assert!(Pending.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(InTransit));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Shipped));
        assert!(!Returned.can_transition_to(Shipped));
        for from in [Shipped, InTransit, OutForDelivery] {
            assert!(from.can_transition_to(Failed), "{} -> failed", from);
        }
        for from in [Failed, Delivered] {
            assert!(from.can_transition_to(Returned), "{} -> returned", from);
        }
    }

    #[test]
    fn test_refundable_amount() {
        let payment = Payment {
            id: "p".to_string(),
            payment_number: "PAY202601010001".to_string(),
            order_id: "o".to_string(),
            amount: Decimal::from(100),
            method: PaymentMethod::Card,
            status: PaymentRecordStatus::PartiallyRefunded,
            refunded_amount: Decimal::from(30),
            metadata: BTreeMap::new(),
            recorded_by: None,
            created_at: 0,
            refunded_at: Some(1),
            refund_reason: None,
        };
        assert_eq!(payment.refundable_amount(), Decimal::from(70));
    }
}
