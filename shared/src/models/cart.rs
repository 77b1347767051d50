//! Persistent shopping cart
//!
//! Aggregate fields (`items_count`, `subtotal`, `discount`, `tax`,
//! `shipping_cost`, `total`) are derived server-side on every mutation and
//! are never taken from the client.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cart lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    #[default]
    Active,
    /// Turned into an order; immutable from here on
    Converted,
}

/// A coupon applied to the cart
///
/// The discount amount is computed by the promotions service; the cart
/// only records it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedCoupon {
    pub id: String,
    pub code: String,
    pub discount_amount: Decimal,
}

/// One product line in a cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub product_id: String,
    /// Name snapshot taken when the line was last priced
    pub name: String,
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Always >= 1
    pub quantity: i32,
    pub unit_price: Decimal,
    /// quantity × unit_price
    pub line_total: Decimal,
    pub added_at: i64,
}

impl CartLine {
    /// Recompute `line_total` from quantity and unit price
    pub fn refresh_total(&mut self) {
        self.line_total = self.unit_price * Decimal::from(self.quantity);
    }
}

/// Customer cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    pub id: String,
    pub customer_id: String,
    pub status: CartStatus,
    pub lines: Vec<CartLine>,
    /// Σ quantity
    pub items_count: i32,
    /// Σ line_total
    pub subtotal: Decimal,
    /// Coupon discount (capped at subtotal)
    pub discount: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    /// subtotal − discount + tax + shipping_cost
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<AppliedCoupon>,
    /// Order created from this cart (set on conversion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_activity_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_at: Option<i64>,
}

impl Cart {
    /// Create an empty active cart
    pub fn new(id: String, customer_id: String, now: i64) -> Self {
        Self {
            id,
            customer_id,
            status: CartStatus::Active,
            lines: Vec::new(),
            items_count: 0,
            subtotal: Decimal::ZERO,
            discount: Decimal::ZERO,
            tax: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            total: Decimal::ZERO,
            coupon: None,
            order_id: None,
            created_at: now,
            updated_at: now,
            last_activity_at: now,
            converted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CartStatus::Active
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a line by product id
    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Whether the cart has been idle longer than `window_ms`
    ///
    /// Read-only classification: converted carts are never abandoned and
    /// an empty cart is not worth reporting.
    pub fn is_abandoned(&self, now: i64, window_ms: i64) -> bool {
        self.is_active() && !self.is_empty() && now - self.last_activity_at > window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: &str, quantity: i32, unit_price: Decimal) -> CartLine {
        let mut line = CartLine {
            product_id: product_id.to_string(),
            name: product_id.to_string(),
            sku: product_id.to_uppercase(),
            image: None,
            quantity,
            unit_price,
            line_total: Decimal::ZERO,
            added_at: 0,
        };
        line.refresh_total();
        line
    }

    #[test]
    fn test_line_total() {
        let l = line("p-1", 3, Decimal::new(1999, 2));
        assert_eq!(l.line_total, Decimal::new(5997, 2));
    }

    #[test]
    fn test_abandoned_classification() {
        let mut cart = Cart::new("c-1".to_string(), "cust-1".to_string(), 1_000);
        // Empty carts are never reported
        assert!(!cart.is_abandoned(1_000_000, 10));

        cart.lines.push(line("p-1", 1, Decimal::ONE));
        assert!(!cart.is_abandoned(1_005, 10));
        assert!(cart.is_abandoned(1_011, 10));

        cart.status = CartStatus::Converted;
        assert!(!cart.is_abandoned(1_011, 10));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&CartStatus::Converted).unwrap();
        assert_eq!(json, "\"converted\"");
    }
}
