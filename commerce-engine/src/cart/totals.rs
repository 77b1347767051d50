//! Cart aggregate computation
//!
//! Aggregates are always derived from the final line list; nothing the
//! client sends is trusted here.

use crate::core::Config;
use crate::money::round2;
use rust_decimal::Decimal;
use shared::models::Cart;

/// Tax and shipping rules applied to every cart
#[derive(Debug, Clone, PartialEq)]
pub struct PricingRules {
    pub tax_rate: Decimal,
    pub shipping_flat: Decimal,
    pub free_shipping_threshold: Option<Decimal>,
}

impl PricingRules {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tax_rate: config.tax_rate,
            shipping_flat: config.shipping_flat,
            free_shipping_threshold: config.free_shipping_threshold,
        }
    }

    /// No tax, no shipping
    pub fn untaxed() -> Self {
        Self {
            tax_rate: Decimal::ZERO,
            shipping_flat: Decimal::ZERO,
            free_shipping_threshold: None,
        }
    }

    fn shipping_for(&self, cart: &Cart) -> Decimal {
        if cart.is_empty() {
            return Decimal::ZERO;
        }
        match self.free_shipping_threshold {
            Some(threshold) if cart.subtotal >= threshold => Decimal::ZERO,
            _ => self.shipping_flat,
        }
    }

    /// Recompute line totals and every aggregate field
    pub fn recompute(&self, cart: &mut Cart) {
        for line in &mut cart.lines {
            line.refresh_total();
        }

        cart.items_count = cart.lines.iter().map(|l| l.quantity).sum();
        cart.subtotal = cart.lines.iter().map(|l| l.line_total).sum();

        // Coupon can never push the cart below zero
        cart.discount = cart
            .coupon
            .as_ref()
            .map(|c| c.discount_amount.max(Decimal::ZERO).min(cart.subtotal))
            .unwrap_or(Decimal::ZERO);

        cart.tax = round2((cart.subtotal - cart.discount) * self.tax_rate);
        cart.shipping_cost = self.shipping_for(cart);
        cart.total = cart.subtotal - cart.discount + cart.tax + cart.shipping_cost;
    }
}
