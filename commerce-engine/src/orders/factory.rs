//! Order Factory
//!
//! Snapshots the customer's active cart into a pending order, converts the
//! cart, writes the initial history entry and issues the invoice, all in
//! one write transaction.

use super::OrderManager;
use crate::error::{EngineError, EngineResult};
use crate::money::{self, round2};
use crate::numbering::{NumberKind, next_number};
use crate::storage::StorageError;
use rust_decimal::Decimal;
use shared::models::{Cart, CartStatus};
use shared::order::{
    AddressSnapshot, CheckoutInput, Invoice, Order, OrderItem, OrderStatus, PaymentReceipt,
    PaymentStatus, StatusHistoryEntry,
};
use shared::util::{new_id, now_millis};

fn validate_address(address: &AddressSnapshot) -> EngineResult<()> {
    let required = [
        ("recipient_name", &address.recipient_name),
        ("line1", &address.line1),
        ("city", &address.city),
        ("country", &address.country),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(EngineError::Validation(format!(
                "shipping_address.{} is required",
                field
            )));
        }
    }
    Ok(())
}

fn validate_checkout(input: &CheckoutInput) -> EngineResult<()> {
    validate_address(&input.shipping_address)?;
    money::validate_non_negative(input.wallet_amount, "wallet_amount")?;
    money::validate_non_negative(input.loyalty_amount, "loyalty_amount")?;
    Ok(())
}

impl OrderManager {
    /// Convert the customer's active cart into a pending order
    ///
    /// Fails with `EmptyCart` when the customer has no active cart or the
    /// cart has no lines. Nothing is written on failure.
    pub fn create_from_cart(&self, customer_id: &str, input: &CheckoutInput) -> EngineResult<Order> {
        validate_checkout(input)?;

        let txn = self.storage.begin_write()?;
        let cart = match self.storage.active_cart_id_txn(&txn, customer_id)? {
            Some(cart_id) => self.storage.get_cart_txn(&txn, &cart_id)?,
            None => None,
        };
        let Some(mut cart) = cart.filter(|c| c.is_active()) else {
            return Err(EngineError::EmptyCart(format!("customer {}", customer_id)));
        };
        if cart.is_empty() {
            return Err(EngineError::EmptyCart(cart.id));
        }

        let credits = input.wallet_amount + input.loyalty_amount;
        if credits > cart.total {
            return Err(EngineError::Validation(format!(
                "wallet and loyalty credits ({}) exceed order total ({})",
                credits, cart.total
            )));
        }

        let now = now_millis();
        let order_number =
            next_number(&self.storage, &txn, NumberKind::Order, self.business_tz, now)?;
        let order = self.build_order(&cart, input, order_number, now);

        let history = StatusHistoryEntry {
            order_id: order.id.clone(),
            sequence: 0,
            from_status: None,
            to_status: OrderStatus::Pending,
            notes: Some("Order created".to_string()),
            actor: None,
            is_system_generated: true,
            created_at: now,
        };
        self.storage.append_history(&txn, history)?;

        // Lock the cart; the next get_or_create starts a fresh one
        cart.status = CartStatus::Converted;
        cart.order_id = Some(order.id.clone());
        cart.converted_at = Some(now);
        cart.updated_at = now;
        self.storage.put_cart(&txn, &cart)?;
        self.storage.release_active_cart(&txn, customer_id)?;

        let invoice_number =
            next_number(&self.storage, &txn, NumberKind::Invoice, self.business_tz, now)?;
        let invoice = Invoice {
            id: new_id(),
            invoice_number,
            order_id: order.id.clone(),
            customer_id: order.customer_id.clone(),
            subtotal: order.subtotal,
            tax: order.tax,
            shipping_cost: order.shipping_cost,
            discount: order.discount
                + order.coupon_discount
                + order.wallet_amount
                + order.loyalty_amount,
            total: order.total,
            paid_amount: order.paid_amount,
            status: order.payment_status,
            issued_at: now,
            updated_at: now,
        };
        self.storage.put_invoice(&txn, &invoice)?;
        self.storage.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            customer_id = %customer_id,
            cart_id = %cart.id,
            invoice_number = %invoice.invoice_number,
            total = %order.total,
            "Order created from cart"
        );
        Ok(order)
    }

    fn build_order(&self, cart: &Cart, input: &CheckoutInput, order_number: String, now: i64) -> Order {
        let items: Vec<OrderItem> = cart
            .lines
            .iter()
            .map(|line| OrderItem {
                id: new_id(),
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                name_localized: None,
                sku: line.sku.clone(),
                image: line.image.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                discount: Decimal::ZERO,
                tax: round2(line.line_total * self.tax_rate),
                total: line.line_total,
                status: OrderStatus::Pending,
            })
            .collect();

        let total = cart.total - input.wallet_amount - input.loyalty_amount;
        // Fully covered by credits counts as paid
        let payment_status = if total <= Decimal::ZERO {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        };

        Order {
            id: new_id(),
            order_number,
            customer_id: cart.customer_id.clone(),
            cart_id: cart.id.clone(),
            status: OrderStatus::Pending,
            items,
            subtotal: cart.subtotal,
            tax: cart.tax,
            shipping_cost: cart.shipping_cost,
            discount: Decimal::ZERO,
            coupon_discount: cart.discount,
            coupon_code: cart.coupon.as_ref().map(|c| c.code.clone()),
            wallet_amount: input.wallet_amount,
            loyalty_amount: input.loyalty_amount,
            total,
            paid_amount: Decimal::ZERO,
            refunded_amount: Decimal::ZERO,
            payment_status,
            payment_method: input.payment_method,
            receipt: PaymentReceipt::default(),
            shipping_address: input.shipping_address.clone(),
            customer_notes: input.customer_notes.clone(),
            shipping_label: None,
            cancellation_reason: None,
            rating: None,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            shipped_at: None,
            delivered_at: None,
            completed_at: None,
            cancelled_at: None,
            refunded_at: None,
        }
    }
}
