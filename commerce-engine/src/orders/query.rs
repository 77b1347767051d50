//! Order reads and listing

use super::OrderManager;
use crate::error::{EngineError, EngineResult, Entity};
use shared::order::{Invoice, Order, OrderFilter, StatusHistoryEntry};

fn matches(order: &Order, filter: &OrderFilter) -> bool {
    filter
        .customer_id
        .as_ref()
        .is_none_or(|c| &order.customer_id == c)
        && filter.status.is_none_or(|s| order.status == s)
        && filter.payment_status.is_none_or(|p| order.payment_status == p)
        && filter.created_from.is_none_or(|from| order.created_at >= from)
        && filter.created_to.is_none_or(|to| order.created_at < to)
}

impl OrderManager {
    pub fn get_order(&self, order_id: &str) -> EngineResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Order, order_id))
    }

    /// Orders matching `filter`, newest first
    pub fn list_orders(&self, filter: &OrderFilter) -> EngineResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .storage
            .get_all_orders()?
            .into_iter()
            .filter(|o| matches(o, filter))
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_number.cmp(&a.order_number))
        });
        Ok(orders)
    }

    /// Status history, oldest first
    pub fn get_history(&self, order_id: &str) -> EngineResult<Vec<StatusHistoryEntry>> {
        self.get_order(order_id)?;
        Ok(self.storage.get_history(order_id)?)
    }

    pub fn get_invoice_for_order(&self, order_id: &str) -> EngineResult<Invoice> {
        self.storage
            .get_invoice_for_order(order_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Invoice, order_id))
    }
}
