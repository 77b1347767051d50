//! Customer rating after delivery

use super::OrderManager;
use crate::error::{EngineError, EngineResult, Entity};
use crate::storage::StorageError;
use shared::order::{Order, OrderRating, OrderStatus};
use shared::util::now_millis;

impl OrderManager {
    /// Rate a delivered or completed order, once
    pub fn rate_order(
        &self,
        order_id: &str,
        customer_id: &str,
        score: u8,
        comment: Option<String>,
    ) -> EngineResult<Order> {
        if !(1..=5).contains(&score) {
            return Err(EngineError::Validation(format!(
                "rating must be between 1 and 5, got {}",
                score
            )));
        }

        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .filter(|o| o.customer_id == customer_id)
            .ok_or_else(|| EngineError::not_found(Entity::Order, order_id))?;

        if !matches!(order.status, OrderStatus::Delivered | OrderStatus::Completed) {
            return Err(EngineError::Validation(format!(
                "order {} cannot be rated while {}",
                order_id, order.status
            )));
        }
        if order.rating.is_some() {
            return Err(EngineError::AlreadyRated(order_id.to_string()));
        }

        let now = now_millis();
        order.rating = Some(OrderRating {
            score,
            comment: comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            rated_at: now,
        });
        order.updated_at = now;
        self.storage.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id = %order_id, score = score, "Order rated");
        Ok(order)
    }
}
