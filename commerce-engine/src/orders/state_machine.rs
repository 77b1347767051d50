//! Order State Machine
//!
//! Legal moves live on [`OrderStatus::allowed_transitions`]. A transition
//! re-reads the order inside the write transaction, checks the move,
//! applies the side effects for the target status, propagates the status
//! to every item and appends exactly one history entry. Any failure drops
//! the transaction, so the order and its history never disagree.
//!
//! | Target | Side effect |
//! |--------|-------------|
//! | confirmed | `confirmed_at` |
//! | shipped | `shipped_at`, shipping label (required for admins) |
//! | delivered | `delivered_at` |
//! | completed | `completed_at` |
//! | cancelled | `cancelled_at`, notes become the cancellation reason |
//! | refunded | `refunded_at` |

use super::OrderManager;
use crate::error::{EngineError, EngineResult, Entity};
use crate::storage::{CommerceStorage, StorageError};
use redb::WriteTransaction;
use shared::order::{
    Actor, NoteType, Order, OrderNote, OrderStatus, StatusHistoryEntry, TransitionRequest,
};
use shared::util::{new_id, now_millis};

/// Apply a transition inside the caller's transaction
///
/// Used directly by the shipment ledger so the cascade commits together
/// with the shipment update.
pub(crate) fn apply_transition(
    storage: &CommerceStorage,
    txn: &WriteTransaction,
    order: &mut Order,
    request: &TransitionRequest,
    now: i64,
) -> EngineResult<StatusHistoryEntry> {
    let from = order.status;
    let to = request.status;

    if !from.can_transition_to(to) {
        return Err(EngineError::InvalidTransition {
            entity: Entity::Order,
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    match &request.actor {
        Actor::Customer(customer_id) => {
            if customer_id != &order.customer_id {
                return Err(EngineError::not_found(Entity::Order, order.id.clone()));
            }
            if to != OrderStatus::Cancelled {
                return Err(EngineError::Validation(format!(
                    "customers may only cancel orders, not move them to {}",
                    to
                )));
            }
        }
        Actor::Admin(_) => {
            if to == OrderStatus::Shipped
                && request.shipping_label.is_none()
                && order.shipping_label.is_none()
            {
                return Err(EngineError::ShippingLabelRequired(order.id.clone()));
            }
        }
        Actor::System => {}
    }

    match to {
        OrderStatus::Confirmed => order.confirmed_at = Some(now),
        OrderStatus::Shipped => {
            order.shipped_at = Some(now);
            if let Some(label) = &request.shipping_label {
                order.shipping_label = Some(label.clone());
            }
        }
        OrderStatus::Delivered => order.delivered_at = Some(now),
        OrderStatus::Completed => order.completed_at = Some(now),
        OrderStatus::Cancelled => {
            order.cancelled_at = Some(now);
            order.cancellation_reason = request.notes.clone();
        }
        OrderStatus::Refunded => order.refunded_at = Some(now),
        OrderStatus::Pending
        | OrderStatus::Processing
        | OrderStatus::ReadyForPickup
        | OrderStatus::OutForDelivery => {}
    }

    order.status = to;
    for item in &mut order.items {
        item.status = to;
    }
    order.updated_at = now;

    let entry = storage.append_history(
        txn,
        StatusHistoryEntry {
            order_id: order.id.clone(),
            sequence: 0,
            from_status: Some(from),
            to_status: to,
            notes: request.notes.clone(),
            actor: request.actor.id().map(str::to_string),
            is_system_generated: request.actor.is_system(),
            created_at: now,
        },
    )?;

    if to == OrderStatus::Cancelled
        && let Some(reason) = &request.notes
    {
        storage.append_note(
            txn,
            OrderNote {
                id: new_id(),
                order_id: order.id.clone(),
                sequence: 0,
                note_type: NoteType::System,
                content: format!("Order cancelled: {}", reason),
                author: request.actor.id().map(str::to_string),
                created_at: now,
            },
        )?;
    }

    storage.put_order(txn, order)?;
    Ok(entry)
}

/// Reconstruct the current status from the history ledger
///
/// Fails when the entries do not chain (wrong `from`, illegal move, or a
/// missing initial entry).
pub fn replay_status(history: &[StatusHistoryEntry]) -> EngineResult<OrderStatus> {
    let mut current: Option<OrderStatus> = None;
    for entry in history {
        if entry.from_status != current {
            return Err(EngineError::Validation(format!(
                "history entry {} starts from {:?}, expected {:?}",
                entry.sequence, entry.from_status, current
            )));
        }
        let legal = match current {
            None => entry.to_status == OrderStatus::Pending,
            Some(from) => from.can_transition_to(entry.to_status),
        };
        if !legal {
            return Err(EngineError::Validation(format!(
                "history entry {} is not a legal transition",
                entry.sequence
            )));
        }
        current = Some(entry.to_status);
    }
    current.ok_or_else(|| EngineError::Validation("empty status history".into()))
}

impl OrderManager {
    /// Move an order to a new status
    pub fn transition(&self, order_id: &str, request: TransitionRequest) -> EngineResult<Order> {
        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Order, order_id))?;

        let from = order.status;
        let now = now_millis();
        let entry = apply_transition(&self.storage, &txn, &mut order, &request, now)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %order_id,
            order_number = %order.order_number,
            from = %from,
            to = %order.status,
            actor = ?request.actor,
            sequence = entry.sequence,
            "Order status changed"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seq: u64, from: Option<OrderStatus>, to: OrderStatus) -> StatusHistoryEntry {
        StatusHistoryEntry {
            order_id: "o".into(),
            sequence: seq,
            from_status: from,
            to_status: to,
            notes: None,
            actor: None,
            is_system_generated: false,
            created_at: 0,
        }
    }

    #[test]
    fn test_replay_reconstructs_status() {
        use OrderStatus::*;
        let history = vec![
            entry(1, None, Pending),
            entry(2, Some(Pending), Confirmed),
            entry(3, Some(Confirmed), Processing),
            entry(4, Some(Processing), Shipped),
        ];
        assert_eq!(replay_status(&history).unwrap(), Shipped);
    }

    #[test]
    fn test_replay_rejects_broken_chain() {
        use OrderStatus::*;
        let gap = vec![entry(1, None, Pending), entry(2, Some(Confirmed), Processing)];
        assert!(replay_status(&gap).is_err());

        let illegal = vec![entry(1, None, Pending), entry(2, Some(Pending), Delivered)];
        assert!(replay_status(&illegal).is_err());

        assert!(replay_status(&[]).is_err());
        assert!(replay_status(&[entry(1, None, Confirmed)]).is_err());
    }
}
