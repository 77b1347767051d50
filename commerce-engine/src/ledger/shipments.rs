//! Shipment ledger
//!
//! A shipment reaching `shipped` or `delivered` drives its order to the
//! same status through the state machine, inside the shipment's own
//! transaction. The cascade is skipped when the order is already at or
//! past that status, which makes repeated updates harmless.

use super::Ledger;
use crate::error::{EngineError, EngineResult, Entity};
use crate::numbering::{NumberKind, next_number};
use crate::orders::state_machine::apply_transition;
use crate::storage::StorageError;
use redb::WriteTransaction;
use shared::order::{
    Actor, CarrierInfo, Order, OrderStatus, Shipment, ShipmentItem, ShipmentStatus,
    TransitionRequest,
};
use shared::util::{new_id, now_millis};

/// Order status pushed by a shipment status, if any
fn cascade_target(status: ShipmentStatus) -> Option<OrderStatus> {
    match status {
        ShipmentStatus::Shipped => Some(OrderStatus::Shipped),
        ShipmentStatus::Delivered => Some(OrderStatus::Delivered),
        _ => None,
    }
}

fn stamp(shipment: &mut Shipment, status: ShipmentStatus, now: i64) {
    match status {
        ShipmentStatus::Picked => shipment.picked_at = Some(now),
        ShipmentStatus::Packed => shipment.packed_at = Some(now),
        ShipmentStatus::Shipped => shipment.shipped_at = Some(now),
        ShipmentStatus::Delivered => shipment.delivered_at = Some(now),
        ShipmentStatus::Failed => shipment.failed_at = Some(now),
        ShipmentStatus::Returned => shipment.returned_at = Some(now),
        ShipmentStatus::Pending | ShipmentStatus::InTransit | ShipmentStatus::OutForDelivery => {}
    }
}

impl Ledger {
    /// Create a pending shipment carrying every order item
    pub fn create_shipment(&self, order_id: &str, carrier: CarrierInfo) -> EngineResult<Shipment> {
        if carrier.carrier.trim().is_empty() {
            return Err(EngineError::Validation("carrier is required".into()));
        }

        let txn = self.storage.begin_write()?;
        let order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Order, order_id))?;
        if order.status.is_terminal() {
            return Err(EngineError::Validation(format!(
                "cannot ship {} order {}",
                order.status, order_id
            )));
        }

        let now = now_millis();
        let shipment_number =
            next_number(&self.storage, &txn, NumberKind::Shipment, self.business_tz, now)?;
        let shipment = Shipment {
            id: new_id(),
            shipment_number,
            order_id: order.id.clone(),
            status: ShipmentStatus::Pending,
            carrier,
            items: order
                .items
                .iter()
                .map(|item| ShipmentItem {
                    order_item_id: item.id.clone(),
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    sku: item.sku.clone(),
                    quantity: item.quantity,
                })
                .collect(),
            created_at: now,
            updated_at: now,
            picked_at: None,
            packed_at: None,
            shipped_at: None,
            delivered_at: None,
            failed_at: None,
            returned_at: None,
        };
        self.storage.put_shipment(&txn, &shipment)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %order_id,
            shipment_number = %shipment.shipment_number,
            carrier = %shipment.carrier.carrier,
            items = shipment.items.len(),
            "Shipment created"
        );
        Ok(shipment)
    }

    /// Move a shipment forward, cascading shipped/delivered to the order
    ///
    /// Repeating the current status is a no-op apart from attaching a new
    /// tracking number.
    pub fn update_shipment_status(
        &self,
        shipment_id: &str,
        status: ShipmentStatus,
        tracking_number: Option<String>,
    ) -> EngineResult<Shipment> {
        let txn = self.storage.begin_write()?;
        let mut shipment = self
            .storage
            .get_shipment_txn(&txn, shipment_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Shipment, shipment_id))?;
        let now = now_millis();

        if shipment.status == status {
            let Some(tracking) = tracking_number.filter(|t| {
                shipment.carrier.tracking_number.as_deref() != Some(t.as_str())
            }) else {
                return Ok(shipment);
            };
            shipment.carrier.tracking_number = Some(tracking);
            shipment.updated_at = now;
            self.storage.put_shipment(&txn, &shipment)?;
            txn.commit().map_err(StorageError::from)?;
            return Ok(shipment);
        }

        if !shipment.status.can_transition_to(status) {
            return Err(EngineError::InvalidTransition {
                entity: Entity::Shipment,
                from: shipment.status.to_string(),
                to: status.to_string(),
            });
        }

        let from = shipment.status;
        shipment.status = status;
        stamp(&mut shipment, status, now);
        if let Some(tracking) = tracking_number {
            shipment.carrier.tracking_number = Some(tracking);
        }
        shipment.updated_at = now;
        self.storage.put_shipment(&txn, &shipment)?;

        if let Some(target) = cascade_target(status) {
            self.cascade_to_order(&txn, &shipment, target, now)?;
        }
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            shipment_number = %shipment.shipment_number,
            order_id = %shipment.order_id,
            from = %from,
            to = %status,
            "Shipment status changed"
        );
        Ok(shipment)
    }

    /// Drive the parent order to `target` unless it is already there
    fn cascade_to_order(
        &self,
        txn: &WriteTransaction,
        shipment: &Shipment,
        target: OrderStatus,
        now: i64,
    ) -> EngineResult<()> {
        let mut order: Order = self
            .storage
            .get_order_txn(txn, &shipment.order_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Order, shipment.order_id.clone()))?;

        let reached = match (order.status.fulfilment_rank(), target.fulfilment_rank()) {
            (Some(current), Some(wanted)) => current >= wanted,
            // cancelled / refunded
            _ => true,
        };
        if reached {
            tracing::debug!(
                order_id = %order.id,
                status = %order.status,
                target = %target,
                "Order already at or past shipment status, cascade skipped"
            );
            return Ok(());
        }
        if !order.status.can_transition_to(target) {
            tracing::warn!(
                order_id = %order.id,
                status = %order.status,
                target = %target,
                shipment_number = %shipment.shipment_number,
                "Shipment status cannot drive order, cascade skipped"
            );
            return Ok(());
        }

        let request = TransitionRequest::new(target, Actor::System).with_notes(format!(
            "Shipment {} {}",
            shipment.shipment_number, shipment.status
        ));
        apply_transition(&self.storage, txn, &mut order, &request, now)?;
        tracing::info!(
            order_id = %order.id,
            shipment_number = %shipment.shipment_number,
            to = %target,
            "Order status driven by shipment"
        );
        Ok(())
    }

    pub fn get_shipment(&self, shipment_id: &str) -> EngineResult<Shipment> {
        self.storage
            .get_shipment(shipment_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Shipment, shipment_id))
    }

    /// Shipments for an order, oldest first
    pub fn list_shipments(&self, order_id: &str) -> EngineResult<Vec<Shipment>> {
        if self.storage.get_order(order_id)?.is_none() {
            return Err(EngineError::not_found(Entity::Order, order_id));
        }
        Ok(self.storage.get_shipments_for_order(order_id)?)
    }
}
