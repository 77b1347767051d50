//! Append-only order status history

use super::snapshot::OrderStatus;
use serde::{Deserialize, Serialize};

/// One status transition
///
/// Entries are never edited or deleted. Replaying them in `sequence`
/// order from "no status" reproduces the current order status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    pub order_id: String,
    /// 1-based position within the order's history
    pub sequence: u64,
    /// `None` only for the initial entry written at order creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// User id; `None` for engine-generated entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub is_system_generated: bool,
    pub created_at: i64,
}
