// shared/src/models/sync.rs
//! Cart sync request/response types
//!
//! The diff lists explain to the client UI what the server changed while
//! reconciling its locally cached cart. They are returned, never stored.

use super::cart::Cart;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A cart line as the client remembers it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientCartLine {
    pub product_id: String,
    pub quantity: i32,
    /// Price the client last saw; only used for drift detection
    pub unit_price: Decimal,
}

/// Why a submitted line was dropped
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Product no longer exists
    Deleted,
    /// Product exists but is inactive or unpublished
    Inactive,
    OutOfStock,
    /// Lookup failed or timed out for this line
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemovedLine {
    pub product_id: String,
    pub reason: RemovalReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceChange {
    pub product_id: String,
    pub old_price: Decimal,
    pub new_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuantityAdjustment {
    pub product_id: String,
    pub requested: i32,
    pub available: i32,
    #[serde(rename = "final")]
    pub final_quantity: i32,
}

/// Result of a cart sync
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncReport {
    pub cart: Cart,
    pub removed_items: Vec<RemovedLine>,
    pub price_changed_items: Vec<PriceChange>,
    pub quantity_adjusted_items: Vec<QuantityAdjustment>,
}

impl SyncReport {
    /// True when the server accepted the client's cart as-is
    pub fn is_clean(&self) -> bool {
        self.removed_items.is_empty()
            && self.price_changed_items.is_empty()
            && self.quantity_adjusted_items.is_empty()
    }
}
