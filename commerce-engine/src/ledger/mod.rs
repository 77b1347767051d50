//! Payment & Shipment Ledgers
//!
//! - `payments` - record, receipt upload/verification, refund
//! - `shipments` - create, status updates, cascade to the order

pub mod payments;
pub mod shipments;

use crate::storage::CommerceStorage;
use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct Ledger {
    storage: CommerceStorage,
    business_tz: Tz,
}

impl Ledger {
    pub fn new(storage: CommerceStorage, business_tz: Tz) -> Self {
        Self {
            storage,
            business_tz,
        }
    }
}
