//! Order lifecycle types
//!
//! - [`Order`] aggregate with embedded [`OrderItem`]s
//! - [`StatusHistoryEntry`] append-only transition ledger
//! - [`Invoice`], [`Payment`], [`Shipment`] side records
//! - [`OrderNote`] annotations

pub mod history;
pub mod ledger;
pub mod note;
pub mod snapshot;
pub mod types;

pub use history::StatusHistoryEntry;
pub use ledger::{
    Invoice, Payment, PaymentRecordStatus, Shipment, ShipmentItem, ShipmentStatus,
};
pub use note::{NoteType, OrderNote};
pub use snapshot::{
    Order, OrderItem, OrderRating, OrderStatus, PaymentReceipt, PaymentStatus, VerificationStatus,
};
pub use types::{
    Actor, AddressSnapshot, CarrierInfo, CheckoutInput, OrderFilter, PaymentMethod,
    TransitionRequest,
};
