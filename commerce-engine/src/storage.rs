//! redb-based storage layer
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `carts` | `cart_id` | `Cart` | All carts, active and converted |
//! | `active_carts` | `customer_id` | `cart_id` | One active cart per customer |
//! | `orders` | `order_id` | `Order` | Order aggregates |
//! | `status_history` | `(order_id, seq)` | `StatusHistoryEntry` | Append-only transitions |
//! | `invoices` | `invoice_id` | `Invoice` | Invoices |
//! | `invoices_by_order` | `order_id` | `invoice_id` | Invoice lookup |
//! | `shipments` | `shipment_id` | `Shipment` | Shipments |
//! | `payments` | `payment_id` | `Payment` | Payments |
//! | `order_notes` | `(order_id, seq)` | `OrderNote` | Append-only notes |
//! | `counters` | `"<kind>:<window>"` | `u64` | Human-readable numbering |
//!
//! # Atomicity
//!
//! redb allows one write transaction at a time. Every engine operation
//! reads, checks and writes inside a single `WriteTransaction`, so a
//! check such as "order is still `processing`" cannot go stale before the
//! write lands. Dropping a transaction without `commit()` discards it.

use redb::{
    AccessGuard, Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::Cart;
use shared::order::{Invoice, Order, OrderNote, Payment, Shipment, StatusHistoryEntry};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for carts: key = cart_id, value = JSON-serialized Cart
const CARTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("carts");

/// Active cart index: key = customer_id, value = cart_id
const ACTIVE_CARTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("active_carts");

/// Table for orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Status history: key = (order_id, sequence), value = JSON-serialized StatusHistoryEntry
const HISTORY_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("status_history");

/// Table for invoices: key = invoice_id, value = JSON-serialized Invoice
const INVOICES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("invoices");

/// Invoice index: key = order_id, value = invoice_id
const INVOICES_BY_ORDER_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("invoices_by_order");

/// Table for shipments: key = shipment_id, value = JSON-serialized Shipment
const SHIPMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("shipments");

/// Table for payments: key = payment_id, value = JSON-serialized Payment
const PAYMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("payments");

/// Order notes: key = (order_id, sequence), value = JSON-serialized OrderNote
const NOTES_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("order_notes");

/// Numbering counters: key = "<kind>:<window>", value = last issued sequence
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unique index already points elsewhere
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

fn decode<T: DeserializeOwned>(guard: Option<AccessGuard<'_, &'static [u8]>>) -> StorageResult<Option<T>> {
    match guard {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Commerce storage backed by redb
#[derive(Clone)]
pub struct CommerceStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for CommerceStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceStorage").finish_non_exhaustive()
    }
}

impl CommerceStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once
    /// `commit()` returns, the write survives a crash.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CARTS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_CARTS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(HISTORY_TABLE)?;
            let _ = write_txn.open_table(INVOICES_TABLE)?;
            let _ = write_txn.open_table(INVOICES_BY_ORDER_TABLE)?;
            let _ = write_txn.open_table(SHIPMENTS_TABLE)?;
            let _ = write_txn.open_table(PAYMENTS_TABLE)?;
            let _ = write_txn.open_table(NOTES_TABLE)?;
            let _ = write_txn.open_table(COUNTERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Carts ==========

    pub fn get_cart(&self, cart_id: &str) -> StorageResult<Option<Cart>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;
        decode(table.get(cart_id)?)
    }

    pub fn get_cart_txn(&self, txn: &WriteTransaction, cart_id: &str) -> StorageResult<Option<Cart>> {
        let table = txn.open_table(CARTS_TABLE)?;
        decode(table.get(cart_id)?)
    }

    /// Insert or replace a cart document
    pub fn put_cart(&self, txn: &WriteTransaction, cart: &Cart) -> StorageResult<()> {
        let mut table = txn.open_table(CARTS_TABLE)?;
        let value = encode(cart)?;
        table.insert(cart.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Active cart id for a customer (read-only)
    pub fn active_cart_id(&self, customer_id: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_CARTS_TABLE)?;
        Ok(table.get(customer_id)?.map(|g| g.value().to_string()))
    }

    pub fn active_cart_id_txn(
        &self,
        txn: &WriteTransaction,
        customer_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(ACTIVE_CARTS_TABLE)?;
        Ok(table.get(customer_id)?.map(|g| g.value().to_string()))
    }

    /// Claim the active-cart slot for a customer
    ///
    /// Fails with [`StorageError::DuplicateKey`] when another cart already
    /// holds the slot.
    pub fn claim_active_cart(
        &self,
        txn: &WriteTransaction,
        customer_id: &str,
        cart_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_CARTS_TABLE)?;
        if let Some(existing) = table.get(customer_id)?
            && existing.value() != cart_id
        {
            return Err(StorageError::DuplicateKey(format!(
                "active cart for customer {}",
                customer_id
            )));
        }
        table.insert(customer_id, cart_id)?;
        Ok(())
    }

    /// Release the active-cart slot (on conversion)
    pub fn release_active_cart(&self, txn: &WriteTransaction, customer_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_CARTS_TABLE)?;
        table.remove(customer_id)?;
        Ok(())
    }

    /// All active carts (for abandonment reports)
    pub fn get_active_carts(&self) -> StorageResult<Vec<Cart>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACTIVE_CARTS_TABLE)?;
        let carts = read_txn.open_table(CARTS_TABLE)?;

        let mut result = Vec::new();
        for entry in index.iter()? {
            let (_customer, cart_id) = entry?;
            if let Some(cart) = decode::<Cart>(carts.get(cart_id.value())?)? {
                result.push(cart);
            }
        }
        Ok(result)
    }

    // ========== Orders ==========

    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        decode(table.get(order_id)?)
    }

    pub fn get_order_txn(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        decode(table.get(order_id)?)
    }

    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = encode(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// All orders (unordered)
    pub fn get_all_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for entry in table.iter()? {
            let (_key, value) = entry?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }

    // ========== Status History ==========

    /// Append a history entry, assigning the next per-order sequence
    pub fn append_history(
        &self,
        txn: &WriteTransaction,
        mut entry: StatusHistoryEntry,
    ) -> StorageResult<StatusHistoryEntry> {
        let mut table = txn.open_table(HISTORY_TABLE)?;
        let order_id = entry.order_id.clone();
        let last = table
            .range((order_id.as_str(), 0u64)..=(order_id.as_str(), u64::MAX))?
            .next_back()
            .transpose()?
            .map(|(key, _)| key.value().1)
            .unwrap_or(0);
        entry.sequence = last + 1;
        let value = encode(&entry)?;
        table.insert((order_id.as_str(), entry.sequence), value.as_slice())?;
        Ok(entry)
    }

    /// History for an order, oldest first
    pub fn get_history(&self, order_id: &str) -> StorageResult<Vec<StatusHistoryEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY_TABLE)?;

        let mut entries = Vec::new();
        for result in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    // ========== Invoices ==========

    pub fn put_invoice(&self, txn: &WriteTransaction, invoice: &Invoice) -> StorageResult<()> {
        let mut table = txn.open_table(INVOICES_TABLE)?;
        let value = encode(invoice)?;
        table.insert(invoice.id.as_str(), value.as_slice())?;

        let mut index = txn.open_table(INVOICES_BY_ORDER_TABLE)?;
        index.insert(invoice.order_id.as_str(), invoice.id.as_str())?;
        Ok(())
    }

    pub fn get_invoice_for_order(&self, order_id: &str) -> StorageResult<Option<Invoice>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(INVOICES_BY_ORDER_TABLE)?;
        let Some(invoice_id) = index.get(order_id)? else {
            return Ok(None);
        };
        let table = read_txn.open_table(INVOICES_TABLE)?;
        decode(table.get(invoice_id.value())?)
    }

    pub fn get_invoice_for_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Invoice>> {
        let index = txn.open_table(INVOICES_BY_ORDER_TABLE)?;
        let Some(invoice_id) = index.get(order_id)? else {
            return Ok(None);
        };
        let table = txn.open_table(INVOICES_TABLE)?;
        decode(table.get(invoice_id.value())?)
    }

    // ========== Shipments ==========

    pub fn put_shipment(&self, txn: &WriteTransaction, shipment: &Shipment) -> StorageResult<()> {
        let mut table = txn.open_table(SHIPMENTS_TABLE)?;
        let value = encode(shipment)?;
        table.insert(shipment.id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_shipment(&self, shipment_id: &str) -> StorageResult<Option<Shipment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SHIPMENTS_TABLE)?;
        decode(table.get(shipment_id)?)
    }

    pub fn get_shipment_txn(
        &self,
        txn: &WriteTransaction,
        shipment_id: &str,
    ) -> StorageResult<Option<Shipment>> {
        let table = txn.open_table(SHIPMENTS_TABLE)?;
        decode(table.get(shipment_id)?)
    }

    /// Shipments for an order, oldest first
    pub fn get_shipments_for_order(&self, order_id: &str) -> StorageResult<Vec<Shipment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SHIPMENTS_TABLE)?;

        let mut shipments = Vec::new();
        for entry in table.iter()? {
            let (_key, value) = entry?;
            let shipment: Shipment = serde_json::from_slice(value.value())?;
            if shipment.order_id == order_id {
                shipments.push(shipment);
            }
        }
        shipments.sort_by_key(|s| s.created_at);
        Ok(shipments)
    }

    // ========== Payments ==========

    pub fn put_payment(&self, txn: &WriteTransaction, payment: &Payment) -> StorageResult<()> {
        let mut table = txn.open_table(PAYMENTS_TABLE)?;
        let value = encode(payment)?;
        table.insert(payment.id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_payment(&self, payment_id: &str) -> StorageResult<Option<Payment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENTS_TABLE)?;
        decode(table.get(payment_id)?)
    }

    pub fn get_payment_txn(
        &self,
        txn: &WriteTransaction,
        payment_id: &str,
    ) -> StorageResult<Option<Payment>> {
        let table = txn.open_table(PAYMENTS_TABLE)?;
        decode(table.get(payment_id)?)
    }

    /// Payments for an order, oldest first
    pub fn get_payments_for_order(&self, order_id: &str) -> StorageResult<Vec<Payment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENTS_TABLE)?;

        let mut payments = Vec::new();
        for entry in table.iter()? {
            let (_key, value) = entry?;
            let payment: Payment = serde_json::from_slice(value.value())?;
            if payment.order_id == order_id {
                payments.push(payment);
            }
        }
        payments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.payment_number.cmp(&b.payment_number))
        });
        Ok(payments)
    }

    // ========== Notes ==========

    /// Append a note, assigning the next per-order sequence
    pub fn append_note(&self, txn: &WriteTransaction, mut note: OrderNote) -> StorageResult<OrderNote> {
        let mut table = txn.open_table(NOTES_TABLE)?;
        let order_id = note.order_id.clone();
        let last = table
            .range((order_id.as_str(), 0u64)..=(order_id.as_str(), u64::MAX))?
            .next_back()
            .transpose()?
            .map(|(key, _)| key.value().1)
            .unwrap_or(0);
        note.sequence = last + 1;
        let value = encode(&note)?;
        table.insert((order_id.as_str(), note.sequence), value.as_slice())?;
        Ok(note)
    }

    /// Notes for an order, oldest first
    pub fn get_notes(&self, order_id: &str) -> StorageResult<Vec<OrderNote>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NOTES_TABLE)?;

        let mut notes = Vec::new();
        for result in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (_key, value) = result?;
            notes.push(serde_json::from_slice(value.value())?);
        }
        Ok(notes)
    }

    // ========== Counters ==========

    /// Increment and return a counter (within transaction)
    ///
    /// Returns the NEW value; the first call for a key returns 1.
    pub fn increment_counter(&self, txn: &WriteTransaction, key: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table.get(key)?.map(|g| g.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key, next)?;
        Ok(next)
    }

    /// Current counter value (read-only)
    pub fn get_counter(&self, key: &str) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COUNTERS_TABLE)?;
        Ok(table.get(key)?.map(|g| g.value()).unwrap_or(0))
    }
}
