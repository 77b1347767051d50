//! CommerceEngine - the exposed surface
//!
//! Wires storage, oracles and configuration into the cart store,
//! reconciler, order manager and ledgers, and exposes every operation the
//! admin console and storefront layers call.
//!
//! ```ignore
//! let catalog = Arc::new(InMemoryCatalog::new());
//! let engine = CommerceEngine::open(Config::from_env(), Oracles::from_catalog(catalog))?;
//!
//! let report = engine.sync_cart("cust-1", &client_lines).await?;
//! let order = engine.checkout("cust-1", &checkout)?;
//! engine.transition(&order.id, TransitionRequest::new(OrderStatus::Confirmed, admin))?;
//! ```

use crate::cart::{CartReconciler, CartStore, PricingRules};
use crate::core::Config;
use crate::error::EngineResult;
use crate::oracles::Oracles;
use crate::orders::OrderManager;
use crate::ledger::Ledger;
use crate::storage::CommerceStorage;
use crate::utils::RetryPolicy;
use crate::utils::logger::init_logger_with_file;
use rust_decimal::Decimal;
use shared::models::{Cart, ClientCartLine, SyncReport};
use shared::order::{
    CarrierInfo, CheckoutInput, Invoice, NoteType, Order, OrderFilter, OrderNote, Payment,
    PaymentMethod, Shipment, ShipmentStatus, StatusHistoryEntry, TransitionRequest,
};
use shared::util::now_millis;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct CommerceEngine {
    config: Config,
    storage: CommerceStorage,
    carts: CartStore,
    reconciler: CartReconciler,
    orders: OrderManager,
    ledger: Ledger,
}

impl CommerceEngine {
    /// Full startup: work directory, logging from `config`, then storage
    pub fn bootstrap(config: Config, oracles: Oracles) -> EngineResult<Self> {
        config.ensure_work_dir_structure()?;
        let log_dir = config.log_dir();
        init_logger_with_file(Some(config.log_level.as_str()), Some(log_dir.as_path()));
        Self::open(config, oracles)
    }

    /// Open the on-disk database under `config.work_dir`
    pub fn open(config: Config, oracles: Oracles) -> EngineResult<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let path = config.database_path();
        let storage = CommerceStorage::open(&path)?;
        tracing::info!(path = %path.display(), "Commerce storage opened");
        Ok(Self::with_storage(storage, config, oracles))
    }

    /// Engine over an in-memory database (tests, demos)
    pub fn in_memory(config: Config, oracles: Oracles) -> EngineResult<Self> {
        let storage = CommerceStorage::open_in_memory()?;
        Ok(Self::with_storage(storage, config, oracles))
    }

    pub fn with_storage(storage: CommerceStorage, config: Config, oracles: Oracles) -> Self {
        let carts = CartStore::new(
            storage.clone(),
            oracles.clone(),
            PricingRules::from_config(&config),
            RetryPolicy::from_config(&config),
            config.oracle_timeout(),
        );
        let reconciler = CartReconciler::new(
            carts.clone(),
            oracles,
            config.price_epsilon,
            config.oracle_timeout(),
        );
        let orders = OrderManager::new(storage.clone(), config.business_tz, config.tax_rate);
        let ledger = Ledger::new(storage.clone(), config.business_tz);

        Self {
            config,
            storage,
            carts,
            reconciler,
            orders,
            ledger,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &CommerceStorage {
        &self.storage
    }

    // ========== Cart ==========

    pub async fn get_or_create_cart(&self, customer_id: &str) -> EngineResult<Cart> {
        self.carts.get_or_create(customer_id).await
    }

    pub fn get_cart(&self, cart_id: &str) -> EngineResult<Cart> {
        self.carts.get_cart(cart_id)
    }

    pub async fn add_line(&self, cart_id: &str, product_id: &str, quantity: i32) -> EngineResult<Cart> {
        self.carts.add_line(cart_id, product_id, quantity).await
    }

    pub async fn update_line_quantity(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> EngineResult<Cart> {
        self.carts.update_line_quantity(cart_id, product_id, quantity).await
    }

    pub fn remove_line(&self, cart_id: &str, product_id: &str) -> EngineResult<Cart> {
        self.carts.remove_line(cart_id, product_id)
    }

    pub fn clear_cart(&self, cart_id: &str) -> EngineResult<Cart> {
        self.carts.clear(cart_id)
    }

    pub fn apply_coupon(&self, cart_id: &str, code: &str, discount_amount: Decimal) -> EngineResult<Cart> {
        self.carts.apply_coupon(cart_id, code, discount_amount)
    }

    pub fn remove_coupon(&self, cart_id: &str) -> EngineResult<Cart> {
        self.carts.remove_coupon(cart_id)
    }

    /// Reconcile a client-cached cart; see [`CartReconciler::sync`]
    pub async fn sync_cart(
        &self,
        customer_id: &str,
        client_lines: &[ClientCartLine],
    ) -> EngineResult<SyncReport> {
        self.reconciler.sync(customer_id, client_lines).await
    }

    /// Active carts idle longer than `CART_ABANDON_AFTER_SECS`
    pub fn list_abandoned_carts(&self) -> EngineResult<Vec<Cart>> {
        self.list_abandoned_carts_at(now_millis())
    }

    pub fn list_abandoned_carts_at(&self, now: i64) -> EngineResult<Vec<Cart>> {
        self.carts
            .list_abandoned(now, self.config.cart_abandon_window_ms())
    }

    // ========== Orders ==========

    /// Create an order from the customer's active cart
    pub fn checkout(&self, customer_id: &str, input: &CheckoutInput) -> EngineResult<Order> {
        self.orders.create_from_cart(customer_id, input)
    }

    pub fn transition(&self, order_id: &str, request: TransitionRequest) -> EngineResult<Order> {
        self.orders.transition(order_id, request)
    }

    pub fn get_order(&self, order_id: &str) -> EngineResult<Order> {
        self.orders.get_order(order_id)
    }

    pub fn list_orders(&self, filter: &OrderFilter) -> EngineResult<Vec<Order>> {
        self.orders.list_orders(filter)
    }

    pub fn get_history(&self, order_id: &str) -> EngineResult<Vec<StatusHistoryEntry>> {
        self.orders.get_history(order_id)
    }

    pub fn get_invoice_for_order(&self, order_id: &str) -> EngineResult<Invoice> {
        self.orders.get_invoice_for_order(order_id)
    }

    pub fn add_note(
        &self,
        order_id: &str,
        note_type: NoteType,
        content: &str,
        author: Option<&str>,
    ) -> EngineResult<OrderNote> {
        self.orders.add_note(order_id, note_type, content, author)
    }

    pub fn list_notes(&self, order_id: &str) -> EngineResult<Vec<OrderNote>> {
        self.orders.list_notes(order_id)
    }

    pub fn rate_order(
        &self,
        order_id: &str,
        customer_id: &str,
        score: u8,
        comment: Option<String>,
    ) -> EngineResult<Order> {
        self.orders.rate_order(order_id, customer_id, score, comment)
    }

    // ========== Payments ==========

    pub fn record_payment(
        &self,
        order_id: &str,
        amount: Decimal,
        method: PaymentMethod,
        metadata: BTreeMap<String, String>,
        recorded_by: Option<&str>,
    ) -> EngineResult<Payment> {
        self.ledger
            .record_payment(order_id, amount, method, metadata, recorded_by)
    }

    pub fn submit_receipt(&self, order_id: &str, customer_id: &str, reference: &str) -> EngineResult<Order> {
        self.ledger.submit_receipt(order_id, customer_id, reference)
    }

    pub fn verify_payment(
        &self,
        order_id: &str,
        verified: bool,
        reviewer_id: &str,
        rejection_reason: Option<String>,
    ) -> EngineResult<Order> {
        self.ledger
            .verify_payment(order_id, verified, reviewer_id, rejection_reason)
    }

    pub fn refund_payment(
        &self,
        payment_id: &str,
        amount: Decimal,
        reason: Option<String>,
    ) -> EngineResult<Payment> {
        self.ledger.refund_payment(payment_id, amount, reason)
    }

    pub fn get_payment(&self, payment_id: &str) -> EngineResult<Payment> {
        self.ledger.get_payment(payment_id)
    }

    pub fn list_payments(&self, order_id: &str) -> EngineResult<Vec<Payment>> {
        self.ledger.list_payments(order_id)
    }

    // ========== Shipments ==========

    pub fn create_shipment(&self, order_id: &str, carrier: CarrierInfo) -> EngineResult<Shipment> {
        self.ledger.create_shipment(order_id, carrier)
    }

    pub fn update_shipment_status(
        &self,
        shipment_id: &str,
        status: ShipmentStatus,
        tracking_number: Option<String>,
    ) -> EngineResult<Shipment> {
        self.ledger
            .update_shipment_status(shipment_id, status, tracking_number)
    }

    pub fn get_shipment(&self, shipment_id: &str) -> EngineResult<Shipment> {
        self.ledger.get_shipment(shipment_id)
    }

    pub fn list_shipments(&self, order_id: &str) -> EngineResult<Vec<Shipment>> {
        self.ledger.list_shipments(order_id)
    }
}

#[cfg(test)]
mod tests;
