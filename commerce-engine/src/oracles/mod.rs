//! External collaborators consulted by the cart
//!
//! The catalog, warehouse, pricing and customer services are owned
//! elsewhere; the engine only sees these traits. [`memory::InMemoryCatalog`]
//! implements all four for tests and local runs.

pub mod memory;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::ProductInfo;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use memory::InMemoryCatalog;

/// Oracle call failure
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("oracle timed out after {0} ms")]
    Timeout(u64),
}

pub type OracleResult<T> = Result<T, OracleError>;

/// Bound a single oracle call
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> OracleResult<T>
where
    F: Future<Output = OracleResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout(timeout.as_millis() as u64)),
    }
}

/// Warehouse stock
#[async_trait]
pub trait StockOracle: Send + Sync {
    /// Currently available (non-reserved) quantity, >= 0
    async fn available_quantity(&self, product_id: &str) -> OracleResult<i32>;
}

/// Tiered pricing
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Current unit price for a customer price tier
    async fn price(&self, product_id: &str, price_tier_id: &str) -> OracleResult<Decimal>;
}

/// Catalog lookup
#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// `None` when the product does not exist (inactive products are returned)
    async fn find_product(&self, product_id: &str) -> OracleResult<Option<ProductInfo>>;
}

/// Customer directory
#[async_trait]
pub trait CustomerLookup: Send + Sync {
    async fn find_tier(&self, customer_id: &str) -> OracleResult<String>;
}

/// All oracles the cart needs, shared by the store and the reconciler
#[derive(Clone)]
pub struct Oracles {
    pub stock: Arc<dyn StockOracle>,
    pub prices: Arc<dyn PriceOracle>,
    pub products: Arc<dyn ProductLookup>,
    pub customers: Arc<dyn CustomerLookup>,
}

impl Oracles {
    pub fn new(
        stock: Arc<dyn StockOracle>,
        prices: Arc<dyn PriceOracle>,
        products: Arc<dyn ProductLookup>,
        customers: Arc<dyn CustomerLookup>,
    ) -> Self {
        Self {
            stock,
            prices,
            products,
            customers,
        }
    }

    /// Use one in-memory catalog for every oracle
    pub fn from_catalog(catalog: Arc<InMemoryCatalog>) -> Self {
        Self {
            stock: catalog.clone(),
            prices: catalog.clone(),
            products: catalog.clone(),
            customers: catalog,
        }
    }
}

impl std::fmt::Debug for Oracles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oracles").finish_non_exhaustive()
    }
}
