//! In-memory catalog implementing every oracle
//!
//! Holds products, stock levels, tier prices and customer tiers behind a
//! `parking_lot::RwLock`. Failures and latency can be injected per product
//! to exercise the reconciler's degraded paths.

use super::{
    CustomerLookup, OracleError, OracleResult, PriceOracle, ProductLookup, StockOracle,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use shared::models::{ProductInfo, ProductStatus};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Tier used for customers without an explicit assignment
pub const DEFAULT_TIER: &str = "default";

#[derive(Debug, Default)]
struct CatalogInner {
    products: HashMap<String, ProductInfo>,
    stock: HashMap<String, i32>,
    /// (product_id, tier) -> price
    tier_prices: HashMap<(String, String), Decimal>,
    customer_tiers: HashMap<String, String>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<CatalogInner>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a published, active product with stock
    pub fn upsert_product(&self, id: &str, name: &str, base_price: Decimal, stock: i32) {
        let product = ProductInfo {
            id: id.to_string(),
            name: name.to_string(),
            name_localized: None,
            sku: format!("SKU-{}", id.to_uppercase()),
            image: None,
            is_active: true,
            status: ProductStatus::Published,
            base_price,
        };
        let mut inner = self.inner.write();
        inner.products.insert(id.to_string(), product);
        inner.stock.insert(id.to_string(), stock);
    }

    pub fn insert_product(&self, product: ProductInfo) {
        self.inner.write().products.insert(product.id.clone(), product);
    }

    pub fn remove_product(&self, id: &str) {
        self.inner.write().products.remove(id);
    }

    pub fn set_active(&self, id: &str, is_active: bool) {
        if let Some(product) = self.inner.write().products.get_mut(id) {
            product.is_active = is_active;
        }
    }

    pub fn set_status(&self, id: &str, status: ProductStatus) {
        if let Some(product) = self.inner.write().products.get_mut(id) {
            product.status = status;
        }
    }

    pub fn set_stock(&self, id: &str, available: i32) {
        self.inner.write().stock.insert(id.to_string(), available);
    }

    /// Change the base price (what tierless customers pay)
    pub fn set_base_price(&self, id: &str, price: Decimal) {
        if let Some(product) = self.inner.write().products.get_mut(id) {
            product.base_price = price;
        }
    }

    pub fn set_tier_price(&self, id: &str, tier: &str, price: Decimal) {
        self.inner
            .write()
            .tier_prices
            .insert((id.to_string(), tier.to_string()), price);
    }

    pub fn set_customer_tier(&self, customer_id: &str, tier: &str) {
        self.inner
            .write()
            .customer_tiers
            .insert(customer_id.to_string(), tier.to_string());
    }

    /// Make stock and price lookups for this product fail
    pub fn fail_product(&self, id: &str) {
        self.inner.write().failing.insert(id.to_string());
    }

    /// Delay stock lookups for this product
    pub fn delay_product(&self, id: &str, delay: Duration) {
        self.inner.write().delays.insert(id.to_string(), delay);
    }

    fn check_failure(&self, product_id: &str) -> OracleResult<()> {
        if self.inner.read().failing.contains(product_id) {
            return Err(OracleError::Unavailable(format!(
                "lookup failed for product {}",
                product_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StockOracle for InMemoryCatalog {
    async fn available_quantity(&self, product_id: &str) -> OracleResult<i32> {
        let delay = self.inner.read().delays.get(product_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure(product_id)?;
        Ok(self
            .inner
            .read()
            .stock
            .get(product_id)
            .copied()
            .unwrap_or(0)
            .max(0))
    }
}

#[async_trait]
impl PriceOracle for InMemoryCatalog {
    async fn price(&self, product_id: &str, price_tier_id: &str) -> OracleResult<Decimal> {
        self.check_failure(product_id)?;
        let inner = self.inner.read();
        if let Some(price) = inner
            .tier_prices
            .get(&(product_id.to_string(), price_tier_id.to_string()))
        {
            return Ok(*price);
        }
        inner
            .products
            .get(product_id)
            .map(|p| p.base_price)
            .ok_or_else(|| OracleError::Unavailable(format!("no price for product {}", product_id)))
    }
}

#[async_trait]
impl ProductLookup for InMemoryCatalog {
    async fn find_product(&self, product_id: &str) -> OracleResult<Option<ProductInfo>> {
        Ok(self.inner.read().products.get(product_id).cloned())
    }
}

#[async_trait]
impl CustomerLookup for InMemoryCatalog {
    async fn find_tier(&self, customer_id: &str) -> OracleResult<String> {
        Ok(self
            .inner
            .read()
            .customer_tiers
            .get(customer_id)
            .cloned()
            .unwrap_or_else(|| DEFAULT_TIER.to_string()))
    }
}
