//! Cart Store
//!
//! One active cart per customer, created lazily. Every mutation runs in a
//! single write transaction that reloads the cart, refuses converted carts,
//! applies the change, recomputes aggregates and stamps `last_activity_at`.

use super::totals::PricingRules;
use crate::error::{EngineError, EngineResult, Entity};
use crate::money;
use crate::oracles::{Oracles, with_timeout};
use crate::storage::{CommerceStorage, StorageError};
use crate::utils::retry::{RetryPolicy, retry_with_backoff};
use rust_decimal::Decimal;
use shared::models::{AppliedCoupon, Cart, CartLine, ProductInfo};
use shared::util::{new_id, now_millis};
use std::time::Duration;

/// Current server-side view of a product for a given customer
struct ResolvedProduct {
    product: ProductInfo,
    available: i32,
    unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct CartStore {
    storage: CommerceStorage,
    oracles: Oracles,
    rules: PricingRules,
    retry: RetryPolicy,
    oracle_timeout: Duration,
}

impl CartStore {
    pub fn new(
        storage: CommerceStorage,
        oracles: Oracles,
        rules: PricingRules,
        retry: RetryPolicy,
        oracle_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            oracles,
            rules,
            retry,
            oracle_timeout,
        }
    }

    pub fn rules(&self) -> &PricingRules {
        &self.rules
    }

    // ========== Reads ==========

    pub fn get_cart(&self, cart_id: &str) -> EngineResult<Cart> {
        self.storage
            .get_cart(cart_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Cart, cart_id))
    }

    /// Return the customer's active cart, creating an empty one if needed
    ///
    /// A concurrent creation for the same customer loses the race on the
    /// `active_carts` index and is retried; the retry then finds the
    /// winner's cart.
    pub async fn get_or_create(&self, customer_id: &str) -> EngineResult<Cart> {
        if customer_id.trim().is_empty() {
            return Err(EngineError::Validation("customer_id is required".into()));
        }
        retry_with_backoff(&self.retry, "cart.get_or_create", || async {
            self.try_get_or_create(customer_id)
        })
        .await
    }

    fn try_get_or_create(&self, customer_id: &str) -> EngineResult<Cart> {
        // An index entry pointing at a missing or converted cart is stale
        let stale = match self.storage.active_cart_id(customer_id)? {
            Some(cart_id) => match self.storage.get_cart(&cart_id)? {
                Some(cart) if cart.is_active() => return Ok(cart),
                _ => true,
            },
            None => false,
        };

        let now = now_millis();
        let cart = Cart::new(new_id(), customer_id.to_string(), now);

        let txn = self.storage.begin_write()?;
        if stale {
            self.storage.release_active_cart(&txn, customer_id)?;
        }
        self.storage.claim_active_cart(&txn, customer_id, &cart.id)?;
        self.storage.put_cart(&txn, &cart)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(customer_id = %customer_id, cart_id = %cart.id, "Cart created");
        Ok(cart)
    }

    /// Active carts idle longer than `window_ms` (read-only classification)
    pub fn list_abandoned(&self, now: i64, window_ms: i64) -> EngineResult<Vec<Cart>> {
        let mut carts: Vec<Cart> = self
            .storage
            .get_active_carts()?
            .into_iter()
            .filter(|c| c.is_abandoned(now, window_ms))
            .collect();
        carts.sort_by_key(|c| c.last_activity_at);
        Ok(carts)
    }

    // ========== Mutations ==========

    /// Add a product, merging with an existing line for the same product
    ///
    /// The line is priced from the customer's tier. Exceeding available
    /// stock is rejected here; only sync clamps.
    pub async fn add_line(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> EngineResult<Cart> {
        money::validate_quantity(quantity)?;
        let cart = self.get_cart(cart_id)?;
        if !cart.is_active() {
            return Err(EngineError::CartNotActive(cart_id.to_string()));
        }
        let resolved = self.resolve_product(&cart.customer_id, product_id).await?;

        self.mutate(cart_id, |cart, now| {
            let existing = cart.lines.iter().position(|l| l.product_id == product_id);
            let merged = existing.map(|i| cart.lines[i].quantity).unwrap_or(0) + quantity;
            money::validate_quantity(merged)?;
            if merged > resolved.available {
                return Err(EngineError::InsufficientStock {
                    product_id: product_id.to_string(),
                    requested: merged,
                    available: resolved.available,
                });
            }

            let product = &resolved.product;
            match existing {
                Some(i) => {
                    let line = &mut cart.lines[i];
                    line.quantity = merged;
                    line.unit_price = resolved.unit_price;
                    line.name = product.name.clone();
                    line.sku = product.sku.clone();
                    line.image = product.image.clone();
                }
                None => cart.lines.push(CartLine {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    sku: product.sku.clone(),
                    image: product.image.clone(),
                    quantity: merged,
                    unit_price: resolved.unit_price,
                    line_total: Decimal::ZERO,
                    added_at: now,
                }),
            }
            Ok(())
        })
    }

    /// Set a line's quantity; `quantity <= 0` removes the line
    pub async fn update_line_quantity(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> EngineResult<Cart> {
        if quantity <= 0 {
            return self.remove_line(cart_id, product_id);
        }
        money::validate_quantity(quantity)?;

        let cart = self.get_cart(cart_id)?;
        let current = cart
            .line(product_id)
            .map(|l| l.quantity)
            .ok_or_else(|| EngineError::not_found(Entity::CartLine, product_id))?;

        // Only increases need a stock check
        if quantity > current {
            let available = with_timeout(
                self.oracle_timeout,
                self.oracles.stock.available_quantity(product_id),
            )
            .await?;
            if quantity > available {
                return Err(EngineError::InsufficientStock {
                    product_id: product_id.to_string(),
                    requested: quantity,
                    available,
                });
            }
        }

        self.mutate(cart_id, |cart, _now| {
            let line = cart
                .lines
                .iter_mut()
                .find(|l| l.product_id == product_id)
                .ok_or_else(|| EngineError::not_found(Entity::CartLine, product_id))?;
            line.quantity = quantity;
            Ok(())
        })
    }

    pub fn remove_line(&self, cart_id: &str, product_id: &str) -> EngineResult<Cart> {
        self.mutate(cart_id, |cart, _now| {
            let before = cart.lines.len();
            cart.lines.retain(|l| l.product_id != product_id);
            if cart.lines.len() == before {
                return Err(EngineError::not_found(Entity::CartLine, product_id));
            }
            Ok(())
        })
    }

    /// Remove every line and the coupon
    pub fn clear(&self, cart_id: &str) -> EngineResult<Cart> {
        self.mutate(cart_id, |cart, _now| {
            cart.lines.clear();
            cart.coupon = None;
            Ok(())
        })
    }

    /// Record a coupon computed by the promotions service
    pub fn apply_coupon(
        &self,
        cart_id: &str,
        code: &str,
        discount_amount: Decimal,
    ) -> EngineResult<Cart> {
        let code = code.trim();
        if code.is_empty() {
            return Err(EngineError::Validation("coupon code is required".into()));
        }
        money::validate_non_negative(discount_amount, "discount_amount")?;

        let cart = self.mutate(cart_id, |cart, _now| {
            cart.coupon = Some(AppliedCoupon {
                id: new_id(),
                code: code.to_string(),
                discount_amount,
            });
            Ok(())
        })?;
        tracing::info!(cart_id = %cart_id, code = %code, discount = %cart.discount, "Coupon applied");
        Ok(cart)
    }

    pub fn remove_coupon(&self, cart_id: &str) -> EngineResult<Cart> {
        self.mutate(cart_id, |cart, _now| {
            cart.coupon = None;
            Ok(())
        })
    }

    /// Replace the whole line list (used by sync), keeping the coupon
    pub(crate) fn replace_lines(&self, cart_id: &str, lines: Vec<CartLine>) -> EngineResult<Cart> {
        self.mutate(cart_id, move |cart, _now| {
            cart.lines = lines;
            Ok(())
        })
    }

    /// Load, check active, apply, recompute, save; all in one transaction
    fn mutate<F>(&self, cart_id: &str, apply: F) -> EngineResult<Cart>
    where
        F: FnOnce(&mut Cart, i64) -> EngineResult<()>,
    {
        let txn = self.storage.begin_write()?;
        let mut cart = self
            .storage
            .get_cart_txn(&txn, cart_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Cart, cart_id))?;
        if !cart.is_active() {
            return Err(EngineError::CartNotActive(cart_id.to_string()));
        }

        let now = now_millis();
        apply(&mut cart, now)?;
        self.rules.recompute(&mut cart);
        cart.updated_at = now;
        cart.last_activity_at = now;

        self.storage.put_cart(&txn, &cart)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::debug!(
            cart_id = %cart.id,
            items_count = cart.items_count,
            total = %cart.total,
            "Cart updated"
        );
        Ok(cart)
    }

    // ========== Oracle access ==========

    pub(crate) async fn price_tier(&self, customer_id: &str) -> EngineResult<String> {
        Ok(with_timeout(
            self.oracle_timeout,
            self.oracles.customers.find_tier(customer_id),
        )
        .await?)
    }

    /// Resolve a product for `add_line`: must exist, be sellable, be priced
    async fn resolve_product(
        &self,
        customer_id: &str,
        product_id: &str,
    ) -> EngineResult<ResolvedProduct> {
        let product = with_timeout(
            self.oracle_timeout,
            self.oracles.products.find_product(product_id),
        )
        .await?
        .ok_or_else(|| EngineError::not_found(Entity::Product, product_id))?;
        if !product.is_sellable() {
            return Err(EngineError::ProductUnavailable(product_id.to_string()));
        }

        let tier = self.price_tier(customer_id).await?;
        let (available, unit_price) = tokio::try_join!(
            with_timeout(
                self.oracle_timeout,
                self.oracles.stock.available_quantity(product_id)
            ),
            with_timeout(self.oracle_timeout, self.oracles.prices.price(product_id, &tier)),
        )?;
        if unit_price < Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "negative price for product {}",
                product_id
            )));
        }

        Ok(ResolvedProduct {
            product,
            available,
            unit_price,
        })
    }
}
