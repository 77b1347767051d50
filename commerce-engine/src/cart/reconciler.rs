//! Cart Reconciler
//!
//! Rebuilds the customer's cart from a client-submitted snapshot, checking
//! every line against the catalog, warehouse and pricing oracles.
//!
//! Per line, in submission order:
//!
//! 1. product missing → removed (`deleted`)
//! 2. product inactive or unpublished → removed (`inactive`)
//! 3. no stock → removed (`out_of_stock`)
//! 4. tier price differs from the client's by more than epsilon → price change,
//!    line kept at the server price
//! 5. stock below requested → clamped, quantity adjustment recorded
//! 6. upserted by product id: the last submission wins, diagnostics included
//!
//! Oracle failures and timeouts only drop the affected line (`error`).
//! Lines are resolved concurrently; the results are folded in submission
//! order and the final line list is written in one transaction.

use super::store::CartStore;
use crate::error::{EngineError, EngineResult};
use crate::money;
use crate::oracles::{OracleError, OracleResult, Oracles, with_timeout};
use futures::future::join_all;
use rust_decimal::Decimal;
use shared::models::{
    CartLine, ClientCartLine, PriceChange, QuantityAdjustment, RemovalReason, RemovedLine,
    SyncReport,
};
use shared::util::now_millis;
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of resolving one submitted line
#[derive(Debug)]
enum LineOutcome {
    Keep {
        line: CartLine,
        price_change: Option<PriceChange>,
        adjustment: Option<QuantityAdjustment>,
    },
    Removed(RemovalReason),
}

#[derive(Debug, Clone)]
pub struct CartReconciler {
    store: CartStore,
    oracles: Oracles,
    price_epsilon: Decimal,
    oracle_timeout: Duration,
}

impl CartReconciler {
    pub fn new(
        store: CartStore,
        oracles: Oracles,
        price_epsilon: Decimal,
        oracle_timeout: Duration,
    ) -> Self {
        Self {
            store,
            oracles,
            price_epsilon,
            oracle_timeout,
        }
    }

    /// Reconcile the client's lines into the customer's active cart
    pub async fn sync(
        &self,
        customer_id: &str,
        client_lines: &[ClientCartLine],
    ) -> EngineResult<SyncReport> {
        validate_client_lines(client_lines)?;

        let cart = self.store.get_or_create(customer_id).await?;

        // Without a tier no line can be priced; each line degrades on its own
        let tier = match self.store.price_tier(customer_id).await {
            Ok(tier) => Some(tier),
            Err(e) => {
                tracing::warn!(customer_id = %customer_id, error = %e, "Price tier lookup failed");
                None
            }
        };

        let now = now_millis();
        let outcomes = join_all(
            client_lines
                .iter()
                .map(|client| self.resolve_line(tier.as_deref(), client, now)),
        )
        .await;

        // One slot per product, at its first position; later submissions overwrite
        let mut slots: Vec<(&str, LineOutcome)> = Vec::with_capacity(client_lines.len());
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for (client, outcome) in client_lines.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|e| {
                tracing::warn!(
                    customer_id = %customer_id,
                    product_id = %client.product_id,
                    error = %e,
                    "Line dropped during sync"
                );
                LineOutcome::Removed(RemovalReason::Error)
            });

            let product_id = client.product_id.as_str();
            match positions.get(product_id) {
                Some(&i) => slots[i].1 = outcome,
                None => {
                    positions.insert(product_id, slots.len());
                    slots.push((product_id, outcome));
                }
            }
        }

        let mut lines: Vec<CartLine> = Vec::with_capacity(slots.len());
        let mut removed_items = Vec::new();
        let mut price_changed_items = Vec::new();
        let mut quantity_adjusted_items = Vec::new();

        for (product_id, outcome) in slots {
            match outcome {
                LineOutcome::Removed(reason) => removed_items.push(RemovedLine {
                    product_id: product_id.to_string(),
                    reason,
                }),
                LineOutcome::Keep {
                    mut line,
                    price_change,
                    adjustment,
                } => {
                    price_changed_items.extend(price_change);
                    quantity_adjusted_items.extend(adjustment);
                    if let Some(existing) = cart.line(&line.product_id) {
                        line.added_at = existing.added_at;
                    }
                    lines.push(line);
                }
            }
        }

        let cart = self.store.replace_lines(&cart.id, lines)?;

        tracing::info!(
            customer_id = %customer_id,
            cart_id = %cart.id,
            submitted = client_lines.len(),
            kept = cart.lines.len(),
            removed = removed_items.len(),
            price_changed = price_changed_items.len(),
            quantity_adjusted = quantity_adjusted_items.len(),
            "Cart synced"
        );

        Ok(SyncReport {
            cart,
            removed_items,
            price_changed_items,
            quantity_adjusted_items,
        })
    }

    async fn resolve_line(
        &self,
        tier: Option<&str>,
        client: &ClientCartLine,
        now: i64,
    ) -> OracleResult<LineOutcome> {
        let product_id = client.product_id.as_str();
        let timeout = self.oracle_timeout;

        let Some(product) =
            with_timeout(timeout, self.oracles.products.find_product(product_id)).await?
        else {
            return Ok(LineOutcome::Removed(RemovalReason::Deleted));
        };
        if !product.is_sellable() {
            return Ok(LineOutcome::Removed(RemovalReason::Inactive));
        }

        let available =
            with_timeout(timeout, self.oracles.stock.available_quantity(product_id)).await?;
        if available <= 0 {
            return Ok(LineOutcome::Removed(RemovalReason::OutOfStock));
        }

        let tier = tier.ok_or_else(|| OracleError::Unavailable("price tier unknown".into()))?;
        let price = with_timeout(timeout, self.oracles.prices.price(product_id, tier)).await?;

        let price_change = money::differs(client.unit_price, price, self.price_epsilon).then(|| {
            PriceChange {
                product_id: product_id.to_string(),
                old_price: client.unit_price,
                new_price: price,
            }
        });

        let (quantity, adjustment) = if available < client.quantity {
            (
                available,
                Some(QuantityAdjustment {
                    product_id: product_id.to_string(),
                    requested: client.quantity,
                    available,
                    final_quantity: available,
                }),
            )
        } else {
            (client.quantity, None)
        };

        let mut line = CartLine {
            product_id: product.id,
            name: product.name,
            sku: product.sku,
            image: product.image,
            quantity,
            unit_price: price,
            line_total: Decimal::ZERO,
            added_at: now,
        };
        line.refresh_total();

        Ok(LineOutcome::Keep {
            line,
            price_change,
            adjustment,
        })
    }
}

/// Reject malformed input before anything is read or written
fn validate_client_lines(lines: &[ClientCartLine]) -> EngineResult<()> {
    for line in lines {
        if line.product_id.trim().is_empty() {
            return Err(EngineError::Validation("product_id is required".into()));
        }
        money::validate_quantity(line.quantity).map_err(|_| {
            EngineError::Validation(format!(
                "invalid quantity {} for product {}",
                line.quantity, line.product_id
            ))
        })?;
        if line.unit_price < Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "negative unit price for product {}",
                line.product_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(product_id: &str, quantity: i32, price: i64) -> ClientCartLine {
        ClientCartLine {
            product_id: product_id.to_string(),
            quantity,
            unit_price: Decimal::from(price),
        }
    }

    #[test]
    fn test_validation_rejects_malformed_lines() {
        assert!(validate_client_lines(&[client("p-1", 1, 10)]).is_ok());
        assert!(validate_client_lines(&[]).is_ok());
        assert!(matches!(
            validate_client_lines(&[client("p-1", -2, 10)]),
            Err(EngineError::Validation(_))
        ));
        assert!(validate_client_lines(&[client("p-1", 0, 10)]).is_err());
        assert!(validate_client_lines(&[client(" ", 1, 10)]).is_err());
        assert!(validate_client_lines(&[client("p-1", 1, -1)]).is_err());
    }
}
