use super::*;
use shared::models::{ProductStatus, RemovalReason};
use std::time::Duration;

// ========================================================================
// get_or_create
// ========================================================================

#[tokio::test]
async fn test_get_or_create_is_idempotent() {
    let (engine, _catalog) = create_test_engine();

    let first = engine.get_or_create_cart("cust-1").await.unwrap();
    let second = engine.get_or_create_cart("cust-1").await.unwrap();
    let other = engine.get_or_create_cart("cust-2").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_ne!(first.id, other.id);
    assert!(first.is_active());
    assert!(first.is_empty());
}

#[tokio::test]
async fn test_concurrent_get_or_create_yields_one_cart() {
    let (engine, _catalog) = create_test_engine();

    let (a, b) = tokio::join!(
        engine.get_or_create_cart("cust-1"),
        engine.get_or_create_cart("cust-1")
    );
    assert_eq!(a.unwrap().id, b.unwrap().id);
    assert_eq!(engine.storage().get_active_carts().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_or_create_requires_customer() {
    let (engine, _catalog) = create_test_engine();
    let result = engine.get_or_create_cart("  ").await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

// ========================================================================
// Sync
// ========================================================================

#[tokio::test]
async fn test_empty_sync_on_empty_cart() {
    let (engine, _catalog) = create_test_engine();

    for _ in 0..2 {
        let report = engine.sync_cart("cust-1", &[]).await.unwrap();
        assert_eq!(report.cart.items_count, 0);
        assert_eq!(report.cart.subtotal, Decimal::ZERO);
        assert_eq!(report.cart.total, Decimal::ZERO);
        assert!(report.is_clean());
    }
}

#[tokio::test]
async fn test_sync_detects_price_drift() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", dec(120), 50);

    let report = engine
        .sync_cart("cust-1", &[client_line("p-1", 2, dec(100))])
        .await
        .unwrap();

    assert_eq!(report.price_changed_items.len(), 1);
    let change = &report.price_changed_items[0];
    assert_eq!(change.product_id, "p-1");
    assert_eq!(change.old_price, dec(100));
    assert_eq!(change.new_price, dec(120));
    assert!(report.removed_items.is_empty());

    let cart = engine.get_cart(&report.cart.id).unwrap();
    assert_eq!(cart.lines[0].unit_price, dec(120));
    assert_eq!(cart.lines[0].line_total, dec(240));
}

#[tokio::test]
async fn test_sync_ignores_drift_within_epsilon() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", Decimal::new(10001, 2), 50);

    let report = engine
        .sync_cart("cust-1", &[client_line("p-1", 1, dec(100))])
        .await
        .unwrap();
    assert!(report.price_changed_items.is_empty());
    // Server price still wins
    assert_eq!(report.cart.lines[0].unit_price, Decimal::new(10001, 2));
}

#[tokio::test]
async fn test_sync_uses_customer_tier_price() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", dec(100), 50);
    catalog.set_tier_price("p-1", "wholesale", dec(80));
    catalog.set_customer_tier("cust-w", "wholesale");

    let report = engine
        .sync_cart("cust-w", &[client_line("p-1", 1, dec(80))])
        .await
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(report.cart.subtotal, dec(80));
}

#[tokio::test]
async fn test_sync_clamps_to_stock() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", dec(10), 3);

    let report = engine
        .sync_cart("cust-1", &[client_line("p-1", 10, dec(10))])
        .await
        .unwrap();

    assert_eq!(report.quantity_adjusted_items.len(), 1);
    let adj = &report.quantity_adjusted_items[0];
    assert_eq!((adj.requested, adj.available, adj.final_quantity), (10, 3, 3));

    let cart = engine.get_cart(&report.cart.id).unwrap();
    assert_eq!(cart.lines[0].quantity, 3);
    assert_eq!(cart.items_count, 3);
}

#[tokio::test]
async fn test_sync_removes_deleted_inactive_and_out_of_stock() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-ok", "Kept", dec(5), 10);
    catalog.upsert_product("p-inactive", "Inactive", dec(5), 10);
    catalog.set_active("p-inactive", false);
    catalog.upsert_product("p-draft", "Draft", dec(5), 10);
    catalog.set_status("p-draft", ProductStatus::Draft);
    catalog.upsert_product("p-empty", "Empty", dec(5), 0);

    let report = engine
        .sync_cart(
            "cust-1",
            &[
                client_line("p-ghost", 1, dec(5)),
                client_line("p-inactive", 1, dec(5)),
                client_line("p-ok", 2, dec(5)),
                client_line("p-draft", 1, dec(5)),
                client_line("p-empty", 1, dec(5)),
            ],
        )
        .await
        .unwrap();

    let removed: Vec<(&str, RemovalReason)> = report
        .removed_items
        .iter()
        .map(|r| (r.product_id.as_str(), r.reason))
        .collect();
    assert_eq!(
        removed,
        vec![
            ("p-ghost", RemovalReason::Deleted),
            ("p-inactive", RemovalReason::Inactive),
            ("p-draft", RemovalReason::Inactive),
            ("p-empty", RemovalReason::OutOfStock),
        ]
    );

    let cart = engine.get_cart(&report.cart.id).unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].product_id, "p-ok");
    assert!(cart.line("p-ghost").is_none());
}

#[tokio::test]
async fn test_sync_oracle_failure_only_drops_that_line() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-ok", "Kept", dec(5), 10);
    catalog.upsert_product("p-broken", "Broken", dec(5), 10);
    catalog.fail_product("p-broken");

    let report = engine
        .sync_cart(
            "cust-1",
            &[client_line("p-broken", 1, dec(5)), client_line("p-ok", 1, dec(5))],
        )
        .await
        .unwrap();

    assert_eq!(report.removed_items.len(), 1);
    assert_eq!(report.removed_items[0].reason, RemovalReason::Error);
    assert_eq!(report.cart.lines.len(), 1);
    assert_eq!(report.cart.lines[0].product_id, "p-ok");
}

#[tokio::test]
async fn test_sync_slow_lookup_times_out_per_line() {
    let (engine, catalog) = create_test_engine_with(test_config().with_oracle_timeout_ms(20));
    catalog.upsert_product("p-ok", "Kept", dec(5), 10);
    catalog.upsert_product("p-slow", "Slow", dec(5), 10);
    catalog.delay_product("p-slow", Duration::from_millis(500));

    let report = engine
        .sync_cart(
            "cust-1",
            &[client_line("p-ok", 1, dec(5)), client_line("p-slow", 1, dec(5))],
        )
        .await
        .unwrap();

    assert_eq!(report.removed_items.len(), 1);
    assert_eq!(report.removed_items[0].product_id, "p-slow");
    assert_eq!(report.removed_items[0].reason, RemovalReason::Error);
    assert_eq!(report.cart.lines.len(), 1);
}

#[tokio::test]
async fn test_sync_duplicate_product_last_write_wins() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", dec(10), 100);

    let report = engine
        .sync_cart(
            "cust-1",
            &[client_line("p-1", 2, dec(10)), client_line("p-1", 5, dec(10))],
        )
        .await
        .unwrap();

    assert_eq!(report.cart.lines.len(), 1);
    assert_eq!(report.cart.lines[0].quantity, 5);
    assert_eq!(report.cart.items_count, 5);
}

#[tokio::test]
async fn test_sync_duplicate_report_follows_final_line() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", dec(10), 3);

    let report = engine
        .sync_cart(
            "cust-1",
            &[client_line("p-1", 10, dec(8)), client_line("p-1", 2, dec(10))],
        )
        .await
        .unwrap();

    assert_eq!(report.cart.lines.len(), 1);
    assert_eq!(report.cart.lines[0].quantity, 2);
    assert_eq!(report.cart.lines[0].unit_price, dec(10));
    assert!(report.price_changed_items.is_empty());
    assert!(report.quantity_adjusted_items.is_empty());
    assert!(report.removed_items.is_empty());
}

#[tokio::test]
async fn test_sync_duplicate_removal_reported_once() {
    let (engine, _catalog) = create_test_engine();

    let report = engine
        .sync_cart(
            "cust-1",
            &[client_line("p-gone", 1, dec(1)), client_line("p-gone", 3, dec(1))],
        )
        .await
        .unwrap();

    assert!(report.cart.lines.is_empty());
    assert_eq!(report.removed_items.len(), 1);
    assert_eq!(report.removed_items[0].reason, RemovalReason::Deleted);
}

#[tokio::test]
async fn test_sync_replaces_server_lines_and_keeps_order() {
    let (engine, catalog) = create_test_engine();
    for id in ["p-a", "p-b", "p-c"] {
        catalog.upsert_product(id, id, dec(1), 100);
    }
    let cart = engine.get_or_create_cart("cust-1").await.unwrap();
    engine.add_line(&cart.id, "p-a", 1).await.unwrap();

    let report = engine
        .sync_cart(
            "cust-1",
            &[client_line("p-c", 1, dec(1)), client_line("p-b", 1, dec(1))],
        )
        .await
        .unwrap();

    let ids: Vec<&str> = report.cart.lines.iter().map(|l| l.product_id.as_str()).collect();
    assert_eq!(ids, vec!["p-c", "p-b"]);
    assert_eq!(report.cart.id, cart.id);
}

#[tokio::test]
async fn test_sync_rejects_malformed_input_without_writing() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", dec(10), 100);
    engine
        .sync_cart("cust-1", &[client_line("p-1", 2, dec(10))])
        .await
        .unwrap();

    let result = engine
        .sync_cart(
            "cust-1",
            &[client_line("p-1", 1, dec(10)), client_line("p-2", -1, dec(10))],
        )
        .await;
    assert!(matches!(result, Err(EngineError::Validation(_))));

    let cart = engine.get_or_create_cart("cust-1").await.unwrap();
    assert_eq!(cart.items_count, 2);
}

#[tokio::test]
async fn test_sync_totals_invariant() {
    let config = test_config()
        .with_tax_rate(Decimal::new(21, 2))
        .with_shipping(Decimal::new(495, 2), Some(dec(500)));
    let (engine, catalog) = create_test_engine_with(config);
    catalog.upsert_product("p-1", "A", Decimal::new(1999, 2), 100);
    catalog.upsert_product("p-2", "B", Decimal::new(333, 2), 2);
    catalog.upsert_product("p-3", "C", dec(250), 100);

    let submissions = vec![
        vec![client_line("p-1", 3, dec(20))],
        vec![client_line("p-1", 1, dec(20)), client_line("p-2", 7, dec(3))],
        vec![
            client_line("p-1", 2, dec(20)),
            client_line("p-2", 1, dec(3)),
            client_line("p-3", 2, dec(250)),
        ],
    ];
    for lines in submissions {
        let cart = engine.sync_cart("cust-1", &lines).await.unwrap().cart;
        let subtotal: Decimal = cart
            .lines
            .iter()
            .map(|l| Decimal::from(l.quantity) * l.unit_price)
            .sum();
        assert_eq!(cart.subtotal, subtotal);
        assert_eq!(cart.total, cart.subtotal - cart.discount + cart.tax + cart.shipping_cost);
    }
}

#[tokio::test]
async fn test_sync_keeps_coupon() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", dec(50), 100);
    let cart = engine.get_or_create_cart("cust-1").await.unwrap();
    engine.apply_coupon(&cart.id, "SAVE10", dec(10)).unwrap();

    let report = engine
        .sync_cart("cust-1", &[client_line("p-1", 2, dec(50))])
        .await
        .unwrap();
    assert_eq!(report.cart.discount, dec(10));
    assert_eq!(report.cart.total, dec(90));
}

// ========================================================================
// Line and coupon mutations
// ========================================================================

#[tokio::test]
async fn test_add_line_merges_and_prices_from_server() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", dec(12), 10);
    let cart = engine.get_or_create_cart("cust-1").await.unwrap();

    engine.add_line(&cart.id, "p-1", 2).await.unwrap();
    catalog.set_base_price("p-1", dec(15));
    let cart = engine.add_line(&cart.id, "p-1", 3).await.unwrap();

    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].quantity, 5);
    assert_eq!(cart.lines[0].unit_price, dec(15));
    assert_eq!(cart.subtotal, dec(75));
    assert_eq!(cart.items_count, 5);
}

#[tokio::test]
async fn test_add_line_rejections() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", dec(12), 4);
    catalog.upsert_product("p-off", "Off", dec(12), 4);
    catalog.set_active("p-off", false);
    let cart = engine.get_or_create_cart("cust-1").await.unwrap();

    let over = engine.add_line(&cart.id, "p-1", 5).await;
    assert!(matches!(over, Err(EngineError::InsufficientStock { available: 4, .. })));

    let inactive = engine.add_line(&cart.id, "p-off", 1).await;
    assert!(matches!(inactive, Err(EngineError::ProductUnavailable(_))));

    assert_not_found(engine.add_line(&cart.id, "p-ghost", 1).await, Entity::Product);

    let zero = engine.add_line(&cart.id, "p-1", 0).await;
    assert!(matches!(zero, Err(EngineError::Validation(_))));

    // Nothing was written
    assert!(engine.get_cart(&cart.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_update_and_remove_lines() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", dec(10), 5);
    catalog.upsert_product("p-2", "Gadget", dec(3), 5);
    let cart = engine.get_or_create_cart("cust-1").await.unwrap();
    engine.add_line(&cart.id, "p-1", 1).await.unwrap();
    engine.add_line(&cart.id, "p-2", 1).await.unwrap();

    let updated = engine.update_line_quantity(&cart.id, "p-1", 4).await.unwrap();
    assert_eq!(updated.subtotal, dec(43));

    let over = engine.update_line_quantity(&cart.id, "p-1", 6).await;
    assert!(matches!(over, Err(EngineError::InsufficientStock { .. })));

    // Zero removes the line
    let removed = engine.update_line_quantity(&cart.id, "p-2", 0).await.unwrap();
    assert_eq!(removed.lines.len(), 1);

    assert_not_found(engine.update_line_quantity(&cart.id, "p-2", 1).await, Entity::CartLine);
    assert_not_found(engine.remove_line(&cart.id, "p-2"), Entity::CartLine);

    let cart = engine.remove_line(&cart.id, "p-1").unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.total, Decimal::ZERO);
}

#[tokio::test]
async fn test_coupon_apply_remove_and_clear() {
    let (engine, catalog) = create_test_engine();
    catalog.upsert_product("p-1", "Widget", dec(40), 5);
    let cart = engine.get_or_create_cart("cust-1").await.unwrap();
    engine.add_line(&cart.id, "p-1", 1).await.unwrap();

    let cart = engine.apply_coupon(&cart.id, "WELCOME", dec(15)).unwrap();
    assert_eq!(cart.coupon.as_ref().map(|c| c.code.as_str()), Some("WELCOME"));
    assert_eq!(cart.discount, dec(15));
    assert_eq!(cart.total, dec(25));

    // Capped at subtotal
    let cart = engine.apply_coupon(&cart.id, "HUGE", dec(100)).unwrap();
    assert_eq!(cart.discount, dec(40));
    assert_eq!(cart.total, Decimal::ZERO);

    let cart = engine.remove_coupon(&cart.id).unwrap();
    assert_eq!(cart.discount, Decimal::ZERO);
    assert_eq!(cart.total, dec(40));

    assert!(matches!(
        engine.apply_coupon(&cart.id, "NEG", dec(-1)),
        Err(EngineError::Validation(_))
    ));

    engine.apply_coupon(&cart.id, "WELCOME", dec(5)).unwrap();
    let cart = engine.clear_cart(&cart.id).unwrap();
    assert!(cart.is_empty());
    assert!(cart.coupon.is_none());
    assert_eq!(cart.items_count, 0);
}

#[tokio::test]
async fn test_missing_cart_is_not_found() {
    let (engine, _catalog) = create_test_engine();
    assert_not_found(engine.get_cart("nope"), Entity::Cart);
    assert_not_found(engine.clear_cart("nope"), Entity::Cart);
}

// ========================================================================
// Abandonment
// ========================================================================

#[tokio::test]
async fn test_abandoned_carts_listing() {
    let (engine, catalog) = create_test_engine_with(test_config().with_cart_abandon_after_secs(60));
    catalog.upsert_product("p-1", "Widget", dec(10), 5);

    let idle = engine.get_or_create_cart("cust-idle").await.unwrap();
    engine.add_line(&idle.id, "p-1", 1).await.unwrap();
    // Empty carts are never listed
    engine.get_or_create_cart("cust-empty").await.unwrap();

    let now = now_millis();
    assert!(engine.list_abandoned_carts_at(now).unwrap().is_empty());

    let later = engine.list_abandoned_carts_at(now + 61_000).unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].customer_id, "cust-idle");
}
