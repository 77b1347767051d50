use super::*;
use crate::error::{EngineError, Entity};
use crate::oracles::InMemoryCatalog;
use shared::models::ClientCartLine;
use shared::order::{Actor, AddressSnapshot, OrderStatus};
use std::sync::Arc;

mod test_cart;

fn test_config() -> Config {
    Config::baseline().with_retry(3, 1)
}

fn create_test_engine() -> (CommerceEngine, Arc<InMemoryCatalog>) {
    create_test_engine_with(test_config())
}

fn create_test_engine_with(config: Config) -> (CommerceEngine, Arc<InMemoryCatalog>) {
    let catalog = Arc::new(InMemoryCatalog::new());
    let engine = CommerceEngine::in_memory(config, Oracles::from_catalog(catalog.clone())).unwrap();
    (engine, catalog)
}

fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

fn client_line(product_id: &str, quantity: i32, unit_price: Decimal) -> ClientCartLine {
    ClientCartLine {
        product_id: product_id.to_string(),
        quantity,
        unit_price,
    }
}

fn admin() -> Actor {
    Actor::Admin("admin-1".to_string())
}

fn checkout_input() -> CheckoutInput {
    CheckoutInput {
        shipping_address: AddressSnapshot {
            recipient_name: "Lucía Pérez".to_string(),
            phone: "+34 600 000 000".to_string(),
            line1: "Calle Mayor 1".to_string(),
            line2: None,
            city: "Madrid".to_string(),
            region: Some("Madrid".to_string()),
            postal_code: Some("28013".to_string()),
            country: "ES".to_string(),
        },
        payment_method: PaymentMethod::BankTransfer,
        customer_notes: Some("Leave at reception".to_string()),
        wallet_amount: Decimal::ZERO,
        loyalty_amount: Decimal::ZERO,
    }
}

// ========================================================================
// Helper: put products in a cart and check out
// ========================================================================

async fn place_order(
    engine: &CommerceEngine,
    catalog: &InMemoryCatalog,
    customer_id: &str,
    lines: &[(&str, i32, i64)],
) -> Order {
    let cart = engine.get_or_create_cart(customer_id).await.unwrap();
    for (product_id, quantity, price) in lines {
        catalog.upsert_product(product_id, &format!("Product {}", product_id), dec(*price), 1000);
        engine.add_line(&cart.id, product_id, *quantity).await.unwrap();
    }
    engine.checkout(customer_id, &checkout_input()).unwrap()
}

/// Order with total 100 (one line, no tax or shipping)
async fn place_order_of_100(engine: &CommerceEngine, catalog: &InMemoryCatalog, customer_id: &str) -> Order {
    place_order(engine, catalog, customer_id, &[("p-100", 1, 100)]).await
}

/// Drive an order through `path` as admin (label supplied for shipped)
fn advance(engine: &CommerceEngine, order_id: &str, path: &[OrderStatus]) -> Order {
    let mut order = engine.get_order(order_id).unwrap();
    for status in path {
        let mut request = TransitionRequest::new(*status, admin());
        if *status == OrderStatus::Shipped {
            request = request.with_shipping_label("LBL-1");
        }
        order = engine.transition(order_id, request).unwrap();
    }
    order
}

/// Admin path from pending to each status
fn path_to(status: OrderStatus) -> Vec<OrderStatus> {
    use OrderStatus::*;
    match status {
        Pending => vec![],
        Confirmed => vec![Confirmed],
        Processing => vec![Confirmed, Processing],
        ReadyForPickup => vec![Confirmed, Processing, ReadyForPickup],
        Shipped => vec![Confirmed, Processing, Shipped],
        OutForDelivery => vec![Confirmed, Processing, Shipped, OutForDelivery],
        Delivered => vec![Confirmed, Processing, Shipped, Delivered],
        Completed => vec![Confirmed, Processing, Shipped, Delivered, Completed],
        Cancelled => vec![Cancelled],
        Refunded => vec![Confirmed, Processing, Shipped, Delivered, Refunded],
    }
}

fn assert_not_found(result: EngineResult<impl std::fmt::Debug>, expected: Entity) {
    match result {
        Err(EngineError::NotFound { entity, .. }) => assert_eq!(entity, expected),
        other => panic!("expected {} not found, got {:?}", expected, other),
    }
}
