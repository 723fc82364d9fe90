use log::*;
use mcs_common::UsdCents;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use storefront_engine::{
    db_types::{OrderStatus, PaymentProvider},
    CartLine,
    CartRequest,
    CheckoutApi,
    SqliteDatabase,
    StorefrontDatabase,
    StorefrontError,
};

use crate::support::prepare_env::{prepare_test_env, random_db_path, seed_product};

mod support;

async fn setup() -> CheckoutApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    CheckoutApi::new(db, UsdCents::from_dollars(2))
}

async fn tear_down(api: CheckoutApi<SqliteDatabase>) {
    let url = api.db().url().to_string();
    drop(api);
    if let Err(e) = Sqlite::drop_database(&url).await {
        error!("🚀️ Failed to drop database: {e}");
    }
}

async fn order_count(api: &CheckoutApi<SqliteDatabase>) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(api.db().pool()).await.unwrap()
}

fn cart(items: Vec<CartLine>) -> CartRequest {
    CartRequest { items, minecraft_username: "Steve".into(), user_id: None }
}

#[tokio::test]
async fn valid_cart_is_priced_from_the_catalog() {
    let api = setup().await;
    seed_product(api.db(), "rank-vip", "VIP Rank", UsdCents::from_dollars(10), 5, true).await;
    seed_product(api.db(), "crate-key", "Crate Key", UsdCents::from(199), 20, true).await;
    let pending = api
        .create_pending_order(
            cart(vec![
                CartLine { product_id: "rank-vip".into(), quantity: 1 },
                CartLine { product_id: "crate-key".into(), quantity: 3 },
            ]),
            PaymentProvider::Stripe,
        )
        .await
        .expect("Error creating order");
    assert_eq!(pending.order.total_amount, UsdCents::from(1597));
    assert_eq!(pending.order.status, OrderStatus::Pending);
    assert!(!pending.order.stock_decremented);
    assert_eq!(pending.lines.len(), 2);
    let items = api.db().fetch_order_items(&pending.order.id).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].unit_price, UsdCents::from(199));
    // Checkout never reserves stock.
    assert_eq!(api.db().fetch_product("rank-vip").await.unwrap().unwrap().stock, 5);
    tear_down(api).await;
}

#[tokio::test]
async fn invalid_carts_leave_no_order_rows() {
    let api = setup().await;
    seed_product(api.db(), "rank-vip", "VIP Rank", UsdCents::from_dollars(10), 2, true).await;
    seed_product(api.db(), "retired", "Retired Rank", UsdCents::from_dollars(10), 5, false).await;
    seed_product(api.db(), "cheap", "Sticker", UsdCents::from(50), 100, true).await;

    let err = api.create_pending_order(cart(vec![]), PaymentProvider::Stripe).await.unwrap_err();
    assert!(matches!(err, StorefrontError::EmptyCart));

    let mut no_name = cart(vec![CartLine { product_id: "rank-vip".into(), quantity: 1 }]);
    no_name.minecraft_username = "  ".into();
    let err = api.create_pending_order(no_name, PaymentProvider::Stripe).await.unwrap_err();
    assert!(matches!(err, StorefrontError::UsernameRequired));

    let err = api
        .create_pending_order(cart(vec![CartLine { product_id: "nope".into(), quantity: 1 }]), PaymentProvider::Stripe)
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::ProductNotFound(_)));

    let err = api
        .create_pending_order(cart(vec![CartLine { product_id: "retired".into(), quantity: 1 }]), PaymentProvider::Stripe)
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::ProductNotAvailable(_)));

    let err = api
        .create_pending_order(cart(vec![CartLine { product_id: "rank-vip".into(), quantity: 3 }]), PaymentProvider::Stripe)
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::InsufficientStock { available: 2, requested: 3, .. }));

    let err = api
        .create_pending_order(cart(vec![CartLine { product_id: "rank-vip".into(), quantity: 0 }]), PaymentProvider::Stripe)
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::InvalidQuantity));

    // $1.50 worth of stickers is below the $2.00 minimum
    let err = api
        .create_pending_order(cart(vec![CartLine { product_id: "cheap".into(), quantity: 3 }]), PaymentProvider::Square)
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::OrderBelowMinimum { .. }));

    assert_eq!(order_count(&api).await, 0);
    tear_down(api).await;
}

#[tokio::test]
async fn discarding_a_pending_order_removes_it() {
    let api = setup().await;
    seed_product(api.db(), "rank-vip", "VIP Rank", UsdCents::from_dollars(10), 5, true).await;
    let pending = api
        .create_pending_order(cart(vec![CartLine { product_id: "rank-vip".into(), quantity: 1 }]), PaymentProvider::Square)
        .await
        .unwrap();
    assert_eq!(order_count(&api).await, 1);
    // provider session creation failed, roll the order back
    api.db().discard_pending_order(&pending.order.id).await.unwrap();
    assert_eq!(order_count(&api).await, 0);
    assert!(api.db().fetch_order_items(&pending.order.id).await.unwrap().is_empty());
    tear_down(api).await;
}
