use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use mcs_common::UsdCents;
use provider_tools::{StripeApi, StripeConfig};
use storefront_engine::{db_types::Product, events::EventProducers, CatalogApi, CheckoutApi, OrderFlowApi};

use super::{
    helpers::{delete_request, post_request},
    mocks::MockStorefrontDb,
};
use crate::routes::{
    DeleteNotificationRoute,
    MarkNotificationReadRoute,
    SetProductStockRoute,
    StripeCheckoutRoute,
};

fn register(cfg: &mut ServiceConfig, db: MockStorefrontDb) {
    let stripe_api = StripeApi::new(StripeConfig::default()).expect("client builds with an empty key");
    cfg.service(StripeCheckoutRoute::<MockStorefrontDb>::new())
        .service(MarkNotificationReadRoute::<MockStorefrontDb>::new())
        .service(DeleteNotificationRoute::<MockStorefrontDb>::new())
        .app_data(web::Data::new(CheckoutApi::new(db, UsdCents::from(200))))
        .app_data(web::Data::new(stripe_api));
}

fn register_with_orders(cfg: &mut ServiceConfig, db: MockStorefrontDb) {
    cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())));
    register(cfg, MockStorefrontDb::new());
}

fn register_with_catalog(cfg: &mut ServiceConfig, db: MockStorefrontDb) {
    cfg.service(SetProductStockRoute::<MockStorefrontDb>::new())
        .app_data(web::Data::new(CatalogApi::new(db, EventProducers::default())));
}

fn product_fixture(id: &str, price: UsdCents) -> Product {
    Product {
        id: id.to_string(),
        title: "Crate Key".to_string(),
        description: String::new(),
        category: "items".to_string(),
        price,
        stock: 10,
        is_active: true,
        image_url: None,
        sort_order: 0,
        stripe_product_id: None,
        stripe_price_id: None,
        square_item_id: None,
        square_variation_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[actix_web::test]
async fn empty_carts_are_rejected_before_any_order_is_created() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"items":[],"minecraft_username":"Steve"}"#.to_string();
    let err = post_request("/checkout/stripe", body, vec![], |cfg| {
        // No expectations: the cart never reaches the database.
        register(cfg, MockStorefrontDb::new());
    })
    .await
    .expect_err("Expected the cart to be rejected");
    assert_eq!(err, "No items in cart");
}

#[actix_web::test]
async fn carts_naming_unknown_products_are_rejected() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"items":[{"product_id":"ghost","quantity":1}],"minecraft_username":"Steve"}"#.to_string();
    let err = post_request("/checkout/stripe", body, vec![], |cfg| {
        let mut db = MockStorefrontDb::new();
        db.expect_fetch_product().times(1).returning(|_| Ok(None));
        db.expect_insert_order().never();
        register(cfg, db);
    })
    .await
    .expect_err("Expected the cart to be rejected");
    assert_eq!(err, "Product not found: ghost");
}

#[actix_web::test]
async fn carts_below_the_minimum_are_rejected() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"items":[{"product_id":"cheap","quantity":1}],"minecraft_username":"Steve"}"#.to_string();
    let err = post_request("/checkout/stripe", body, vec![], |cfg| {
        let mut db = MockStorefrontDb::new();
        db.expect_fetch_product().times(1).returning(|id| Ok(Some(product_fixture(id, UsdCents::from(100)))));
        db.expect_insert_order().never();
        register(cfg, db);
    })
    .await
    .expect_err("Expected the cart to be rejected");
    assert_eq!(err, "Minimum order amount is $2.00. Your cart total is $1.00");
}

#[actix_web::test]
async fn admins_can_override_stock_levels() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"stock":25}"#.to_string();
    let (status, response) = post_request("/products/crate-key/stock", body, vec![], |cfg| {
        let mut db = MockStorefrontDb::new();
        db.expect_set_stock().times(1).withf(|id, stock| id == "crate-key" && *stock == 25).returning(
            |id, stock| {
                let mut product = product_fixture(id, UsdCents::from(299));
                product.stock = stock;
                Ok(product)
            },
        );
        register_with_catalog(cfg, db);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains(r#""stock":25"#));
}

#[actix_web::test]
async fn notifications_can_be_marked_read() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/notifications/42/read", String::new(), vec![], |cfg| {
        let mut db = MockStorefrontDb::new();
        db.expect_mark_notification_read().times(1).withf(|id| *id == 42).returning(|_| Ok(()));
        register_with_orders(cfg, db);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true}"#);
}

#[actix_web::test]
async fn notifications_can_be_deleted() {
    let _ = env_logger::try_init().ok();
    let (status, body) = delete_request("/notifications/42", |cfg| {
        let mut db = MockStorefrontDb::new();
        db.expect_delete_notification().times(1).withf(|id| *id == 42).returning(|_| Ok(()));
        register_with_orders(cfg, db);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true}"#);
}
