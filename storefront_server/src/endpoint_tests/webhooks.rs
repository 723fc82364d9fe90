use actix_web::{http::StatusCode, web, web::ServiceConfig};
use mcs_common::Secret;
use provider_tools::{SquareApi, SquareConfig};
use storefront_engine::{
    db_types::OrderStatus,
    events::EventProducers,
    CatalogApi,
    OrderFlowApi,
    StorefrontError,
};

use super::{
    helpers::{post_request, square_signature, stripe_signature, SQUARE_TEST_SECRET, STRIPE_TEST_SECRET},
    mocks::{notification_fixture, order_fixture, MockStorefrontDb},
};
use crate::{
    endpoint_tests::helpers::SQUARE_TEST_URL,
    middleware::{SignatureMiddlewareFactory, SignatureScheme},
    routes::{SquareWebhookRoute, StripeWebhookRoute},
};

const ORDER_ID: &str = "11111111-2222-3333-4444-555555555555";

fn stripe_completed_session() -> String {
    format!(
        r#"{{"id":"evt_1","type":"checkout.session.completed","data":{{"object":{{"client_reference_id":"{ORDER_ID}"}}}}}}"#
    )
}

fn register_stripe(cfg: &mut ServiceConfig, db: MockStorefrontDb, catalog_db: MockStorefrontDb) {
    let scheme = SignatureScheme::Stripe { secret: Secret::new(STRIPE_TEST_SECRET.to_string()) };
    cfg.service(
        web::scope("/webhook/stripe")
            .wrap(SignatureMiddlewareFactory::new(scheme))
            .service(StripeWebhookRoute::<MockStorefrontDb>::new()),
    )
    .app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())))
    .app_data(web::Data::new(CatalogApi::new(catalog_db, EventProducers::default())));
}

fn register_square(cfg: &mut ServiceConfig, db: MockStorefrontDb, catalog_db: MockStorefrontDb) {
    let scheme = SignatureScheme::Square {
        secret: Secret::new(SQUARE_TEST_SECRET.to_string()),
        notification_url: SQUARE_TEST_URL.to_string(),
    };
    let square_api = SquareApi::new(SquareConfig::default()).expect("client builds with an empty token");
    cfg.service(
        web::scope("/webhook/square")
            .wrap(SignatureMiddlewareFactory::new(scheme))
            .service(SquareWebhookRoute::<MockStorefrontDb>::new()),
    )
    .app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())))
    .app_data(web::Data::new(CatalogApi::new(catalog_db, EventProducers::default())))
    .app_data(web::Data::new(square_api));
}

//------------------------------------------   Stripe   ------------------------------------------------------

#[actix_web::test]
async fn stripe_deliveries_without_a_signature_are_rejected() {
    let _ = env_logger::try_init().ok();
    let err = post_request("/webhook/stripe", stripe_completed_session(), vec![], |cfg| {
        register_stripe(cfg, MockStorefrontDb::new(), MockStorefrontDb::new());
    })
    .await
    .expect_err("Expected the middleware to reject the request");
    assert_eq!(err, "Missing signature header.");
}

#[actix_web::test]
async fn stripe_deliveries_with_a_tampered_body_are_rejected() {
    let _ = env_logger::try_init().ok();
    let signature = stripe_signature(&stripe_completed_session());
    let tampered = stripe_completed_session().replace(ORDER_ID, "99999999-0000-0000-0000-000000000000");
    let err = post_request("/webhook/stripe", tampered, vec![("Stripe-Signature", signature)], |cfg| {
        register_stripe(cfg, MockStorefrontDb::new(), MockStorefrontDb::new());
    })
    .await
    .expect_err("Expected the middleware to reject the request");
    assert_eq!(err, "Invalid signature.");
}

#[actix_web::test]
async fn a_completed_session_is_processed_and_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = stripe_completed_session();
    let signature = stripe_signature(&body);
    let (status, body) = post_request("/webhook/stripe", body, vec![("Stripe-Signature", signature)], |cfg| {
        let mut db = MockStorefrontDb::new();
        db.expect_complete_order_once()
            .times(1)
            .returning(|id| Ok(Some(order_fixture(id.as_str(), OrderStatus::Completed))));
        db.expect_fetch_order_items().times(1).returning(|_| Ok(vec![]));
        db.expect_insert_admin_notification().times(1).returning(|_| Ok(notification_fixture()));
        register_stripe(cfg, db, MockStorefrontDb::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn redelivered_sessions_are_acknowledged_without_reprocessing() {
    let _ = env_logger::try_init().ok();
    let body = stripe_completed_session();
    let signature = stripe_signature(&body);
    let (status, body) = post_request("/webhook/stripe", body, vec![("Stripe-Signature", signature)], |cfg| {
        let mut db = MockStorefrontDb::new();
        // The completion guard matches nothing the second time around.
        db.expect_complete_order_once().times(1).returning(|_| Ok(None));
        db.expect_fetch_order()
            .times(1)
            .returning(|id| Ok(Some(order_fixture(id.as_str(), OrderStatus::Completed))));
        register_stripe(cfg, db, MockStorefrontDb::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn unhandled_stripe_event_types_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"id":"evt_2","type":"customer.created","data":{"object":{}}}"#.to_string();
    let signature = stripe_signature(&body);
    let (status, body) = post_request("/webhook/stripe", body, vec![("Stripe-Signature", signature)], |cfg| {
        register_stripe(cfg, MockStorefrontDb::new(), MockStorefrontDb::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn database_failures_are_not_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = stripe_completed_session();
    let signature = stripe_signature(&body);
    let err = post_request("/webhook/stripe", body, vec![("Stripe-Signature", signature)], |cfg| {
        let mut db = MockStorefrontDb::new();
        db.expect_complete_order_once()
            .times(1)
            .returning(|_| Err(StorefrontError::DatabaseError("connection lost".to_string())));
        register_stripe(cfg, db, MockStorefrontDb::new());
    })
    .await
    .expect_err("Expected a server error");
    assert!(err.contains("backend"), "unexpected error: {err}");
}

//------------------------------------------   Square   ------------------------------------------------------

#[actix_web::test]
async fn square_deliveries_without_a_signature_are_rejected() {
    let _ = env_logger::try_init().ok();
    let body = format!(
        r#"{{"event_id":"sq_1","type":"payment.updated","data":{{"object":{{"payment":{{"reference_id":"{ORDER_ID}","status":"COMPLETED"}}}}}}}}"#
    );
    let err = post_request("/webhook/square", body, vec![], |cfg| {
        register_square(cfg, MockStorefrontDb::new(), MockStorefrontDb::new());
    })
    .await
    .expect_err("Expected the middleware to reject the request");
    assert_eq!(err, "Missing signature header.");
}

#[actix_web::test]
async fn a_completed_square_payment_is_processed_and_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = format!(
        r#"{{"event_id":"sq_1","type":"payment.updated","data":{{"object":{{"payment":{{"reference_id":"{ORDER_ID}","status":"COMPLETED"}}}}}}}}"#
    );
    let signature = square_signature(&body);
    let (status, body) = post_request("/webhook/square", body, vec![("X-Square-Signature", signature)], |cfg| {
        let mut db = MockStorefrontDb::new();
        db.expect_complete_order_once()
            .times(1)
            .returning(|id| Ok(Some(order_fixture(id.as_str(), OrderStatus::Completed))));
        db.expect_fetch_order_items().times(1).returning(|_| Ok(vec![]));
        db.expect_insert_admin_notification().times(1).returning(|_| Ok(notification_fixture()));
        register_square(cfg, db, MockStorefrontDb::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn square_payment_created_moves_the_order_to_processing() {
    let _ = env_logger::try_init().ok();
    let body = format!(
        r#"{{"event_id":"sq_2","type":"payment.created","data":{{"object":{{"payment":{{"reference_id":"{ORDER_ID}","status":"APPROVED"}}}}}}}}"#
    );
    let signature = square_signature(&body);
    let (status, _) = post_request("/webhook/square", body, vec![("X-Square-Signature", signature)], |cfg| {
        let mut db = MockStorefrontDb::new();
        db.expect_mark_order_processing()
            .times(1)
            .returning(|id| Ok(Some(order_fixture(id.as_str(), OrderStatus::Processing))));
        register_square(cfg, db, MockStorefrontDb::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
}
