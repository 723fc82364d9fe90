//! Interpretation of Stripe webhook events.
//!
//! The raw event envelope is deserialised here and turned into one of a small set of actions: a normalised
//! [`PaymentOutcome`] for the order state machine, a catalog operation for the product mirror, or an
//! explicit "ignore". The rest of the server never looks inside a Stripe payload.
use log::*;
use mcs_common::UsdCents;
use serde::Deserialize;
use serde_json::Value;
use storefront_engine::db_types::{CatalogUpdate, OrderId, PaymentOutcome, PaymentProvider, PaymentResult};

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

/// What the webhook handler should do with an event.
#[derive(Debug, Clone)]
pub enum StripeAction {
    Payment(PaymentOutcome),
    CatalogProduct(CatalogUpdate),
    CatalogPrice { product_id: String, price: UsdCents, price_id: String },
    CatalogDelete { product_id: String },
    /// An event type we do not handle, or one we handle but whose payload carried no usable order
    /// reference. Both are acknowledged so the provider stops retrying.
    Ignore,
}

pub fn interpret_event(event: &StripeEvent) -> StripeAction {
    let object = &event.data.object;
    match event.event_type.as_str() {
        // Sessions and intents both complete the order; the completion guard makes receiving both for the
        // same payment harmless.
        "checkout.session.completed" | "payment_intent.succeeded" => match order_id_from_session(object) {
            Some(order_id) => StripeAction::Payment(PaymentOutcome {
                provider: PaymentProvider::Stripe,
                order_id,
                outcome: PaymentResult::Succeeded,
            }),
            None => {
                warn!("💳️ Stripe event {} has no order reference. Ignoring.", event.id);
                StripeAction::Ignore
            },
        },
        "checkout.session.expired" => match order_id_from_session(object) {
            Some(order_id) => StripeAction::Payment(PaymentOutcome {
                provider: PaymentProvider::Stripe,
                order_id,
                outcome: PaymentResult::Failed { reason: "checkout session expired".to_string() },
            }),
            None => StripeAction::Ignore,
        },
        "payment_intent.payment_failed" => match order_id_from_session(object) {
            Some(order_id) => {
                let reason = object["last_payment_error"]["message"]
                    .as_str()
                    .unwrap_or("payment failed")
                    .to_string();
                StripeAction::Payment(PaymentOutcome {
                    provider: PaymentProvider::Stripe,
                    order_id,
                    outcome: PaymentResult::Failed { reason },
                })
            },
            None => {
                // Failed intents without our metadata are payments that never came through our checkout.
                debug!("💳️ Stripe event {} has no order reference. Ignoring.", event.id);
                StripeAction::Ignore
            },
        },
        "product.created" | "product.updated" => StripeAction::CatalogProduct(catalog_update_from_product(object)),
        "product.deleted" => match object["id"].as_str() {
            Some(id) => StripeAction::CatalogDelete { product_id: id.to_string() },
            None => StripeAction::Ignore,
        },
        "price.created" | "price.updated" => match price_update(object) {
            Some((product_id, price, price_id)) => StripeAction::CatalogPrice { product_id, price, price_id },
            None => StripeAction::Ignore,
        },
        other => {
            trace!("💳️ Ignoring Stripe event type {other}");
            StripeAction::Ignore
        },
    }
}

/// The order id travels in `client_reference_id` on checkout sessions and in the metadata on both sessions
/// and payment intents.
fn order_id_from_session(object: &Value) -> Option<OrderId> {
    object["client_reference_id"]
        .as_str()
        .or_else(|| object["metadata"]["order_id"].as_str())
        .filter(|s| !s.is_empty())
        .map(|s| OrderId(s.to_string()))
}

fn catalog_update_from_product(object: &Value) -> CatalogUpdate {
    let metadata = &object["metadata"];
    let stock = metadata["stock"].as_str().and_then(|s| s.parse::<i64>().ok()).map(|s| s.max(0));
    let category = metadata["category"].as_str().unwrap_or("items").to_string();
    let sort_order = metadata["sort_order"].as_str().and_then(|s| s.parse::<i64>().ok()).unwrap_or(0);
    CatalogUpdate {
        provider: PaymentProvider::Stripe,
        provider_product_id: object["id"].as_str().unwrap_or_default().to_string(),
        provider_variation_id: None,
        title: object["name"].as_str().unwrap_or("Unnamed Product").to_string(),
        description: object["description"].as_str().unwrap_or_default().to_string(),
        category,
        image_url: object["images"].as_array().and_then(|a| a.first()).and_then(|v| v.as_str()).map(String::from),
        is_active: object["active"].as_bool().unwrap_or(true),
        stock,
        sort_order,
    }
}

fn price_update(object: &Value) -> Option<(String, UsdCents, String)> {
    let product_id = object["product"].as_str()?.to_string();
    let amount = object["unit_amount"].as_i64()?;
    let price_id = object["id"].as_str()?.to_string();
    Some((product_id, UsdCents::from(amount), price_id))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn event(event_type: &str, object: Value) -> StripeEvent {
        StripeEvent {
            id: "evt_1".to_string(),
            event_type: event_type.to_string(),
            data: StripeEventData { object },
        }
    }

    #[test]
    fn completed_sessions_become_successful_outcomes() {
        let ev = event("checkout.session.completed", json!({"client_reference_id": "abc-123"}));
        let StripeAction::Payment(outcome) = interpret_event(&ev) else { panic!("expected payment") };
        assert_eq!(outcome.order_id.as_str(), "abc-123");
        assert_eq!(outcome.outcome, PaymentResult::Succeeded);
    }

    #[test]
    fn metadata_is_the_fallback_order_reference() {
        let ev = event("checkout.session.completed", json!({"metadata": {"order_id": "abc-123"}}));
        let StripeAction::Payment(outcome) = interpret_event(&ev) else { panic!("expected payment") };
        assert_eq!(outcome.order_id.as_str(), "abc-123");
    }

    #[test]
    fn succeeded_intents_complete_the_order_too() {
        let ev = event("payment_intent.succeeded", json!({"metadata": {"order_id": "abc-123"}}));
        let StripeAction::Payment(outcome) = interpret_event(&ev) else { panic!("expected payment") };
        assert_eq!(outcome.order_id.as_str(), "abc-123");
        assert_eq!(outcome.outcome, PaymentResult::Succeeded);
    }

    #[test]
    fn failed_intents_carry_the_decline_reason() {
        let ev = event(
            "payment_intent.payment_failed",
            json!({
                "metadata": {"order_id": "abc-123"},
                "last_payment_error": {"message": "Your card was declined."}
            }),
        );
        let StripeAction::Payment(outcome) = interpret_event(&ev) else { panic!("expected payment") };
        assert_eq!(outcome.outcome, PaymentResult::Failed { reason: "Your card was declined.".to_string() });
    }

    #[test]
    fn unreferenced_payment_events_are_ignored() {
        let ev = event("checkout.session.completed", json!({"metadata": {}}));
        assert!(matches!(interpret_event(&ev), StripeAction::Ignore));
    }

    #[test]
    fn product_events_become_catalog_updates() {
        let ev = event(
            "product.updated",
            json!({
                "id": "prod_123",
                "name": "VIP Rank",
                "description": "Shiny",
                "active": true,
                "images": ["https://img.example.com/vip.png"],
                "metadata": {"stock": "25", "category": "ranks", "sort_order": "3"}
            }),
        );
        let StripeAction::CatalogProduct(update) = interpret_event(&ev) else { panic!("expected catalog update") };
        assert_eq!(update.provider_product_id, "prod_123");
        assert_eq!(update.title, "VIP Rank");
        assert_eq!(update.stock, Some(25));
        assert_eq!(update.category, "ranks");
        assert_eq!(update.sort_order, 3);
        assert_eq!(update.image_url.as_deref(), Some("https://img.example.com/vip.png"));
    }

    #[test]
    fn missing_or_negative_stock_metadata_is_normalised() {
        let ev = event("product.created", json!({"id": "prod_1", "name": "Thing", "metadata": {}}));
        let StripeAction::CatalogProduct(update) = interpret_event(&ev) else { panic!("expected catalog update") };
        assert_eq!(update.stock, None);
        assert_eq!(update.category, "items");

        let ev = event("product.created", json!({"id": "prod_1", "name": "Thing", "metadata": {"stock": "-5"}}));
        let StripeAction::CatalogProduct(update) = interpret_event(&ev) else { panic!("expected catalog update") };
        assert_eq!(update.stock, Some(0));
    }

    #[test]
    fn price_events_reference_their_product() {
        let ev = event("price.created", json!({"id": "price_9", "product": "prod_123", "unit_amount": 999}));
        let StripeAction::CatalogPrice { product_id, price, price_id } = interpret_event(&ev) else {
            panic!("expected price update")
        };
        assert_eq!(product_id, "prod_123");
        assert_eq!(price, UsdCents::from(999));
        assert_eq!(price_id, "price_9");
    }

    #[test]
    fn unknown_event_types_are_ignored() {
        let ev = event("customer.created", json!({}));
        assert!(matches!(interpret_event(&ev), StripeAction::Ignore));
    }
}
