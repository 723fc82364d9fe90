//! Interpretation of Square webhook events.
//!
//! Square's payload shapes differ from Stripe's in two ways that matter here. Payments arrive in several
//! stages (`payment.created` before the terminal `payment.updated`), and catalog changes arrive as a bare
//! version bump with no object data, so a `catalog.version.updated` triggers a full catalog pull rather
//! than an in-place update.
use std::sync::OnceLock;

use log::*;
use provider_tools::SquareCatalogItem;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use storefront_engine::db_types::{CatalogUpdate, OrderId, PaymentOutcome, PaymentProvider, PaymentResult};

#[derive(Debug, Clone, Deserialize)]
pub struct SquareEvent {
    pub event_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone)]
pub enum SquareAction {
    /// A terminal payment status. Feed it through the order state machine.
    Payment(PaymentOutcome),
    /// A payment has been created but not yet settled. Move the order to `Processing`.
    PaymentCreated(OrderId),
    /// The catalog version changed. The handler pulls the full catalog and mirrors it.
    CatalogChanged,
    Ignore,
}

pub fn interpret_event(event: &SquareEvent) -> SquareAction {
    let payment = &event.data["object"]["payment"];
    match event.event_type.as_str() {
        "payment.created" => match order_id_from_payment(payment) {
            Some(order_id) => SquareAction::PaymentCreated(order_id),
            None => {
                debug!("🟨️ Square event {} carries no order reference. Ignoring.", event.event_id);
                SquareAction::Ignore
            },
        },
        "payment.updated" => {
            let Some(order_id) = order_id_from_payment(payment) else {
                warn!("🟨️ Square event {} carries no order reference. Ignoring.", event.event_id);
                return SquareAction::Ignore;
            };
            match payment["status"].as_str() {
                Some("COMPLETED") => SquareAction::Payment(PaymentOutcome {
                    provider: PaymentProvider::Square,
                    order_id,
                    outcome: PaymentResult::Succeeded,
                }),
                Some("FAILED") | Some("CANCELED") => SquareAction::Payment(PaymentOutcome {
                    provider: PaymentProvider::Square,
                    order_id,
                    outcome: PaymentResult::Failed {
                        reason: format!("payment {}", payment["status"].as_str().unwrap_or("failed").to_lowercase()),
                    },
                }),
                other => {
                    trace!("🟨️ Square payment for {order_id} is in state {other:?}. Waiting for a terminal state.");
                    SquareAction::Ignore
                },
            }
        },
        "catalog.version.updated" => SquareAction::CatalogChanged,
        other => {
            trace!("🟨️ Ignoring Square event type {other}");
            SquareAction::Ignore
        },
    }
}

/// Extract our order id from a Square payment object.
///
/// The payment link is created with the order id in `reference_id`, which is the reliable channel. Older
/// payments (and payments made against a stale link) only carry the human-readable note, so the
/// `Order: <uuid>` prefix of the note is the fallback.
pub fn order_id_from_payment(payment: &Value) -> Option<OrderId> {
    if let Some(reference) = payment["reference_id"].as_str().filter(|s| !s.is_empty()) {
        return Some(OrderId(reference.to_string()));
    }
    let note = payment["note"].as_str()?;
    static NOTE_RE: OnceLock<Regex> = OnceLock::new();
    let re = NOTE_RE.get_or_init(|| Regex::new(r"Order: ([A-Fa-f0-9-]{8,})").unwrap());
    re.captures(note).and_then(|c| c.get(1)).map(|m| OrderId(m.as_str().to_string()))
}

/// Map one flattened Square catalog item onto the provider-neutral catalog update. Square items carry no
/// stock figure, so `stock` is `None` and the mirror's own stock level is left alone.
pub fn catalog_update_from_item(item: &SquareCatalogItem) -> CatalogUpdate {
    CatalogUpdate {
        provider: PaymentProvider::Square,
        provider_product_id: item.item_id.clone(),
        provider_variation_id: item.variation_id.clone(),
        title: item.name.clone(),
        description: item.description.clone(),
        category: "items".to_string(),
        image_url: None,
        is_active: !item.is_deleted,
        stock: None,
        sort_order: 0,
    }
}
