use std::sync::Arc;

use log::*;
use mcs_common::{Secret, UsdCents, USD_CURRENCY_CODE};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::ProviderApiError;

#[derive(Debug, Clone)]
pub struct SquareConfig {
    pub access_token: Secret<String>,
    pub location_id: String,
    pub api_base: String,
    pub redirect_url: String,
}

impl Default for SquareConfig {
    fn default() -> Self {
        Self {
            access_token: Secret::default(),
            location_id: String::new(),
            api_base: "https://connect.squareup.com".to_string(),
            redirect_url: String::new(),
        }
    }
}

impl SquareConfig {
    pub fn new_from_env_or_default() -> Self {
        let access_token = Secret::new(std::env::var("MCS_SQUARE_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("MCS_SQUARE_ACCESS_TOKEN not set, using (probably useless) default");
            "EAAA00000000000000".to_string()
        }));
        let location_id = std::env::var("MCS_SQUARE_LOCATION_ID").unwrap_or_else(|_| {
            warn!("MCS_SQUARE_LOCATION_ID not set, using (probably useless) default");
            "L000000000".to_string()
        });
        let api_base = std::env::var("MCS_SQUARE_API_BASE").unwrap_or_else(|_| {
            info!("MCS_SQUARE_API_BASE not set, using production");
            "https://connect.squareup.com".to_string()
        });
        let redirect_url = std::env::var("MCS_CHECKOUT_SUCCESS_URL").unwrap_or_else(|_| {
            warn!("MCS_CHECKOUT_SUCCESS_URL not set, using localhost default");
            "http://localhost:5173/success".to_string()
        });
        Self { access_token, location_id, api_base, redirect_url }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SquarePaymentLink {
    pub id: String,
    pub url: String,
    pub order_id: Option<String>,
}

/// One sellable variation pulled from the Square catalog, flattened from Square's nested
/// `CatalogObject` shape.
#[derive(Debug, Clone)]
pub struct SquareCatalogItem {
    pub item_id: String,
    pub variation_id: Option<String>,
    pub name: String,
    pub description: String,
    pub price: Option<UsdCents>,
    pub is_deleted: bool,
}

#[derive(Clone)]
pub struct SquareApi {
    config: SquareConfig,
    client: Arc<Client>,
}

impl SquareApi {
    pub fn new(config: SquareConfig) -> Result<Self, ProviderApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.access_token.reveal()))
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2{path}", self.config.api_base)
    }

    /// Creates a hosted payment link for a pending order.
    ///
    /// The order id is recorded twice: as the structured `reference_id` on the underlying Square order, and
    /// inside the free-text payment note. The webhook prefers the former and falls back to parsing the note.
    /// The order id doubles as the idempotency key, so retrying after a timeout cannot mint a second link.
    /// A per-request `redirect_url` overrides the configured one.
    pub async fn create_payment_link(
        &self,
        order_id: &str,
        total: UsdCents,
        description: &str,
        payment_note: &str,
        redirect_url: Option<&str>,
    ) -> Result<SquarePaymentLink, ProviderApiError> {
        let body = payment_link_body(&self.config, order_id, total, description, payment_note, redirect_url);
        debug!("💳️ Creating Square payment link for order {order_id}");
        let result = self.post_json("/online-checkout/payment-links", body).await?;
        let link: SquarePaymentLink = serde_json::from_value(result["payment_link"].clone())
            .map_err(|e| ProviderApiError::JsonError(e.to_string()))?;
        info!("💳️ Square payment link {} created for order {order_id}", link.id);
        Ok(link)
    }

    /// Pulls every ITEM object from the Square catalog, following pagination cursors. Used by the
    /// `catalog.version.updated` sync, which re-mirrors the whole catalog rather than diffing.
    pub async fn list_catalog_items(&self) -> Result<Vec<SquareCatalogItem>, ProviderApiError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut url = format!("{}?types=ITEM", self.url("/catalog/list"));
            if let Some(c) = &cursor {
                url = format!("{url}&cursor={c}");
            }
            let response = self.client.get(url).send().await.map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
            if !response.status().is_success() {
                let status = response.status().as_u16();
                let message = response.text().await.map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
                return Err(ProviderApiError::QueryError { status, message });
            }
            let page = response.json::<Value>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))?;
            if let Some(objects) = page["objects"].as_array() {
                items.extend(objects.iter().map(parse_catalog_object));
            }
            cursor = page["cursor"].as_str().map(String::from);
            if cursor.is_none() {
                break;
            }
        }
        debug!("🗃️ Pulled {} items from the Square catalog", items.len());
        Ok(items)
    }
}

fn payment_link_body(
    config: &SquareConfig,
    order_id: &str,
    total: UsdCents,
    description: &str,
    payment_note: &str,
    redirect_url: Option<&str>,
) -> Value {
    json!({
        "idempotency_key": order_id,
        "quick_pay": {
            "name": description,
            "price_money": { "amount": total.value(), "currency": USD_CURRENCY_CODE },
            "location_id": config.location_id,
        },
        "checkout_options": { "redirect_url": redirect_url.unwrap_or(&config.redirect_url) },
        "payment_note": payment_note,
        "pre_populated_data": {},
        "order": { "reference_id": order_id },
    })
}

fn parse_catalog_object(object: &Value) -> SquareCatalogItem {
    let item_id = object["id"].as_str().unwrap_or_default().to_string();
    let data = &object["item_data"];
    let name = data["name"].as_str().unwrap_or_default().to_string();
    let description = data["description"].as_str().unwrap_or_default().to_string();
    let is_deleted = object["is_deleted"].as_bool().unwrap_or(false);
    // The first variation carries the price. Multi-variation items are not used by the store.
    let variation = data["variations"].as_array().and_then(|v| v.first());
    let variation_id = variation.and_then(|v| v["id"].as_str()).map(String::from);
    let price = variation
        .and_then(|v| v["item_variation_data"]["price_money"]["amount"].as_i64())
        .map(UsdCents::from);
    SquareCatalogItem { item_id, variation_id, name, description, price, is_deleted }
}

impl SquareApi {
    async fn post_json(&self, path: &str, body: Value) -> Result<Value, ProviderApiError> {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
        if response.status().is_success() {
            response.json::<Value>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
            Err(ProviderApiError::QueryError { status, message })
        }
    }
}
