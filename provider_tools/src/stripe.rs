use std::sync::Arc;

use log::*;
use mcs_common::{Secret, UsdCents, USD_CURRENCY_CODE_LOWER};
use reqwest::Client;
use serde::Deserialize;

use crate::ProviderApiError;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub success_url: String,
    pub cancel_url: String,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let secret_key = Secret::new(std::env::var("MCS_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("MCS_STRIPE_SECRET_KEY not set, using (probably useless) default");
            "sk_test_00000000000000".to_string()
        }));
        let success_url = std::env::var("MCS_CHECKOUT_SUCCESS_URL").unwrap_or_else(|_| {
            warn!("MCS_CHECKOUT_SUCCESS_URL not set, using localhost default");
            "http://localhost:5173/success".to_string()
        });
        let cancel_url = std::env::var("MCS_CHECKOUT_CANCEL_URL").unwrap_or_else(|_| {
            warn!("MCS_CHECKOUT_CANCEL_URL not set, using localhost default");
            "http://localhost:5173/cancel".to_string()
        });
        Self { secret_key, success_url, cancel_url }
    }
}

/// A line of a checkout session. When the product is mirrored from Stripe's own catalog, `price_id` carries
/// the Stripe price and the amount fields are ignored; otherwise an ad-hoc price is created inline.
#[derive(Debug, Clone)]
pub struct SessionLineItem {
    pub name: String,
    pub quantity: i64,
    pub unit_amount: UsdCents,
    pub price_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, ProviderApiError> {
        let client = Client::builder().build().map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Creates a hosted checkout session for a pending order. The order id travels in
    /// `client_reference_id` and in the session metadata; the webhook uses either one to correlate the
    /// completed session back to the order.
    ///
    /// The caller may steer where the buyer lands after paying or cancelling. Unset URLs fall back to the
    /// configured defaults.
    pub async fn create_checkout_session(
        &self,
        order_id: &str,
        minecraft_username: &str,
        lines: &[SessionLineItem],
        success_url: Option<&str>,
        cancel_url: Option<&str>,
    ) -> Result<CheckoutSession, ProviderApiError> {
        let params = session_params(&self.config, order_id, minecraft_username, lines, success_url, cancel_url);
        debug!("💳️ Creating Stripe checkout session for order {order_id}");
        let response = self
            .client
            .post(format!("{STRIPE_API_BASE}/checkout/sessions"))
            .bearer_auth(self.config.secret_key.reveal())
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
            return Err(ProviderApiError::QueryError { status, message });
        }
        let session =
            response.json::<CheckoutSession>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))?;
        info!("💳️ Stripe session {} created for order {order_id}", session.id);
        Ok(session)
    }
}

// Stripe's v1 API is form-encoded, with nested fields spelled out in bracket notation.
fn session_params(
    config: &StripeConfig,
    order_id: &str,
    minecraft_username: &str,
    lines: &[SessionLineItem],
    success_url: Option<&str>,
    cancel_url: Option<&str>,
) -> Vec<(String, String)> {
    let success_url = success_url.unwrap_or(&config.success_url).to_string();
    let cancel_url = cancel_url.unwrap_or(&config.cancel_url).to_string();
    let mut params: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("client_reference_id".into(), order_id.to_string()),
        ("metadata[order_id]".into(), order_id.to_string()),
        ("metadata[minecraft_username]".into(), minecraft_username.to_string()),
        ("success_url".into(), success_url),
        ("cancel_url".into(), cancel_url),
    ];
    for (i, line) in lines.iter().enumerate() {
        match &line.price_id {
            Some(price_id) => {
                params.push((format!("line_items[{i}][price]"), price_id.clone()));
            },
            None => {
                params.push((format!("line_items[{i}][price_data][currency]"), USD_CURRENCY_CODE_LOWER.to_string()));
                params.push((format!("line_items[{i}][price_data][product_data][name]"), line.name.clone()));
                params.push((
                    format!("line_items[{i}][price_data][unit_amount]"),
                    line.unit_amount.value().to_string(),
                ));
            },
        }
        params.push((format!("line_items[{i}][quantity]"), line.quantity.to_string()));
    }
    params
}
