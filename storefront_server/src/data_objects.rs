use serde::{Deserialize, Serialize};
use storefront_engine::{CartLine, CartRequest};

/// An incoming cart submission. Prices never appear here; the server prices everything from its own
/// catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartItem>,
    pub minecraft_username: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Where the provider sends the buyer after paying. Falls back to the configured default when unset.
    #[serde(default)]
    pub success_url: Option<String>,
    /// Where the provider sends the buyer after abandoning the session. Falls back to the configured
    /// default when unset.
    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: i64,
}

impl From<CheckoutRequest> for CartRequest {
    fn from(req: CheckoutRequest) -> Self {
        CartRequest {
            items: req
                .items
                .into_iter()
                .map(|i| CartLine { product_id: i.product_id, quantity: i.quantity })
                .collect(),
            minecraft_username: req.minecraft_username,
            user_id: req.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    /// The provider-hosted payment page the client should redirect to.
    pub url: String,
    pub order_id: String,
}

/// An absolute stock override from the admin panel.
#[derive(Debug, Clone, Deserialize)]
pub struct SetStockRequest {
    pub stock: i64,
}

/// The body every webhook route returns on accepted deliveries. Providers only care about the 200; the body
/// is a courtesy for anyone reading the delivery logs.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { received: true }
    }
}
