use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mcs_common::{short_ref, UsdCents};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

//--------------------------------------     PaymentProvider   --------------------------------------------------------
/// The payment processor an order was checked out with. The two processors are interchangeable from the
/// storefront's point of view; the provider is recorded on the order purely for bookkeeping and catalog sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentProvider {
    Stripe,
    Square,
}

impl Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentProvider::Stripe => write!(f, "Stripe"),
            PaymentProvider::Square => write!(f, "Square"),
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "square" => Ok(Self::Square),
            s => Err(ConversionError(format!("Unknown payment provider: {s}"))),
        }
    }
}

//--------------------------------------     OrderStatus       --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order has been created at checkout and no payment event has arrived yet.
    Pending,
    /// The provider has reported a payment in flight (Square sends `payment.created` before the outcome).
    Processing,
    /// Payment settled. Terminal for the webhook path.
    Completed,
    /// Payment failed or was cancelled. Terminal for the webhook path.
    Cancelled,
    /// Set manually by an admin. Never set by the webhook path.
    Refunded,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Processing => write!(f, "Processing"),
            OrderStatus::Completed => write!(f, "Completed"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
            OrderStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        OrderId        --------------------------------------------------------
/// A lightweight wrapper around the order's uuid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The short human-facing form used in notifications and embeds, e.g. `9F8B2C41`.
    pub fn short(&self) -> String {
        short_ref(&self.0)
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.short())
    }
}

//--------------------------------------        Order          --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// The storefront account that placed the order, if the buyer was logged in.
    pub user_id: Option<String>,
    /// The in-game username the purchase is delivered to.
    pub minecraft_username: String,
    pub total_amount: UsdCents,
    pub status: OrderStatus,
    /// The idempotency flag. Transitions false -> true exactly once, together with `status` becoming
    /// `Completed`. Guards the stock decrement and all completion side effects against redelivered webhooks.
    pub stock_decremented: bool,
    pub provider: PaymentProvider,
    /// The provider's session/payment-link id, recorded once the checkout session has been created.
    pub provider_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<String>,
    pub minecraft_username: String,
    pub total_amount: UsdCents,
    pub provider: PaymentProvider,
}

//--------------------------------------      Order items      --------------------------------------------------------
/// A line of an order. Immutable once inserted; `unit_price` is the price at time of purchase, not a
/// reference to the product's current price.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: UsdCents,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: UsdCents,
}

//--------------------------------------        Product        --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: UsdCents,
    pub stock: i64,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub sort_order: i64,
    pub stripe_product_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub square_item_id: Option<String>,
    pub square_variation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An absolute product snapshot from a provider's catalog. Applied as an upsert keyed on the provider's
/// product id. When `stock` is present it is an absolute set, not a delta; when it is `None` the event
/// carried no stock figure, and the local level is left alone (new products default to effectively
/// unlimited).
#[derive(Debug, Clone)]
pub struct CatalogUpdate {
    pub provider: PaymentProvider,
    pub provider_product_id: String,
    pub provider_variation_id: Option<String>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub stock: Option<i64>,
    pub sort_order: i64,
}

/// The result of applying a [`CatalogUpdate`]: the stored product, whether it was newly created, and the
/// stock level before the update (for restock detection).
#[derive(Debug, Clone)]
pub struct CatalogUpsert {
    pub product: Product,
    pub created: bool,
    pub old_stock: i64,
}

//--------------------------------------   AdminNotification   --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AdminNotification {
    pub id: i64,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub reference_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAdminNotification {
    pub kind: String,
    pub title: String,
    pub message: String,
    pub reference_id: Option<String>,
}

impl NewAdminNotification {
    pub fn new_order(order: &Order, buyer: &str) -> Self {
        Self {
            kind: "new_order".to_string(),
            title: "New Order Received".to_string(),
            message: format!("Order {} from {buyer} - {}", order.id, order.total_amount),
            reference_id: Some(order.id.as_str().to_string()),
        }
    }

    pub fn payment_failed(order: &Order, reason: &str) -> Self {
        Self {
            kind: "payment_failed".to_string(),
            title: "Payment Failed".to_string(),
            message: format!("Order {} payment {reason}", order.id),
            reference_id: Some(order.id.as_str().to_string()),
        }
    }
}

//--------------------------------------        StoreUser      --------------------------------------------------------
/// The slice of the storefront's user table the reconciliation flow needs for side effects.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StoreUser {
    pub id: String,
    pub discord_id: Option<String>,
    pub discord_username: Option<String>,
    pub email: Option<String>,
}

//--------------------------------------     PaymentOutcome    --------------------------------------------------------
/// The provider-agnostic form every webhook payload is normalised into before it reaches the order state
/// machine. The state machine never sees a Stripe or Square payload shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub provider: PaymentProvider,
    pub order_id: OrderId,
    pub outcome: PaymentResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentResult {
    Succeeded,
    Failed { reason: String },
}
