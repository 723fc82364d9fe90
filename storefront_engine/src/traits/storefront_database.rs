use mcs_common::UsdCents;
use thiserror::Error;

use crate::db_types::{
    AdminNotification,
    CatalogUpdate,
    CatalogUpsert,
    NewAdminNotification,
    NewOrder,
    NewOrderItem,
    Order,
    OrderId,
    OrderItem,
    OrderStatus,
    PaymentProvider,
    Product,
    StoreUser,
};

/// This trait defines the storage behaviour backing the storefront payment engine.
///
/// This behaviour includes:
/// * Creating pending orders and their line items at checkout time.
/// * The guarded, idempotent completion transition used by the webhook reconciliation flow.
/// * The atomic stock ledger.
/// * Mirroring the provider's product catalog.
/// * Admin notifications and the user lookups needed for side effects.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Inserts a pending order together with its line items in a single atomic transaction.
    /// The order id is generated here; item rows are immutable once inserted.
    async fn insert_order(&self, order: NewOrder, items: &[NewOrderItem]) -> Result<Order, StorefrontError>;

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError>;

    async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, StorefrontError>;

    /// Records the provider's session / payment-link id on the order once the checkout session exists.
    async fn set_provider_reference(&self, id: &OrderId, reference: &str) -> Result<(), StorefrontError>;

    /// Removes a pending order (and its items) again. Used when provider session creation fails after the
    /// order row was created; a non-pending order is never deleted.
    async fn discard_pending_order(&self, id: &OrderId) -> Result<(), StorefrontError>;

    /// Moves a `Pending` order to `Processing`. Returns `None` if the order does not exist or has already
    /// left the `Pending` state.
    async fn mark_order_processing(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError>;

    /// The idempotency guard at the heart of the reconciliation flow: a single conditional update that sets
    /// `status = Completed` and `stock_decremented = true` only where `stock_decremented` is still false,
    /// returning the updated row.
    ///
    /// Payment providers deliver webhooks at least once; on redelivery this update matches zero rows and
    /// `None` is returned, which tells the caller to skip the stock decrement and every side effect.
    async fn complete_order_once(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError>;

    /// Sets the order status to `Cancelled`, but only while the order is still `Pending` or `Processing`.
    /// A declined first attempt can be followed by a successful retry, so a late failure event must never
    /// cancel a completed order. Returns `None` when the order does not exist or has already completed.
    async fn cancel_order(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError>;

    /// An administrative override of the order status, outside the guarded webhook transitions. This is how
    /// `Refunded` is reached.
    async fn set_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order, StorefrontError>;

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, StorefrontError>;

    /// Atomically decrements the product's stock by `quantity`, clamped at zero. The decrement happens in a
    /// single UPDATE at the storage layer so that concurrent decrements from unrelated orders on the same
    /// product cannot interleave. Returns the stock level after the decrement.
    async fn decrement_stock(&self, product_id: &str, quantity: i64) -> Result<i64, StorefrontError>;

    /// Sets a product's stock to an absolute value (clamped at zero). Used by catalog sync and admin tooling.
    async fn set_stock(&self, product_id: &str, stock: i64) -> Result<Product, StorefrontError>;

    /// Applies an absolute product snapshot from a provider catalog, keyed on the provider's product id.
    /// Inserts the product (with a zero price, to be filled in by the price event) when it is not known yet.
    async fn upsert_catalog_product(&self, update: CatalogUpdate) -> Result<CatalogUpsert, StorefrontError>;

    /// Records the price from a provider price event against the product carrying the given provider product
    /// id. When the price event arrives before the product event, an inactive placeholder product is created
    /// so the price is not lost.
    async fn set_price_for_provider_product(
        &self,
        provider: PaymentProvider,
        provider_product_id: &str,
        price: UsdCents,
        price_reference: Option<&str>,
    ) -> Result<Product, StorefrontError>;

    /// Deactivates the product carrying the given provider product id. Products are never deleted.
    async fn deactivate_provider_product(
        &self,
        provider: PaymentProvider,
        provider_product_id: &str,
    ) -> Result<(), StorefrontError>;

    async fn insert_admin_notification(
        &self,
        notification: NewAdminNotification,
    ) -> Result<AdminNotification, StorefrontError>;

    async fn mark_notification_read(&self, id: i64) -> Result<(), StorefrontError>;

    async fn delete_notification(&self, id: i64) -> Result<(), StorefrontError>;

    async fn fetch_user(&self, user_id: &str) -> Result<Option<StoreUser>, StorefrontError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StorefrontError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorefrontError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Product is not available: {0}")]
    ProductNotAvailable(String),
    #[error("Insufficient stock for {title} (requested: {requested}, available: {available})")]
    InsufficientStock { title: String, requested: i64, available: i64 },
    #[error("Minimum order amount is {minimum}. Your cart total is {total}")]
    OrderBelowMinimum { total: UsdCents, minimum: UsdCents },
    #[error("No items in cart")]
    EmptyCart,
    #[error("Minecraft username required")]
    UsernameRequired,
    #[error("Order item quantities must be positive")]
    InvalidQuantity,
    #[error("The requested order change is forbidden.")]
    OrderModificationForbidden,
}

impl From<sqlx::Error> for StorefrontError {
    fn from(e: sqlx::Error) -> Self {
        StorefrontError::DatabaseError(e.to_string())
    }
}
