use mcs_common::UsdCents;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Product, StoreUser};

/// One fulfilled order line, with the product title resolved so event subscribers (tickets, receipts,
/// announcements) do not need database access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfilledItem {
    pub product_id: String,
    pub title: String,
    pub quantity: i64,
    pub unit_price: UsdCents,
}

/// Emitted once per order, after the guarded completion transition has succeeded and stock has been
/// decremented. Redelivered webhooks never produce a second event for the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCompletedEvent {
    pub order: Order,
    pub items: Vec<FulfilledItem>,
    /// The buyer's storefront account, if the order was placed while logged in. Side effects that need a
    /// Discord id or email address fall back gracefully when this is `None`.
    pub user: Option<StoreUser>,
}

impl OrderCompletedEvent {
    pub fn new(order: Order, items: Vec<FulfilledItem>, user: Option<StoreUser>) -> Self {
        Self { order, items, user }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub order: Order,
    pub reason: String,
}

impl PaymentFailedEvent {
    pub fn new(order: Order, reason: String) -> Self {
        Self { order, reason }
    }
}

/// Emitted by the catalog sync when a limited-stock product's stock level rises, or when a new limited-stock
/// product appears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRestockedEvent {
    pub product: Product,
    pub old_stock: i64,
    pub is_new: bool,
}

impl ProductRestockedEvent {
    pub fn new(product: Product, old_stock: i64, is_new: bool) -> Self {
        Self { product, old_stock, is_new }
    }
}
