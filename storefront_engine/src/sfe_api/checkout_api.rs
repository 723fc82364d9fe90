use std::fmt::Debug;

use log::*;
use mcs_common::UsdCents;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, PaymentProvider},
    traits::{StorefrontDatabase, StorefrontError},
};

/// A line in an incoming cart, exactly as the client sent it. Quantities and product ids are untrusted;
/// prices are never accepted from the client at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartRequest {
    pub items: Vec<CartLine>,
    pub minecraft_username: String,
    pub user_id: Option<String>,
}

/// A validated cart line, priced from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub product_id: String,
    pub title: String,
    pub quantity: i64,
    pub unit_price: UsdCents,
    pub stripe_price_id: Option<String>,
}

/// A pending order, ready to be handed to a payment provider for session creation.
#[derive(Debug, Clone)]
pub struct PendingCheckout {
    pub order: Order,
    pub lines: Vec<CheckoutLine>,
}

impl PendingCheckout {
    /// The note attached to Square payment links. The structured `reference_id` is the primary correlation
    /// channel; the note is the human-readable (and legacy-parseable) fallback.
    pub fn payment_note(&self) -> String {
        let items =
            self.lines.iter().map(|l| format!("{} x{}", l.title, l.quantity)).collect::<Vec<_>>().join(", ");
        format!("Order: {} | Minecraft: {} | Items: {items}", self.order.id.as_str(), self.order.minecraft_username)
    }
}

/// `CheckoutApi` validates carts against the product catalog and creates pending orders. All price and stock
/// authority lives here; the client's cart only names products and quantities.
pub struct CheckoutApi<B> {
    db: B,
    minimum_order: UsdCents,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B, minimum_order: UsdCents) -> Self {
        Self { db, minimum_order }
    }
}

impl<B> CheckoutApi<B>
where B: StorefrontDatabase
{
    /// Validate the cart and create a pending order for it.
    ///
    /// Every line is checked against the catalog: the product must exist, be active, and have enough stock
    /// for the requested quantity. Prices are read from the catalog, never from the request. The cart total
    /// must meet the store's minimum order amount. If any check fails, no order row is created.
    ///
    /// Stock is NOT reserved here. The decrement happens when the payment settles, so two concurrent
    /// checkouts can both pass validation for the last unit; the ledger clamps at zero when the second
    /// payment lands.
    pub async fn create_pending_order(
        &self,
        cart: CartRequest,
        provider: PaymentProvider,
    ) -> Result<PendingCheckout, StorefrontError> {
        if cart.minecraft_username.trim().is_empty() {
            return Err(StorefrontError::UsernameRequired);
        }
        if cart.items.is_empty() {
            return Err(StorefrontError::EmptyCart);
        }
        let mut lines = Vec::with_capacity(cart.items.len());
        let mut total = UsdCents::default();
        for line in &cart.items {
            if line.quantity <= 0 {
                return Err(StorefrontError::InvalidQuantity);
            }
            let product = self
                .db
                .fetch_product(&line.product_id)
                .await?
                .ok_or_else(|| StorefrontError::ProductNotFound(line.product_id.clone()))?;
            if !product.is_active {
                return Err(StorefrontError::ProductNotAvailable(product.title));
            }
            if product.stock < line.quantity {
                return Err(StorefrontError::InsufficientStock {
                    title: product.title,
                    requested: line.quantity,
                    available: product.stock,
                });
            }
            total += product.price * line.quantity;
            lines.push(CheckoutLine {
                product_id: product.id,
                title: product.title,
                quantity: line.quantity,
                unit_price: product.price,
                stripe_price_id: product.stripe_price_id,
            });
        }
        if total < self.minimum_order {
            return Err(StorefrontError::OrderBelowMinimum { total, minimum: self.minimum_order });
        }
        let new_order = NewOrder {
            user_id: cart.user_id,
            minecraft_username: cart.minecraft_username.trim().to_string(),
            total_amount: total,
            provider,
        };
        let items = lines
            .iter()
            .map(|l| NewOrderItem { product_id: l.product_id.clone(), quantity: l.quantity, unit_price: l.unit_price })
            .collect::<Vec<_>>();
        let order = self.db.insert_order(new_order, &items).await?;
        info!(
            "🛒️ Created pending order {} for {} via {provider}. Total: {total}",
            order.id, order.minecraft_username
        );
        Ok(PendingCheckout { order, lines })
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
