use std::fmt::Debug;

use log::*;
use mcs_common::UsdCents;

use crate::{
    db_types::{CatalogUpdate, PaymentProvider, Product},
    events::{EventProducers, ProductRestockedEvent},
    traits::{StorefrontDatabase, StorefrontError},
};

/// A product with metadata stock at or above this value is treated as effectively unlimited, and is excluded
/// from restock announcements.
pub const UNLIMITED_STOCK: i64 = 999;

/// `CatalogApi` applies provider catalog events to the local product mirror. The sync is strictly one-way:
/// the provider dashboard is the source of truth for titles, prices and stock; the local table only feeds
/// checkout validation and the storefront listing.
pub struct CatalogApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> CatalogApi<B>
where B: StorefrontDatabase
{
    /// Apply a product created/updated event from a provider. The snapshot is absolute; when the event
    /// carries a stock figure it replaces the local level outright, and when it carries none the local
    /// level is left alone.
    ///
    /// A restock announcement fires when a limited-stock product's level rises above a previously non-zero
    /// level, or when a new limited-stock product appears. Going from zero stock to some is deliberately
    /// silent, as is anything at or above [`UNLIMITED_STOCK`].
    pub async fn apply_product_update(&self, update: CatalogUpdate) -> Result<Product, StorefrontError> {
        let provider = update.provider;
        let upsert = self.db.upsert_catalog_product(update).await?;
        let product = upsert.product;
        debug!(
            "🗃️ Catalog sync from {provider}: {} '{}' (stock {})",
            if upsert.created { "created" } else { "updated" },
            product.title,
            product.stock
        );
        let limited = product.stock < UNLIMITED_STOCK;
        let restocked = !upsert.created && product.stock > upsert.old_stock && upsert.old_stock > 0;
        let new_limited = upsert.created && product.is_active && product.stock > 0;
        if limited && (restocked || new_limited) {
            info!("🗃️ '{}' restocked ({} -> {})", product.title, upsert.old_stock, product.stock);
            self.call_restocked_hook(&product, upsert.old_stock, upsert.created).await;
        }
        Ok(product)
    }

    /// Apply a price created/updated event. Price events can arrive before their product event; in that case
    /// the storage layer creates an inactive placeholder so the price is not lost.
    pub async fn apply_price_update(
        &self,
        provider: PaymentProvider,
        provider_product_id: &str,
        price: UsdCents,
        price_reference: Option<&str>,
    ) -> Result<Product, StorefrontError> {
        let product =
            self.db.set_price_for_provider_product(provider, provider_product_id, price, price_reference).await?;
        debug!("🗃️ Catalog sync from {provider}: price of '{}' is now {price}", product.title);
        Ok(product)
    }

    /// Handle a product deletion on the provider side. The local row is deactivated, never deleted, so
    /// historic order lines keep a product to point at.
    pub async fn deactivate_product(
        &self,
        provider: PaymentProvider,
        provider_product_id: &str,
    ) -> Result<(), StorefrontError> {
        self.db.deactivate_provider_product(provider, provider_product_id).await?;
        info!("🗃️ Catalog sync from {provider}: product {provider_product_id} deactivated");
        Ok(())
    }

    /// An absolute stock override for admin tooling.
    pub async fn set_stock(&self, product_id: &str, stock: i64) -> Result<Product, StorefrontError> {
        let product = self.db.set_stock(product_id, stock).await?;
        info!("🗃️ Stock of '{}' manually set to {}", product.title, product.stock);
        Ok(product)
    }

    async fn call_restocked_hook(&self, product: &Product, old_stock: i64, is_new: bool) {
        for emitter in &self.producers.product_restocked_producer {
            debug!("🗃️ Notifying restock hook subscribers");
            let event = ProductRestockedEvent::new(product.clone(), old_stock, is_new);
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
