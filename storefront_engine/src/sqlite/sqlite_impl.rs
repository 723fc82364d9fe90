//! `SqliteDatabase` is a concrete implementation of a storefront engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`crate::traits::StorefrontDatabase`]
//! trait.
use std::fmt::Debug;

use log::*;
use mcs_common::UsdCents;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, notifications, orders, products, users};
use crate::{
    db_types::{
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
    },
    traits::{StorefrontDatabase, StorefrontError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database api object using the DB URL from the `MCS_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, StorefrontError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StorefrontError> {
        let pool = new_pool(url, max_connections).await?;
        debug!("🗃️ Connected to database {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// The order row and all of its item rows are inserted in one transaction, so a crash mid-checkout never
    /// leaves a priced order without its lines.
    async fn insert_order(&self, order: NewOrder, items: &[NewOrderItem]) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        orders::insert_order_items(&order.id, items, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB", order.id);
        Ok(order)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(id, &mut conn).await?;
        Ok(items)
    }

    async fn set_provider_reference(&self, id: &OrderId, reference: &str) -> Result<(), StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_provider_reference(id, reference, &mut conn).await
    }

    async fn discard_pending_order(&self, id: &OrderId) -> Result<(), StorefrontError> {
        let mut tx = self.pool.begin().await?;
        orders::discard_pending_order(id, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn mark_order_processing(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::mark_order_processing(id, &mut conn).await?;
        Ok(order)
    }

    async fn complete_order_once(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::complete_order_once(id, &mut conn).await?;
        if order.is_some() {
            debug!("🗃️ Order {id} passed the completion guard");
        }
        Ok(order)
    }

    async fn cancel_order(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::cancel_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn set_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_order_status(id, status, &mut conn).await
    }

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product_by_id(id, &mut conn).await?;
        Ok(product)
    }

    async fn decrement_stock(&self, product_id: &str, quantity: i64) -> Result<i64, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        products::decrement_stock(product_id, quantity, &mut conn).await
    }

    async fn set_stock(&self, product_id: &str, stock: i64) -> Result<Product, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        products::set_stock(product_id, stock, &mut conn).await
    }

    async fn upsert_catalog_product(&self, update: CatalogUpdate) -> Result<CatalogUpsert, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let upsert = products::upsert_catalog_product(update, &mut tx).await?;
        tx.commit().await?;
        Ok(upsert)
    }

    async fn set_price_for_provider_product(
        &self,
        provider: PaymentProvider,
        provider_product_id: &str,
        price: UsdCents,
        price_reference: Option<&str>,
    ) -> Result<Product, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let product =
            products::set_price_for_provider_product(provider, provider_product_id, price, price_reference, &mut tx)
                .await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn deactivate_provider_product(
        &self,
        provider: PaymentProvider,
        provider_product_id: &str,
    ) -> Result<(), StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        products::deactivate_provider_product(provider, provider_product_id, &mut conn).await
    }

    async fn insert_admin_notification(
        &self,
        notification: NewAdminNotification,
    ) -> Result<AdminNotification, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        notifications::insert_notification(notification, &mut conn).await
    }

    async fn mark_notification_read(&self, id: i64) -> Result<(), StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        notifications::mark_read(id, &mut conn).await
    }

    async fn delete_notification(&self, id: i64) -> Result<(), StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        notifications::delete_notification(id, &mut conn).await
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<StoreUser>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user_by_id(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn close(&mut self) -> Result<(), StorefrontError> {
        self.pool.close().await;
        Ok(())
    }
}
