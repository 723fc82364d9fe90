use mcs_common::UsdCents;
use mockall::mock;
use storefront_engine::{
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
    StorefrontDatabase,
    StorefrontError,
};

mock! {
    pub StorefrontDb {}

    impl Clone for StorefrontDb {
        fn clone(&self) -> Self;
    }

    impl StorefrontDatabase for StorefrontDb {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder, items: &[NewOrderItem]) -> Result<Order, StorefrontError>;
        async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError>;
        async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, StorefrontError>;
        async fn set_provider_reference(&self, id: &OrderId, reference: &str) -> Result<(), StorefrontError>;
        async fn discard_pending_order(&self, id: &OrderId) -> Result<(), StorefrontError>;
        async fn mark_order_processing(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError>;
        async fn complete_order_once(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError>;
        async fn cancel_order(&self, id: &OrderId) -> Result<Option<Order>, StorefrontError>;
        async fn set_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order, StorefrontError>;
        async fn fetch_product(&self, id: &str) -> Result<Option<Product>, StorefrontError>;
        async fn decrement_stock(&self, product_id: &str, quantity: i64) -> Result<i64, StorefrontError>;
        async fn set_stock(&self, product_id: &str, stock: i64) -> Result<Product, StorefrontError>;
        async fn upsert_catalog_product(&self, update: CatalogUpdate) -> Result<CatalogUpsert, StorefrontError>;
        async fn set_price_for_provider_product<'a>(
            &self,
            provider: PaymentProvider,
            provider_product_id: &str,
            price: UsdCents,
            price_reference: Option<&'a str>,
        ) -> Result<Product, StorefrontError>;
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
        async fn close(&mut self) -> Result<(), StorefrontError>;
    }
}

/// A completed-looking order fixture for webhook tests.
pub fn order_fixture(id: &str, status: OrderStatus) -> Order {
    Order {
        id: OrderId(id.to_string()),
        user_id: None,
        minecraft_username: "Steve".to_string(),
        total_amount: UsdCents::from(1599),
        status,
        stock_decremented: matches!(status, OrderStatus::Completed),
        provider: PaymentProvider::Stripe,
        provider_reference: Some("cs_test_123".to_string()),
        created_at: Default::default(),
        updated_at: Default::default(),
    }
}

pub fn notification_fixture() -> AdminNotification {
    AdminNotification {
        id: 1,
        kind: "new_order".to_string(),
        title: "New Order Received".to_string(),
        message: "Order from Steve".to_string(),
        reference_id: None,
        is_read: false,
        created_at: Default::default(),
    }
}
