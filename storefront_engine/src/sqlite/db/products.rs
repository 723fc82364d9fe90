use log::debug;
use mcs_common::UsdCents;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db_types::{CatalogUpdate, CatalogUpsert, PaymentProvider, Product},
    traits::StorefrontError,
};

pub async fn fetch_product_by_id(id: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_product_by_provider_id(
    provider: PaymentProvider,
    provider_product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let column = provider_product_column(provider);
    let q = format!("SELECT * FROM products WHERE {column} = $1");
    let product = sqlx::query_as(&q).bind(provider_product_id).fetch_optional(conn).await?;
    Ok(product)
}

fn provider_product_column(provider: PaymentProvider) -> &'static str {
    match provider {
        PaymentProvider::Stripe => "stripe_product_id",
        PaymentProvider::Square => "square_item_id",
    }
}

/// Decrements stock in a single UPDATE so that concurrent decrements serialise at the database rather than
/// racing through a read-modify-write. Clamped at zero. Returns the stock remaining after the decrement.
pub async fn decrement_stock(
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<i64, StorefrontError> {
    let stock: Option<i64> = sqlx::query_scalar(
        r#"
            UPDATE products
            SET stock = MAX(stock - $2, 0), updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING stock;
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(conn)
    .await?;
    stock.ok_or_else(|| StorefrontError::ProductNotFound(product_id.to_string()))
}

pub async fn set_stock(product_id: &str, stock: i64, conn: &mut SqliteConnection) -> Result<Product, StorefrontError> {
    let product = sqlx::query_as(
        r#"
            UPDATE products SET stock = MAX($2, 0), updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(product_id)
    .bind(stock)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| StorefrontError::ProductNotFound(product_id.to_string()))?;
    Ok(product)
}

/// Applies an absolute catalog snapshot. When the product is already mirrored (matched on the provider's
/// product id), everything except the price is overwritten in place. Otherwise a new row is created with a
/// zero price; the provider's price event fills that in.
pub async fn upsert_catalog_product(
    update: CatalogUpdate,
    conn: &mut SqliteConnection,
) -> Result<CatalogUpsert, StorefrontError> {
    let existing = fetch_product_by_provider_id(update.provider, &update.provider_product_id, &mut *conn).await?;
    match existing {
        Some(current) => {
            let column = provider_product_column(update.provider);
            let q = format!(
                r#"
                    UPDATE products
                    SET title = $2, description = $3, category = $4, image_url = $5, is_active = $6,
                        stock = MAX(COALESCE($7, stock), 0), sort_order = $8, updated_at = CURRENT_TIMESTAMP
                    WHERE {column} = $1
                    RETURNING *;
                "#
            );
            let product: Product = sqlx::query_as(&q)
                .bind(&update.provider_product_id)
                .bind(update.title)
                .bind(update.description)
                .bind(update.category)
                .bind(update.image_url)
                .bind(update.is_active)
                .bind(update.stock)
                .bind(update.sort_order)
                .fetch_one(conn)
                .await?;
            Ok(CatalogUpsert { product, created: false, old_stock: current.stock })
        },
        None => {
            let product = insert_catalog_product(update, conn).await?;
            debug!("📝️ Product '{}' mirrored from provider catalog", product.title);
            Ok(CatalogUpsert { old_stock: product.stock, product, created: true })
        },
    }
}

async fn insert_catalog_product(
    update: CatalogUpdate,
    conn: &mut SqliteConnection,
) -> Result<Product, StorefrontError> {
    let id = Uuid::new_v4().to_string();
    let (stripe_id, square_id) = match update.provider {
        PaymentProvider::Stripe => (Some(update.provider_product_id), None),
        PaymentProvider::Square => (None, Some(update.provider_product_id)),
    };
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (
                id, title, description, category, price, stock, is_active, image_url, sort_order,
                stripe_product_id, square_item_id, square_variation_id
            ) VALUES ($1, $2, $3, $4, 0, MAX(COALESCE($5, 999), 0), $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(update.title)
    .bind(update.description)
    .bind(update.category)
    .bind(update.stock)
    .bind(update.is_active)
    .bind(update.image_url)
    .bind(update.sort_order)
    .bind(stripe_id)
    .bind(square_id.clone())
    .bind(update.provider_variation_id)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

/// Records a provider price against its product. If the product event has not arrived yet, an inactive
/// placeholder row is created to hold the price.
pub async fn set_price_for_provider_product(
    provider: PaymentProvider,
    provider_product_id: &str,
    price: UsdCents,
    price_reference: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Product, StorefrontError> {
    let existing = fetch_product_by_provider_id(provider, provider_product_id, &mut *conn).await?;
    let column = provider_product_column(provider);
    match existing {
        Some(_) => {
            let q = format!(
                r#"
                    UPDATE products
                    SET price = $2, stripe_price_id = COALESCE($3, stripe_price_id), updated_at = CURRENT_TIMESTAMP
                    WHERE {column} = $1
                    RETURNING *;
                "#
            );
            let product = sqlx::query_as(&q)
                .bind(provider_product_id)
                .bind(price.value())
                .bind(price_reference)
                .fetch_one(conn)
                .await?;
            Ok(product)
        },
        None => {
            debug!("📝️ Price event arrived before product event for {provider} {provider_product_id}. Creating placeholder.");
            let placeholder = CatalogUpdate {
                provider,
                provider_product_id: provider_product_id.to_string(),
                provider_variation_id: None,
                title: "Pending Product".to_string(),
                description: String::new(),
                category: "items".to_string(),
                image_url: None,
                is_active: false,
                stock: Some(0),
                sort_order: 0,
            };
            insert_catalog_product(placeholder, &mut *conn).await?;
            let q = format!(
                r#"
                    UPDATE products
                    SET price = $2, stripe_price_id = COALESCE($3, stripe_price_id), updated_at = CURRENT_TIMESTAMP
                    WHERE {column} = $1
                    RETURNING *;
                "#
            );
            let product = sqlx::query_as(&q)
                .bind(provider_product_id)
                .bind(price.value())
                .bind(price_reference)
                .fetch_one(conn)
                .await?;
            Ok(product)
        },
    }
}

pub async fn deactivate_provider_product(
    provider: PaymentProvider,
    provider_product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    let column = provider_product_column(provider);
    let q = format!("UPDATE products SET is_active = 0, updated_at = CURRENT_TIMESTAMP WHERE {column} = $1");
    sqlx::query(&q).bind(provider_product_id).execute(conn).await?;
    Ok(())
}
