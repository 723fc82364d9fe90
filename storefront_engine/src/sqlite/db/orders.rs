use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatus},
    traits::StorefrontError,
};

/// Inserts a new order row in `Pending` status. This is not atomic on its own. Embed this call inside a
/// transaction together with [`insert_order_items`] and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, StorefrontError> {
    let id = OrderId::random();
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                user_id,
                minecraft_username,
                total_amount,
                status,
                provider
            ) VALUES ($1, $2, $3, $4, 'Pending', $5)
            RETURNING *;
        "#,
    )
    .bind(id.as_str())
    .bind(order.user_id)
    .bind(order.minecraft_username)
    .bind(order.total_amount.value())
    .bind(order.provider)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn insert_order_items(
    order_id: &OrderId,
    items: &[NewOrderItem],
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    for item in items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id.as_str())
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price.value())
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ {} order items inserted for order {order_id}", items.len());
    Ok(())
}

pub async fn fetch_order_by_id(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn set_provider_reference(
    id: &OrderId,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    sqlx::query("UPDATE orders SET provider_reference = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(id.as_str())
        .bind(reference)
        .execute(conn)
        .await?;
    Ok(())
}

/// Deletes a pending order and its items. The status condition means an order that has since received a
/// payment event is left alone. Items go first; `order_items` references `orders` and foreign keys are
/// enforced.
pub async fn discard_pending_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<(), StorefrontError> {
    sqlx::query(
        "DELETE FROM order_items WHERE order_id IN (SELECT id FROM orders WHERE id = $1 AND status = 'Pending')",
    )
    .bind(id.as_str())
    .execute(&mut *conn)
    .await?;
    let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND status = 'Pending'")
        .bind(id.as_str())
        .execute(conn)
        .await?;
    if result.rows_affected() > 0 {
        debug!("📝️ Discarded pending order {id}");
    }
    Ok(())
}

pub async fn mark_order_processing(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = 'Processing', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// The conditional completion update. The `stock_decremented = 0` predicate makes this a compare-and-set:
/// only the first delivery of a successful payment event can match, and the row comes back with the flag and
/// status already flipped. Every redelivery matches zero rows.
pub async fn complete_order_once(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'Completed', stock_decremented = 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND stock_decremented = 0
            RETURNING *;
        "#,
    )
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Cancels an order that has not completed. A declined first attempt can be followed by a successful
/// retry, so a late failure event must never cancel an order that has since been delivered.
pub async fn cancel_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = 'Cancelled', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status IN ('Pending', 'Processing')
            RETURNING *;
        "#,
    )
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn set_order_status(
    id: &OrderId,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, StorefrontError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(id.as_str())
    .bind(status)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| StorefrontError::OrderNotFound(id.clone()))?;
    Ok(order)
}
