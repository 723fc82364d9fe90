use sqlx::SqliteConnection;

use crate::{
    db_types::{AdminNotification, NewAdminNotification},
    traits::StorefrontError,
};

pub async fn insert_notification(
    notification: NewAdminNotification,
    conn: &mut SqliteConnection,
) -> Result<AdminNotification, StorefrontError> {
    let notification = sqlx::query_as(
        r#"
            INSERT INTO admin_notifications (kind, title, message, reference_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(notification.kind)
    .bind(notification.title)
    .bind(notification.message)
    .bind(notification.reference_id)
    .fetch_one(conn)
    .await?;
    Ok(notification)
}

pub async fn mark_read(id: i64, conn: &mut SqliteConnection) -> Result<(), StorefrontError> {
    sqlx::query("UPDATE admin_notifications SET is_read = 1 WHERE id = $1").bind(id).execute(conn).await?;
    Ok(())
}

pub async fn delete_notification(id: i64, conn: &mut SqliteConnection) -> Result<(), StorefrontError> {
    sqlx::query("DELETE FROM admin_notifications WHERE id = $1").bind(id).execute(conn).await?;
    Ok(())
}
