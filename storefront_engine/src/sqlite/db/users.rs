use sqlx::SqliteConnection;

use crate::db_types::StoreUser;

pub async fn fetch_user_by_id(id: &str, conn: &mut SqliteConnection) -> Result<Option<StoreUser>, sqlx::Error> {
    let user = sqlx::query_as("SELECT id, discord_id, discord_username, email FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}
