use std::path::Path;

use log::*;
use mcs_common::UsdCents;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};
use storefront_engine::SqliteDatabase;

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    format!("sqlite:///tmp/storefront_test_{}.db", rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

#[allow(dead_code)]
pub async fn seed_product(db: &SqliteDatabase, id: &str, title: &str, price: UsdCents, stock: i64, active: bool) {
    sqlx::query(
        r#"
            INSERT INTO products (id, title, description, category, price, stock, is_active)
            VALUES ($1, $2, '', 'items', $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(price.value())
    .bind(stock)
    .bind(active)
    .execute(db.pool())
    .await
    .expect("Error seeding product");
}

#[allow(dead_code)]
pub async fn seed_user(db: &SqliteDatabase, id: &str, discord_id: Option<&str>, email: Option<&str>) {
    sqlx::query("INSERT INTO users (id, discord_id, discord_username, email) VALUES ($1, $2, 'tester', $3)")
        .bind(id)
        .bind(discord_id)
        .bind(email)
        .execute(db.pool())
        .await
        .expect("Error seeding user");
}

#[allow(dead_code)]
pub async fn product_stock(db: &SqliteDatabase, id: &str) -> i64 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .expect("Error fetching stock")
}

#[allow(dead_code)]
pub async fn notification_kinds(db: &SqliteDatabase) -> Vec<String> {
    sqlx::query_scalar("SELECT kind FROM admin_notifications ORDER BY id")
        .fetch_all(db.pool())
        .await
        .expect("Error fetching notifications")
}
