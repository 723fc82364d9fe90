mod storefront_database;

pub use storefront_database::{StorefrontDatabase, StorefrontError};
