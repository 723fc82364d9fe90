//! A thin client for the handful of Discord operations the storefront performs: opening a ticket channel
//! for a completed order, granting the customer role, and posting webhook announcements.
//!
//! Everything here is best-effort from the storefront's point of view. A Discord outage must never affect
//! order processing, so callers log failures and move on.
mod api;
mod config;
mod data_objects;
pub mod embeds;
mod error;

pub use api::{sanitize_channel_name, DiscordApi};
pub use config::DiscordConfig;
pub use data_objects::{Channel, Embed, EmbedField, EmbedFooter, EmbedThumbnail, PermissionOverwrite};
pub use error::DiscordApiError;
