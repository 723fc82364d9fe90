//! # Storefront server
//! This module hosts the HTTP layer of the storefront payment gateway. It is responsible for:
//! * Listening for incoming webhook requests from Stripe and Square, verifying their signatures, and feeding
//!   the normalised payment outcomes into the engine.
//! * The checkout endpoints, which validate carts and hand pending orders to the providers for session
//!   creation.
//! * Dispatching best-effort side effects (Discord tickets and announcements, email receipts) when the
//!   engine reports a completed order.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/stripe` and `/webhook/square`: The provider webhook routes, guarded by signature checks.
//! * `/api/checkout/stripe` and `/api/checkout/square`: Cart submission, guarded by the store API key.
//! * `/api/notifications/...`: Admin notification management, guarded by the store API key.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
