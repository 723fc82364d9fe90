//! Storefront Payment Engine
//!
//! The engine holds everything about the storefront's money path that is not HTTP: the order lifecycle, the
//! idempotent completion transition, the stock ledger and the catalog mirror. It is provider-agnostic; the
//! Stripe and Square payloads are normalised into [`db_types::PaymentOutcome`] values before they get here.
//!
//! The crate is divided into three main sections:
//! 1. Database management ([`mod@sqlite`]). SQLite is the supported backend. You should never need to touch the
//!    database directly; use the public APIs instead. The exception is the data types, which are defined in
//!    [`db_types`] and are public.
//! 2. The public API ([`mod@sfe_api`]): order flow (webhook reconciliation), checkout (cart validation and
//!    pending-order creation) and catalog (one-way sync from the provider's product catalog).
//! 3. Events ([`mod@events`]): when an order completes or a payment fails, an event is emitted. A small actor
//!    framework lets the server hook best-effort side effects (Discord, email) onto these events without the
//!    engine knowing about them.
pub mod db_types;
pub mod events;
pub mod sfe_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use sfe_api::{
    catalog_api::CatalogApi,
    checkout_api::{CartLine, CartRequest, CheckoutApi, CheckoutLine, PendingCheckout},
    order_flow_api::{CompletionOutcome, OrderFlowApi},
};
pub use traits::{StorefrontDatabase, StorefrontError};
