//! Thin REST clients for the payment provider APIs.
//!
//! Only the handful of endpoints the storefront actually calls are wrapped here: checkout session / payment
//! link creation, and the Square catalog pull used by catalog sync. Webhook payload *parsing* does not live
//! here; the server deserialises those itself.
mod error;
mod square;
mod stripe;

pub use error::ProviderApiError;
pub use square::{SquareApi, SquareCatalogItem, SquareConfig, SquarePaymentLink};
pub use stripe::{CheckoutSession, SessionLineItem, StripeApi, StripeConfig};
