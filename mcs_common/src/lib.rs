mod helpers;
pub mod op;
mod secret;
mod usd;

pub use helpers::short_ref;
pub use secret::Secret;
pub use usd::{UsdCents, UsdConversionError, USD_CURRENCY_CODE, USD_CURRENCY_CODE_LOWER};
