use std::env;

use discord_tools::DiscordConfig;
use log::*;
use mcs_common::{Secret, UsdCents};
use provider_tools::{SquareConfig as SquareApiConfig, StripeConfig as StripeApiConfig};

const DEFAULT_MCS_HOST: &str = "127.0.0.1";
const DEFAULT_MCS_PORT: u16 = 8360;
const DEFAULT_MINIMUM_ORDER_CENTS: i64 = 200;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared key required on checkout and admin API calls, in the `x-store-api-key` header.
    pub store_api_key: Secret<String>,
    /// The smallest order total the store accepts. Card fees make anything below this a loss.
    pub minimum_order: UsdCents,
    pub stripe: StripeServerConfig,
    pub square: SquareServerConfig,
    pub discord_config: DiscordConfig,
    pub email_config: EmailConfig,
}

#[derive(Clone, Debug, Default)]
pub struct StripeServerConfig {
    /// The signing secret for the Stripe webhook endpoint (whsec_...). Used to verify the
    /// `Stripe-Signature` header.
    pub webhook_secret: Secret<String>,
    pub api: StripeApiConfig,
}

#[derive(Clone, Debug, Default)]
pub struct SquareServerConfig {
    /// The signature key of the Square webhook subscription. Used to verify the `X-Square-Signature`
    /// header.
    pub signature_key: Secret<String>,
    /// The exact URL Square delivers webhooks to. Square signs `url + body`, so this must match the
    /// subscription's notification URL character for character.
    pub notification_url: String,
    pub api: SquareApiConfig,
}

/// Configuration for the transactional email (receipt) integration. When the API key is unset, receipts are
/// skipped.
#[derive(Clone, Debug, Default)]
pub struct EmailConfig {
    pub api_key: Secret<String>,
    pub from_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MCS_HOST.to_string(),
            port: DEFAULT_MCS_PORT,
            database_url: String::default(),
            store_api_key: Secret::default(),
            minimum_order: UsdCents::from(DEFAULT_MINIMUM_ORDER_CENTS),
            stripe: StripeServerConfig::default(),
            square: SquareServerConfig::default(),
            discord_config: DiscordConfig::default(),
            email_config: EmailConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MCS_HOST").ok().unwrap_or_else(|| DEFAULT_MCS_HOST.into());
        let port = env::var("MCS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MCS_PORT. {e} Using the default, {DEFAULT_MCS_PORT}, instead."
                    );
                    DEFAULT_MCS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MCS_PORT);
        let database_url = env::var("MCS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MCS_DATABASE_URL is not set. Please set it to the URL for the storefront database.");
            String::default()
        });
        let store_api_key = Secret::new(env::var("MCS_STORE_API_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ MCS_STORE_API_KEY is not set. Checkout and admin endpoints will reject all requests.");
            String::default()
        }));
        let minimum_order = env::var("MCS_MINIMUM_ORDER_CENTS")
            .map_err(|_| {
                info!(
                    "🪛️ MCS_MINIMUM_ORDER_CENTS is not set. Using the default of {DEFAULT_MINIMUM_ORDER_CENTS} cents."
                )
            })
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for MCS_MINIMUM_ORDER_CENTS. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_MINIMUM_ORDER_CENTS);
        let stripe = StripeServerConfig::from_env_or_default();
        let square = SquareServerConfig::from_env_or_default();
        let discord_config = DiscordConfig::new_from_env_or_default();
        let email_config = EmailConfig::from_env_or_default();
        Self {
            host,
            port,
            database_url,
            store_api_key,
            minimum_order: UsdCents::from(minimum_order),
            stripe,
            square,
            discord_config,
            email_config,
        }
    }
}

impl StripeServerConfig {
    pub fn from_env_or_default() -> Self {
        let webhook_secret = Secret::new(env::var("MCS_STRIPE_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ MCS_STRIPE_WEBHOOK_SECRET is not set. Stripe webhook signatures cannot be verified and all \
                 Stripe webhooks will be rejected."
            );
            String::default()
        }));
        Self { webhook_secret, api: StripeApiConfig::new_from_env_or_default() }
    }
}

impl SquareServerConfig {
    pub fn from_env_or_default() -> Self {
        let signature_key = Secret::new(env::var("MCS_SQUARE_SIGNATURE_KEY").ok().unwrap_or_else(|| {
            error!(
                "🪛️ MCS_SQUARE_SIGNATURE_KEY is not set. Square webhook signatures cannot be verified and all \
                 Square webhooks will be rejected."
            );
            String::default()
        }));
        let notification_url = env::var("MCS_SQUARE_NOTIFICATION_URL").ok().unwrap_or_else(|| {
            error!(
                "🪛️ MCS_SQUARE_NOTIFICATION_URL is not set. Square signs the notification URL together with the \
                 body, so signature checks will fail without it."
            );
            String::default()
        });
        Self { signature_key, notification_url, api: SquareApiConfig::new_from_env_or_default() }
    }
}

impl EmailConfig {
    pub fn from_env_or_default() -> Self {
        let api_key = Secret::new(env::var("MCS_RESEND_API_KEY").ok().unwrap_or_else(|| {
            info!("🪛️ MCS_RESEND_API_KEY is not set. Email receipts will be skipped.");
            String::default()
        }));
        let from_address = env::var("MCS_EMAIL_FROM").ok().unwrap_or_else(|| {
            info!("🪛️ MCS_EMAIL_FROM is not set. Using a placeholder sender.");
            "store@example.com".to_string()
        });
        Self { api_key, from_address }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.reveal().is_empty()
    }
}
