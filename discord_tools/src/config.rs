use log::*;
use mcs_common::Secret;

#[derive(Debug, Clone, Default)]
pub struct DiscordConfig {
    pub bot_token: Secret<String>,
    pub guild_id: String,
    pub owner_id: String,
    pub ticket_category_id: Option<String>,
    pub customer_role_id: Option<String>,
    pub order_webhook_url: Option<String>,
    pub restock_webhook_url: Option<String>,
}

impl DiscordConfig {
    /// Reads the Discord configuration from the environment. The bot token and guild id are required for
    /// ticket channels and role grants; the webhook URLs are optional, and the features they back are
    /// silently skipped when they are absent.
    pub fn new_from_env_or_default() -> Self {
        let bot_token = Secret::new(std::env::var("MCS_DISCORD_BOT_TOKEN").unwrap_or_else(|_| {
            warn!("MCS_DISCORD_BOT_TOKEN not set. Discord tickets and role grants will fail.");
            String::new()
        }));
        let guild_id = std::env::var("MCS_DISCORD_GUILD_ID").unwrap_or_else(|_| {
            warn!("MCS_DISCORD_GUILD_ID not set. Discord tickets and role grants will fail.");
            String::new()
        });
        let owner_id = std::env::var("MCS_DISCORD_OWNER_ID").unwrap_or_else(|_| {
            warn!("MCS_DISCORD_OWNER_ID not set. Ticket channels will only include the buyer.");
            String::new()
        });
        let ticket_category_id = std::env::var("MCS_DISCORD_TICKET_CATEGORY_ID").ok();
        let customer_role_id = std::env::var("MCS_DISCORD_CUSTOMER_ROLE_ID").ok();
        let order_webhook_url = std::env::var("MCS_DISCORD_ORDER_WEBHOOK_URL").ok();
        let restock_webhook_url = std::env::var("MCS_DISCORD_RESTOCK_WEBHOOK_URL").ok();
        Self {
            bot_token,
            guild_id,
            owner_id,
            ticket_category_id,
            customer_role_id,
            order_webhook_url,
            restock_webhook_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.bot_token.reveal().is_empty() && !self.guild_id.is_empty()
    }
}
