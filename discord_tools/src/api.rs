use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde_json::{json, Value};

use crate::{
    data_objects::{Channel, Embed, PermissionOverwrite},
    DiscordApiError,
    DiscordConfig,
};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Lowercases and squashes a username into something Discord accepts as a channel name. Anything outside
/// `[a-z0-9]` becomes a hyphen.
pub fn sanitize_channel_name(username: &str) -> String {
    username.to_lowercase().chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '-' }).collect()
}

#[derive(Clone)]
pub struct DiscordApi {
    config: DiscordConfig,
    client: Arc<Client>,
}

impl DiscordApi {
    pub fn new(config: DiscordConfig) -> Result<Self, DiscordApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bot {}", config.bot_token.reveal()))
            .map_err(|e| DiscordApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| DiscordApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &DiscordConfig {
        &self.config
    }

    /// Creates a private `ticket-<username>` channel, visible only to the buyer and the store owner.
    pub async fn create_ticket_channel(
        &self,
        minecraft_username: &str,
        buyer_discord_id: &str,
    ) -> Result<Channel, DiscordApiError> {
        if !self.config.is_configured() {
            return Err(DiscordApiError::NotConfigured("bot token or guild id missing"));
        }
        let name = format!("ticket-{}", sanitize_channel_name(minecraft_username));
        let mut overwrites = vec![
            PermissionOverwrite::deny_everyone(&self.config.guild_id),
            PermissionOverwrite::allow_member(buyer_discord_id),
        ];
        if !self.config.owner_id.is_empty() {
            overwrites.push(PermissionOverwrite::allow_member(&self.config.owner_id));
        }
        let mut body = json!({
            "name": name,
            "type": 0,
            "permission_overwrites": overwrites,
        });
        if let Some(category) = &self.config.ticket_category_id {
            body["parent_id"] = json!(category);
        }
        let path = format!("/guilds/{}/channels", self.config.guild_id);
        let channel: Channel = self.post(&path, body).await?;
        info!("🎫️ Created ticket channel #{} ({})", channel.name, channel.id);
        Ok(channel)
    }

    pub async fn post_embed(&self, channel_id: &str, content: &str, embed: Embed) -> Result<(), DiscordApiError> {
        let body = json!({ "content": content, "embeds": [embed] });
        let path = format!("/channels/{channel_id}/messages");
        let _: Value = self.post(&path, body).await?;
        Ok(())
    }

    /// Grants the configured customer role to a guild member. A no-op when no role is configured.
    pub async fn grant_customer_role(&self, member_id: &str) -> Result<(), DiscordApiError> {
        let Some(role_id) = &self.config.customer_role_id else {
            debug!("🎫️ No customer role configured. Skipping role grant.");
            return Ok(());
        };
        let path = format!("/guilds/{}/members/{member_id}/roles/{role_id}", self.config.guild_id);
        let response = self
            .client
            .put(format!("{DISCORD_API_BASE}{path}"))
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(|e| DiscordApiError::ResponseError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| DiscordApiError::ResponseError(e.to_string()))?;
            return Err(DiscordApiError::QueryError { status, message });
        }
        info!("🎫️ Granted customer role to member {member_id}");
        Ok(())
    }

    /// Posts an embed to a plain Discord webhook URL. Webhooks need no bot token, so this uses a bare
    /// client.
    pub async fn post_webhook(webhook_url: &str, username: &str, embed: Embed) -> Result<(), DiscordApiError> {
        let body = json!({ "username": username, "embeds": [embed] });
        let response = Client::new()
            .post(webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DiscordApiError::ResponseError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| DiscordApiError::ResponseError(e.to_string()))?;
            return Err(DiscordApiError::QueryError { status, message });
        }
        Ok(())
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, DiscordApiError> {
        let response = self
            .client
            .post(format!("{DISCORD_API_BASE}{path}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| DiscordApiError::ResponseError(e.to_string()))?;
        if response.status().is_success() {
            response.json::<T>().await.map_err(|e| DiscordApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| DiscordApiError::ResponseError(e.to_string()))?;
            Err(DiscordApiError::QueryError { status, message })
        }
    }
}
