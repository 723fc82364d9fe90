use serde::{Deserialize, Serialize};

/// The permission bit for VIEW_CHANNEL. Ticket channels deny it to @everyone and allow it for the buyer and
/// the store owner.
pub const VIEW_CHANNEL: u64 = 1024;

#[derive(Debug, Clone, Serialize)]
pub struct PermissionOverwrite {
    pub id: String,
    /// 0 = role, 1 = member
    #[serde(rename = "type")]
    pub kind: u8,
    pub allow: String,
    pub deny: String,
}

impl PermissionOverwrite {
    pub fn deny_everyone(guild_id: &str) -> Self {
        // @everyone shares its id with the guild
        Self { id: guild_id.to_string(), kind: 0, allow: "0".to_string(), deny: VIEW_CHANNEL.to_string() }
    }

    pub fn allow_member(member_id: &str) -> Self {
        Self { id: member_id.to_string(), kind: 1, allow: VIEW_CHANNEL.to_string(), deny: "0".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedThumbnail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn inline(name: &str, value: impl Into<String>) -> Self {
        Self { name: name.to_string(), value: value.into(), inline: true }
    }

    pub fn block(name: &str, value: impl Into<String>) -> Self {
        Self { name: name.to_string(), value: value.into(), inline: false }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedThumbnail {
    pub url: String,
}
