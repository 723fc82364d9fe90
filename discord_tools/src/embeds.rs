//! Canned embeds for the storefront's Discord messages. The builders take plain strings so this crate does
//! not need to know about the storefront's domain types.
use crate::data_objects::{Embed, EmbedField, EmbedFooter};

const GREEN: u32 = 0x57F287;
const RED: u32 = 0xED4245;
const BLURPLE: u32 = 0x5865F2;

/// The embed posted into a freshly created ticket channel.
pub fn order_ticket(order_ref: &str, minecraft_username: &str, total: &str, item_lines: &str) -> Embed {
    Embed {
        title: Some(format!("🧾 Order {order_ref}")),
        description: Some("Thanks for your purchase! A staff member will deliver your items shortly.".to_string()),
        color: Some(GREEN),
        fields: vec![
            EmbedField::inline("Minecraft Username", minecraft_username),
            EmbedField::inline("Total", total),
            EmbedField::block("Items", item_lines),
        ],
        footer: Some(EmbedFooter { text: "Use this channel if anything is missing".to_string() }),
        ..Default::default()
    }
}

/// The public purchase announcement posted to the order webhook.
pub fn purchase_announcement(minecraft_username: &str, item_lines: &str, total: &str) -> Embed {
    Embed {
        title: Some("🛒 New Purchase!".to_string()),
        description: Some(format!("**{minecraft_username}** just bought:\n{item_lines}")),
        color: Some(BLURPLE),
        fields: vec![EmbedField::inline("Total", total)],
        ..Default::default()
    }
}

/// The restock announcement posted to the restock webhook.
pub fn restock(product_title: &str, stock: i64, is_new: bool) -> Embed {
    let title = if is_new { "✨ New Item in the Store!" } else { "📦 Back in Stock!" };
    Embed {
        title: Some(title.to_string()),
        description: Some(format!("**{product_title}** is available now. Only {stock} left!")),
        color: Some(GREEN),
        ..Default::default()
    }
}

/// Posted to the order webhook when a payment fails, so staff see it without opening the admin panel.
pub fn payment_failed(order_ref: &str, minecraft_username: &str, reason: &str) -> Embed {
    Embed {
        title: Some(format!("⚠️ Payment Failed for Order {order_ref}")),
        description: Some(format!("Buyer **{minecraft_username}**. Reason: {reason}")),
        color: Some(RED),
        ..Default::default()
    }
}
