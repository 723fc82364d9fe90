//! Side-effect subscribers for the engine's event hooks.
//!
//! Everything in here is best effort. The order state machine has already committed by the time these
//! handlers run, so a Discord outage or a bounced email logs an error and nothing else; no step in a
//! handler blocks any other step, and nothing here ever feeds back into the order flow.
use discord_tools::{embeds, DiscordApi, DiscordConfig};
use futures::future::BoxFuture;
use log::*;
use storefront_engine::events::{EventHandlers, EventHooks, FulfilledItem, OrderCompletedEvent};

use crate::{config::EmailConfig, integrations::email};

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}

fn item_lines(items: &[FulfilledItem]) -> String {
    items.iter().map(|i| format!("• {} x{} ({})", i.title, i.quantity, i.unit_price)).collect::<Vec<_>>().join("\n")
}

/// Wires the order-completed, payment-failed and product-restocked hooks up to Discord and email.
///
/// The handlers this creates are:
/// 1. OrderCompletedEvent. Creates a private ticket channel for the buyer (when they have a linked Discord
///    account), grants the customer role, posts a public purchase announcement to the order webhook, and
///    emails a receipt.
/// 2. PaymentFailedEvent. Posts a failure notice to the order webhook so staff see it without opening the
///    admin panel.
/// 3. ProductRestockedEvent. Posts a restock announcement to the restock webhook.
pub fn create_notification_event_handlers(
    discord_config: DiscordConfig,
    email_config: EmailConfig,
) -> EventHandlers {
    let mut hooks = EventHooks::default();
    let api = if discord_config.is_configured() {
        match DiscordApi::new(discord_config.clone()) {
            Ok(api) => Some(api),
            Err(e) => {
                error!("🎫️ Could not initialise the Discord client. Tickets and role grants are off. {e}");
                None
            },
        }
    } else {
        info!("🎫️ Discord is not configured. Tickets and role grants are off.");
        None
    };
    //------------------------------------- Order completed -------------------------------------
    let completed_api = api.clone();
    let completed_discord = discord_config.clone();
    let completed_email = email_config.clone();
    hooks.on_order_completed(move |ev| {
        let api = completed_api.clone();
        let discord_config = completed_discord.clone();
        let email_config = completed_email.clone();
        Box::pin(async move {
            handle_order_completed(ev, api, discord_config, email_config).await;
        })
    });
    //------------------------------------- Payment failed -------------------------------------
    let failed_webhook = discord_config.order_webhook_url.clone();
    hooks.on_payment_failed(move |ev| {
        let Some(url) = failed_webhook.clone() else { return no_op() };
        Box::pin(async move {
            let embed = embeds::payment_failed(&ev.order.id.short(), &ev.order.minecraft_username, &ev.reason);
            match DiscordApi::post_webhook(&url, "Store", embed).await {
                Ok(()) => debug!("📬️ Posted payment failure notice for order {}", ev.order.id),
                Err(e) => error!("📬️ Could not post the payment failure notice for order {}. {e}", ev.order.id),
            }
        })
    });
    //------------------------------------- Product restocked -------------------------------------
    let restock_webhook = discord_config.restock_webhook_url.clone();
    hooks.on_product_restocked(move |ev| {
        let Some(url) = restock_webhook.clone() else { return no_op() };
        Box::pin(async move {
            let embed = embeds::restock(&ev.product.title, ev.product.stock, ev.is_new);
            match DiscordApi::post_webhook(&url, "Store", embed).await {
                Ok(()) => debug!("📬️ Announced restock of {}", ev.product.title),
                Err(e) => error!("📬️ Could not announce the restock of {}. {e}", ev.product.title),
            }
        })
    });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}

async fn handle_order_completed(
    ev: OrderCompletedEvent,
    api: Option<DiscordApi>,
    discord_config: DiscordConfig,
    email_config: EmailConfig,
) {
    let order_ref = ev.order.id.short();
    let username = ev.order.minecraft_username.clone();
    let total = ev.order.total_amount.to_string();
    let lines = item_lines(&ev.items);
    let discord_id = ev.user.as_ref().and_then(|u| u.discord_id.clone());
    // Ticket channel and role grant need both a bot and a linked buyer account.
    match (&api, &discord_id) {
        (Some(api), Some(member_id)) => {
            match api.create_ticket_channel(&username, member_id).await {
                Ok(channel) => {
                    let embed = embeds::order_ticket(&order_ref, &username, &total, &lines);
                    let content = format!("<@{member_id}>");
                    if let Err(e) = api.post_embed(&channel.id, &content, embed).await {
                        error!("🎫️ Created ticket channel for order {order_ref} but could not post into it. {e}");
                    }
                },
                Err(e) => error!("🎫️ Could not create a ticket channel for order {order_ref}. {e}"),
            }
            if let Err(e) = api.grant_customer_role(member_id).await {
                error!("🎫️ Could not grant the customer role for order {order_ref}. {e}");
            }
        },
        (Some(_), None) => debug!("🎫️ Order {order_ref} has no linked Discord account. Skipping the ticket."),
        (None, _) => {},
    }
    if let Some(url) = &discord_config.order_webhook_url {
        let embed = embeds::purchase_announcement(&username, &lines, &total);
        match DiscordApi::post_webhook(url, "Store", embed).await {
            Ok(()) => debug!("📬️ Announced order {order_ref}"),
            Err(e) => error!("📬️ Could not announce order {order_ref}. {e}"),
        }
    }
    let email_address = ev.user.as_ref().and_then(|u| u.email.clone());
    match email_address {
        Some(address) if email_config.is_configured() => {
            match email::send_receipt(&email_config, &address, &ev).await {
                Ok(()) => debug!("📧️ Sent a receipt for order {order_ref}"),
                Err(e) => error!("📧️ Could not send the receipt for order {order_ref}. {e}"),
            }
        },
        Some(_) => debug!("📧️ Email is not configured. Skipping the receipt for order {order_ref}."),
        None => debug!("📧️ Order {order_ref} has no email on file. Skipping the receipt."),
    }
}
