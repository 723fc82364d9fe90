//! Order receipt emails, sent through Resend's REST API.
use log::*;
use serde_json::json;
use storefront_engine::events::OrderCompletedEvent;
use thiserror::Error;

use crate::config::EmailConfig;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Could not reach the email API. {0}")]
    ResponseError(String),
    #[error("The email API returned {status}: {message}")]
    QueryError { status: u16, message: String },
}

/// Sends an order receipt to `to_address`. Callers are expected to have checked
/// [`EmailConfig::is_configured`] and that the buyer actually has an email address on file.
pub async fn send_receipt(config: &EmailConfig, to_address: &str, event: &OrderCompletedEvent) -> Result<(), EmailError> {
    let subject = format!("Your order {} receipt", event.order.id.short());
    let body = json!({
        "from": config.from_address,
        "to": [to_address],
        "subject": subject,
        "html": receipt_html(event),
    });
    let response = reqwest::Client::new()
        .post(RESEND_API_URL)
        .bearer_auth(config.api_key.reveal())
        .json(&body)
        .send()
        .await
        .map_err(|e| EmailError::ResponseError(e.to_string()))?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.map_err(|e| EmailError::ResponseError(e.to_string()))?;
        return Err(EmailError::QueryError { status, message });
    }
    debug!("📧️ Receipt for order {} sent to {to_address}", event.order.id);
    Ok(())
}

fn receipt_html(event: &OrderCompletedEvent) -> String {
    let rows = event
        .items
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{}</td><td style=\"text-align:center\">{}</td><td style=\"text-align:right\">{}</td></tr>",
                html_escape(&item.title),
                item.quantity,
                item.unit_price
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "<h2>Thanks for your purchase, {username}!</h2>\
         <p>Order <strong>{order_ref}</strong> has been paid and your items are on the way.</p>\
         <table width=\"100%\" cellpadding=\"6\" style=\"border-collapse:collapse\">\
         <tr><th align=\"left\">Item</th><th>Qty</th><th align=\"right\">Price</th></tr>\
         {rows}\
         <tr><td colspan=\"2\" align=\"right\"><strong>Total</strong></td>\
         <td align=\"right\"><strong>{total}</strong></td></tr>\
         </table>\
         <p>See you on the server!</p>",
        username = html_escape(&event.order.minecraft_username),
        order_ref = event.order.id.short(),
        total = event.order.total_amount,
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
