/// The short, human-facing form of an order id: the first 8 characters, upper-cased.
/// Used in notification titles, Discord embeds and receipt emails.
pub fn short_ref(id: &str) -> String {
    id.chars().take(8).collect::<String>().to_uppercase()
}
