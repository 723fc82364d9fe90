//! Webhook signature verification.
//!
//! Each provider signs its webhook deliveries differently:
//! * Stripe sends a `Stripe-Signature` header of the form `t=<timestamp>,v1=<hex hmac>`, where the HMAC is
//!   computed over `"{timestamp}.{body}"`.
//! * Square sends an `X-Square-Signature` header containing the base64 HMAC of the notification URL
//!   concatenated with the body.
//!
//! Both use HMAC-SHA256. The comparison happens against the raw request bytes, before any deserialization.
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn hmac_sha256(secret: &str, data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take a key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Checks the `x-store-api-key` header value against the configured key. An empty configured key matches
/// nothing, so an unconfigured server rejects every keyed request rather than accepting them all.
pub fn store_key_is_valid(presented: Option<&str>, expected: &str) -> bool {
    !expected.is_empty() && presented == Some(expected)
}

/// Verifies a `Stripe-Signature` header against the raw request body.
///
/// The header carries a comma-separated list of `k=v` pairs. The signed payload is the `t` value and the
/// body joined with a `.`. Stripe may include several `v1` entries during secret rotation; any match
/// passes.
pub fn stripe_signature_is_valid(header: &str, body: &[u8], secret: &str) -> bool {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for pair in header.split(',') {
        match pair.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => candidates.push(v),
            _ => {},
        }
    }
    let Some(timestamp) = timestamp else {
        warn!("🔐️ Stripe signature header has no timestamp");
        return false;
    };
    if candidates.is_empty() {
        warn!("🔐️ Stripe signature header has no v1 signature");
        return false;
    }
    let mut signed_payload = Vec::with_capacity(timestamp.len() + 1 + body.len());
    signed_payload.extend_from_slice(timestamp.as_bytes());
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(body);
    let expected = to_hex(&hmac_sha256(secret, &signed_payload));
    candidates.iter().any(|v1| *v1 == expected)
}

/// Verifies an `X-Square-Signature` header. Square signs the exact notification URL concatenated with the
/// body, so `notification_url` must match the webhook subscription's URL character for character.
pub fn square_signature_is_valid(header: &str, body: &[u8], secret: &str, notification_url: &str) -> bool {
    let mut signed_payload = Vec::with_capacity(notification_url.len() + body.len());
    signed_payload.extend_from_slice(notification_url.as_bytes());
    signed_payload.extend_from_slice(body);
    let expected = base64::encode(hmac_sha256(secret, &signed_payload));
    header == expected
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &[u8] = br#"{"type":"checkout.session.completed"}"#;

    fn stripe_header(timestamp: &str, body: &[u8], secret: &str) -> String {
        let mut payload = Vec::new();
        payload.extend_from_slice(timestamp.as_bytes());
        payload.push(b'.');
        payload.extend_from_slice(body);
        format!("t={timestamp},v1={}", to_hex(&hmac_sha256(secret, &payload)))
    }

    #[test]
    fn valid_stripe_signature_passes() {
        let header = stripe_header("1492774577", BODY, SECRET);
        assert!(stripe_signature_is_valid(&header, BODY, SECRET));
    }

    #[test]
    fn stripe_signature_with_wrong_secret_fails() {
        let header = stripe_header("1492774577", BODY, "whsec_other");
        assert!(!stripe_signature_is_valid(&header, BODY, SECRET));
    }

    #[test]
    fn tampered_stripe_body_fails() {
        let header = stripe_header("1492774577", BODY, SECRET);
        assert!(!stripe_signature_is_valid(&header, br#"{"type":"evil"}"#, SECRET));
    }

    #[test]
    fn stripe_rotation_headers_pass_on_any_v1() {
        let good = stripe_header("1492774577", BODY, SECRET);
        let v1 = good.split_once("v1=").unwrap().1.to_string();
        let header = format!("t=1492774577,v1={},v1={v1}", "0".repeat(64));
        assert!(stripe_signature_is_valid(&header, BODY, SECRET));
    }

    #[test]
    fn malformed_stripe_headers_fail() {
        assert!(!stripe_signature_is_valid("", BODY, SECRET));
        assert!(!stripe_signature_is_valid("t=123", BODY, SECRET));
        assert!(!stripe_signature_is_valid("v1=abcd", BODY, SECRET));
    }

    const URL: &str = "https://store.example.com/webhook/square";

    #[test]
    fn valid_square_signature_passes() {
        let mut payload = URL.as_bytes().to_vec();
        payload.extend_from_slice(BODY);
        let header = base64::encode(hmac_sha256(SECRET, &payload));
        assert!(square_signature_is_valid(&header, BODY, SECRET, URL));
    }

    #[test]
    fn square_signature_for_a_different_url_fails() {
        let mut payload = b"https://evil.example.com/webhook/square".to_vec();
        payload.extend_from_slice(BODY);
        let header = base64::encode(hmac_sha256(SECRET, &payload));
        assert!(!square_signature_is_valid(&header, BODY, SECRET, URL));
    }

    #[test]
    fn empty_store_keys_match_nothing() {
        assert!(!store_key_is_valid(None, ""));
        assert!(!store_key_is_valid(Some(""), ""));
        assert!(!store_key_is_valid(Some("key"), ""));
        assert!(!store_key_is_valid(None, "key"));
        assert!(!store_key_is_valid(Some("other"), "key"));
        assert!(store_key_is_valid(Some("key"), "key"));
    }

    #[test]
    fn tampered_square_body_fails() {
        let mut payload = URL.as_bytes().to_vec();
        payload.extend_from_slice(BODY);
        let header = base64::encode(hmac_sha256(SECRET, &payload));
        assert!(!square_signature_is_valid(&header, br#"{"type":"evil"}"#, SECRET, URL));
    }
}
