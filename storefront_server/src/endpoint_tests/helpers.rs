use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::helpers::to_hex;

pub const STRIPE_TEST_SECRET: &str = "whsec_endpoint_test";
pub const SQUARE_TEST_SECRET: &str = "sq_sig_endpoint_test";
pub const SQUARE_TEST_URL: &str = "https://store.example.com/webhook/square";

fn hmac_sha256(secret: &str, data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Builds a `Stripe-Signature` header that verifies against `STRIPE_TEST_SECRET`.
pub fn stripe_signature(body: &str) -> String {
    let timestamp = "1717171717";
    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(body.as_bytes());
    format!("t={timestamp},v1={}", to_hex(&hmac_sha256(STRIPE_TEST_SECRET, &signed)))
}

/// Builds an `X-Square-Signature` header that verifies against `SQUARE_TEST_SECRET`.
pub fn square_signature(body: &str) -> String {
    let mut signed = SQUARE_TEST_URL.as_bytes().to_vec();
    signed.extend_from_slice(body.as_bytes());
    base64::encode(hmac_sha256(SQUARE_TEST_SECRET, &signed))
}

pub async fn post_request(
    path: &str,
    body: String,
    headers: Vec<(&'static str, String)>,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req =
        TestRequest::post().uri(path).insert_header(("Content-Type", "application/json")).set_payload(body);
    for (name, value) in headers {
        req = req.insert_header((name, value));
    }
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub async fn delete_request(
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = TestRequest::delete().uri(path).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}
