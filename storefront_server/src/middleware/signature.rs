//! Webhook signature middleware for Actix Web.
//!
//! This module provides a middleware that checks the provider's signature on incoming webhook requests.
//!
//! Stripe and Square sign every delivery with a shared secret; the signature covers the raw request body
//! (and, for Square, the notification URL). The middleware consumes the body to verify the signature and
//! then re-injects it, so the downstream handler deserialises exactly the bytes that were verified.
//!
//! Requests with a missing or invalid signature are rejected with a 400 before any handler runs.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorBadRequest,
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use mcs_common::Secret;

use crate::helpers::{square_signature_is_valid, stripe_signature_is_valid};

/// Which provider's signing convention to enforce on a webhook route.
#[derive(Clone)]
pub enum SignatureScheme {
    /// `Stripe-Signature: t=<ts>,v1=<hex hmac of "ts.body">`
    Stripe { secret: Secret<String> },
    /// `X-Square-Signature: <base64 hmac of url + body>`
    Square { secret: Secret<String>, notification_url: String },
}

impl SignatureScheme {
    fn header_name(&self) -> &'static str {
        match self {
            SignatureScheme::Stripe { .. } => "Stripe-Signature",
            SignatureScheme::Square { .. } => "X-Square-Signature",
        }
    }

    fn verify(&self, header: &str, body: &[u8]) -> bool {
        match self {
            SignatureScheme::Stripe { secret } => stripe_signature_is_valid(header, body, secret.reveal()),
            SignatureScheme::Square { secret, notification_url } => {
                square_signature_is_valid(header, body, secret.reveal(), notification_url)
            },
        }
    }
}

pub struct SignatureMiddlewareFactory {
    scheme: SignatureScheme,
}

impl SignatureMiddlewareFactory {
    pub fn new(scheme: SignatureScheme) -> Self {
        Self { scheme }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService { scheme: self.scheme.clone(), service: Rc::new(service) }))
    }
}

pub struct SignatureMiddlewareService<S> {
    scheme: SignatureScheme,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let scheme = self.scheme.clone();
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature for request");
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ErrorBadRequest("Failed to extract request data.")
            })?;
            let header_name = scheme.header_name();
            let header = req
                .headers()
                .get(header_name)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    warn!("🔐️ No {header_name} header found in request. Denying access.");
                    ErrorBadRequest("Missing signature header.")
                })?
                .to_string();
            if scheme.verify(&header, data.as_ref()) {
                trace!("🔐️ Webhook signature check ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid webhook signature. Denying access.");
                Err(ErrorBadRequest("Invalid signature."))
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
