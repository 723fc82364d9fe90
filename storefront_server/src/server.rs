use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use log::*;
use provider_tools::{SquareApi, StripeApi};
use storefront_engine::{events::EventProducers, CatalogApi, CheckoutApi, OrderFlowApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::side_effects::create_notification_event_handlers,
    middleware::{SignatureMiddlewareFactory, SignatureScheme},
    routes::{
        health,
        DeleteNotificationRoute,
        MarkNotificationReadRoute,
        SetProductStockRoute,
        SquareCheckoutRoute,
        SquareWebhookRoute,
        StripeCheckoutRoute,
        StripeWebhookRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_event_handlers(config.discord_config.clone(), config.email_config.clone());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let stripe_api =
        StripeApi::new(config.stripe.api.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let square_api =
        SquareApi::new(config.square.api.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let checkout_api = CheckoutApi::new(db.clone(), config.minimum_order);
        let catalog_api = CatalogApi::new(db.clone(), producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mcs::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(stripe_api.clone()))
            .app_data(web::Data::new(square_api.clone()));
        // Each webhook route sits behind its provider's signature check. The middleware consumes and
        // re-injects the body, so handlers deserialise exactly the verified bytes.
        let stripe_sig = SignatureScheme::Stripe { secret: config.stripe.webhook_secret.clone() };
        let square_sig = SignatureScheme::Square {
            secret: config.square.signature_key.clone(),
            notification_url: config.square.notification_url.clone(),
        };
        let stripe_webhook_scope = web::scope("/webhook/stripe")
            .wrap(SignatureMiddlewareFactory::new(stripe_sig))
            .service(StripeWebhookRoute::<SqliteDatabase>::new());
        let square_webhook_scope = web::scope("/webhook/square")
            .wrap(SignatureMiddlewareFactory::new(square_sig))
            .service(SquareWebhookRoute::<SqliteDatabase>::new());
        // Checkout and admin calls come from the storefront frontend, which authenticates with a shared
        // key. Anything without the key is turned away before a handler runs.
        let api_key = config.store_api_key.clone();
        let api_scope = web::scope("/api")
            .wrap_fn(move |req, srv| {
                let presented = req.headers().get("x-store-api-key").and_then(|v| v.to_str().ok());
                if crate::helpers::store_key_is_valid(presented, api_key.reveal()) {
                    srv.call(req)
                } else {
                    warn!("🔐️ Request to {} without a valid store API key. Denying access.", req.path());
                    ok(req.error_response(ServerError::InvalidApiKey)).boxed_local()
                }
            })
            .service(StripeCheckoutRoute::<SqliteDatabase>::new())
            .service(SquareCheckoutRoute::<SqliteDatabase>::new())
            .service(SetProductStockRoute::<SqliteDatabase>::new())
            .service(MarkNotificationReadRoute::<SqliteDatabase>::new())
            .service(DeleteNotificationRoute::<SqliteDatabase>::new());
        app.service(health).service(stripe_webhook_scope).service(square_webhook_scope).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
