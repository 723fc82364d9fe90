//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! The webhook handlers run behind the signature-verification middleware, so by the time a body reaches
//! them it has already been authenticated against the provider's signing secret. They acknowledge every
//! delivery they can parse, including events for unknown orders and redeliveries, and only return a 5xx
//! when the backend itself failed. The provider retries on 5xx, which is exactly what we want for a
//! transient database outage.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use provider_tools::{SessionLineItem, SquareApi, StripeApi};
use storefront_engine::{
    db_types::PaymentProvider,
    CatalogApi,
    CheckoutApi,
    OrderFlowApi,
    StorefrontDatabase,
};

use crate::{
    data_objects::{CheckoutRequest, CheckoutResponse, SetStockRequest, WebhookAck},
    errors::ServerError,
    integrations::{
        square::{self, SquareAction, SquareEvent},
        stripe::{self, StripeAction, StripeEvent},
    },
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//-------------------------------------------   Stripe webhook  -------------------------------------------------
route!(stripe_webhook => Post "" impl StorefrontDatabase);
pub async fn stripe_webhook<B: StorefrontDatabase>(
    body: web::Bytes,
    orders: web::Data<OrderFlowApi<B>>,
    catalog: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let event: StripeEvent =
        serde_json::from_slice(&body).map_err(|_| ServerError::CouldNotDeserializePayload)?;
    trace!("🪝️ Stripe delivered {} ({})", event.event_type, event.id);
    match stripe::interpret_event(&event) {
        StripeAction::Payment(outcome) => {
            let result = orders.process_payment_outcome(outcome).await?;
            debug!("🪝️ Stripe event {} processed: {result:?}", event.id);
        },
        StripeAction::CatalogProduct(update) => {
            catalog.apply_product_update(update).await?;
        },
        StripeAction::CatalogPrice { product_id, price, price_id } => {
            catalog.apply_price_update(PaymentProvider::Stripe, &product_id, price, Some(&price_id)).await?;
        },
        StripeAction::CatalogDelete { product_id } => {
            catalog.deactivate_product(PaymentProvider::Stripe, &product_id).await?;
        },
        StripeAction::Ignore => {},
    }
    Ok(HttpResponse::Ok().json(WebhookAck::ok()))
}

//-------------------------------------------   Square webhook  -------------------------------------------------
route!(square_webhook => Post "" impl StorefrontDatabase);
pub async fn square_webhook<B: StorefrontDatabase>(
    body: web::Bytes,
    orders: web::Data<OrderFlowApi<B>>,
    catalog: web::Data<CatalogApi<B>>,
    square_api: web::Data<SquareApi>,
) -> Result<HttpResponse, ServerError> {
    let event: SquareEvent =
        serde_json::from_slice(&body).map_err(|_| ServerError::CouldNotDeserializePayload)?;
    trace!("🪝️ Square delivered {} ({})", event.event_type, event.event_id);
    match square::interpret_event(&event) {
        SquareAction::Payment(outcome) => {
            let result = orders.process_payment_outcome(outcome).await?;
            debug!("🪝️ Square event {} processed: {result:?}", event.event_id);
        },
        SquareAction::PaymentCreated(order_id) => {
            orders.mark_processing(&order_id).await?;
        },
        SquareAction::CatalogChanged => {
            sync_square_catalog(&square_api, &catalog).await?;
        },
        SquareAction::Ignore => {},
    }
    Ok(HttpResponse::Ok().json(WebhookAck::ok()))
}

/// Pulls the full Square catalog and mirrors it. Square's catalog webhook is a bare version bump, so this
/// is the only way to learn what changed.
async fn sync_square_catalog<B: StorefrontDatabase>(
    square_api: &SquareApi,
    catalog: &CatalogApi<B>,
) -> Result<(), ServerError> {
    let items = square_api.list_catalog_items().await.map_err(|e| {
        error!("🪝️ Could not pull the Square catalog. {e}");
        ServerError::ProviderError(e.to_string())
    })?;
    let count = items.len();
    for item in items {
        let update = square::catalog_update_from_item(&item);
        catalog.apply_product_update(update).await?;
        if let Some(price) = item.price {
            catalog
                .apply_price_update(PaymentProvider::Square, &item.item_id, price, item.variation_id.as_deref())
                .await?;
        }
    }
    info!("🪝️ Square catalog sync complete. {count} items mirrored.");
    Ok(())
}

//-------------------------------------------   Stripe checkout  ------------------------------------------------
route!(stripe_checkout => Post "/checkout/stripe" impl StorefrontDatabase);
pub async fn stripe_checkout<B: StorefrontDatabase>(
    body: web::Json<CheckoutRequest>,
    checkout: web::Data<CheckoutApi<B>>,
    stripe_api: web::Data<StripeApi>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    let (success_url, cancel_url) = (req.success_url.clone(), req.cancel_url.clone());
    let pending = checkout.create_pending_order(req.into(), PaymentProvider::Stripe).await?;
    let order_id = pending.order.id.clone();
    let lines = pending
        .lines
        .iter()
        .map(|l| SessionLineItem {
            name: l.title.clone(),
            quantity: l.quantity,
            unit_amount: l.unit_price,
            price_id: l.stripe_price_id.clone(),
        })
        .collect::<Vec<_>>();
    let session = match stripe_api
        .create_checkout_session(
            order_id.as_str(),
            &pending.order.minecraft_username,
            &lines,
            success_url.as_deref(),
            cancel_url.as_deref(),
        )
        .await
    {
        Ok(session) => session,
        Err(e) => {
            // The order never reached the provider, so there is nothing for a webhook to complete.
            warn!("🛒️ Stripe rejected the checkout session for order {order_id}. Discarding it. {e}");
            checkout.db().discard_pending_order(&order_id).await?;
            return Err(ServerError::ProviderError(e.to_string()));
        },
    };
    checkout.db().set_provider_reference(&order_id, &session.id).await?;
    info!("🛒️ Created Stripe checkout session for order {order_id}");
    Ok(HttpResponse::Ok().json(CheckoutResponse { url: session.url, order_id: order_id.as_str().to_string() }))
}

//-------------------------------------------   Square checkout  ------------------------------------------------
route!(square_checkout => Post "/checkout/square" impl StorefrontDatabase);
pub async fn square_checkout<B: StorefrontDatabase>(
    body: web::Json<CheckoutRequest>,
    checkout: web::Data<CheckoutApi<B>>,
    square_api: web::Data<SquareApi>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    // Square has a single post-payment redirect, so the request's success URL is the override.
    let redirect_url = req.success_url.clone();
    let pending = checkout.create_pending_order(req.into(), PaymentProvider::Square).await?;
    let order_id = pending.order.id.clone();
    let description = format!("Store order {}", order_id.short());
    let note = pending.payment_note();
    let link = match square_api
        .create_payment_link(
            order_id.as_str(),
            pending.order.total_amount,
            &description,
            &note,
            redirect_url.as_deref(),
        )
        .await
    {
        Ok(link) => link,
        Err(e) => {
            warn!("🛒️ Square rejected the payment link for order {order_id}. Discarding it. {e}");
            checkout.db().discard_pending_order(&order_id).await?;
            return Err(ServerError::ProviderError(e.to_string()));
        },
    };
    checkout.db().set_provider_reference(&order_id, &link.id).await?;
    info!("🛒️ Created Square payment link for order {order_id}");
    Ok(HttpResponse::Ok().json(CheckoutResponse { url: link.url, order_id: order_id.as_str().to_string() }))
}

//-------------------------------------------   Admin stock  ----------------------------------------------------
route!(set_product_stock => Post "/products/{id}/stock" impl StorefrontDatabase);
pub async fn set_product_stock<B: StorefrontDatabase>(
    path: web::Path<String>,
    body: web::Json<SetStockRequest>,
    catalog: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    let product = catalog.set_stock(&product_id, body.stock).await?;
    Ok(HttpResponse::Ok().json(product))
}

//-----------------------------------------   Admin notifications  ----------------------------------------------
route!(mark_notification_read => Post "/notifications/{id}/read" impl StorefrontDatabase);
pub async fn mark_notification_read<B: StorefrontDatabase>(
    path: web::Path<i64>,
    orders: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    orders.db().mark_notification_read(id).await?;
    debug!("📝️ Notification {id} marked as read");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

route!(delete_notification => Delete "/notifications/{id}" impl StorefrontDatabase);
pub async fn delete_notification<B: StorefrontDatabase>(
    path: web::Path<i64>,
    orders: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    orders.db().delete_notification(id).await?;
    debug!("📝️ Notification {id} deleted");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}
