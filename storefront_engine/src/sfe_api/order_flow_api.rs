use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewAdminNotification, Order, OrderId, OrderStatus, PaymentOutcome, PaymentResult},
    events::{EventProducers, FulfilledItem, OrderCompletedEvent, PaymentFailedEvent},
    traits::{StorefrontDatabase, StorefrontError},
};

/// The outcome of feeding one normalised payment event through the order state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The completion guard matched. Stock was decremented and side effects were dispatched; this happens at
    /// most once per order.
    Completed(Order),
    /// The guard matched zero rows because a previous delivery already completed the order. Nothing was done.
    AlreadyProcessed,
    /// The order was cancelled following a failed payment.
    Cancelled(Order),
    /// The event referenced an order id we have no record of. Logged and otherwise ignored.
    OrderUnknown(OrderId),
}

/// `OrderFlowApi` is the primary API for driving the order state machine in response to payment provider
/// webhook events.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: StorefrontDatabase
{
    /// Process a normalised payment outcome. This is the only entry point for webhook-driven order
    /// transitions, regardless of which provider delivered the event.
    ///
    /// On success the sequence is:
    /// 1. The guarded completion update. If it matches zero rows the event is a redelivery (or the order is
    ///    unknown) and processing stops here.
    /// 2. One stock decrement per order line, clamped at zero.
    /// 3. A `new_order` admin notification.
    /// 4. The order-completed event hook, carrying the order, its lines and the buyer's account if there is
    ///    one.
    ///
    /// On failure the order is cancelled, a `payment_failed` admin notification is recorded and the
    /// payment-failed hook fires. Stock is never touched on the failure path.
    pub async fn process_payment_outcome(&self, outcome: PaymentOutcome) -> Result<CompletionOutcome, StorefrontError> {
        let order_id = outcome.order_id.clone();
        match outcome.outcome {
            PaymentResult::Succeeded => self.process_successful_payment(order_id).await,
            PaymentResult::Failed { reason } => self.process_failed_payment(order_id, &reason).await,
        }
    }

    async fn process_successful_payment(&self, order_id: OrderId) -> Result<CompletionOutcome, StorefrontError> {
        let Some(order) = self.db.complete_order_once(&order_id).await? else {
            // The guard did not match. Distinguish a redelivery from an unknown order for the logs; the
            // caller acks both.
            return match self.db.fetch_order(&order_id).await? {
                Some(_) => {
                    info!("🔄️📦️ Order {order_id} has already been processed. Skipping fulfilment.");
                    Ok(CompletionOutcome::AlreadyProcessed)
                },
                None => {
                    warn!("🔄️📦️ Received a successful payment for unknown order {order_id}");
                    Ok(CompletionOutcome::OrderUnknown(order_id))
                },
            };
        };
        let items = self.db.fetch_order_items(&order_id).await?;
        let mut fulfilled = Vec::with_capacity(items.len());
        for item in &items {
            let title = self
                .db
                .fetch_product(&item.product_id)
                .await?
                .map(|p| p.title)
                .unwrap_or_else(|| item.product_id.clone());
            let remaining = self.db.decrement_stock(&item.product_id, item.quantity).await?;
            debug!(
                "🔄️📦️ Decremented stock of {} by {} for order {order_id}. {remaining} remaining.",
                item.product_id, item.quantity
            );
            fulfilled.push(FulfilledItem {
                product_id: item.product_id.clone(),
                title,
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }
        let user = match &order.user_id {
            Some(user_id) => self.db.fetch_user(user_id).await?,
            None => None,
        };
        let buyer = order.minecraft_username.clone();
        self.db.insert_admin_notification(NewAdminNotification::new_order(&order, &buyer)).await?;
        info!("🔄️📦️ Order {order_id} completed for {buyer}. Total: {}", order.total_amount);
        self.call_order_completed_hook(&order, fulfilled, user).await;
        Ok(CompletionOutcome::Completed(order))
    }

    async fn process_failed_payment(&self, order_id: OrderId, reason: &str) -> Result<CompletionOutcome, StorefrontError> {
        let Some(order) = self.db.cancel_order(&order_id).await? else {
            // Either we never saw this order, or a retry already completed it. Both are acked.
            return match self.db.fetch_order(&order_id).await? {
                Some(_) => {
                    info!("🔄️❌️ Ignoring a failed payment for order {order_id}, which is no longer cancellable.");
                    Ok(CompletionOutcome::AlreadyProcessed)
                },
                None => {
                    warn!("🔄️❌️ Received a failed payment for unknown order {order_id}");
                    Ok(CompletionOutcome::OrderUnknown(order_id))
                },
            };
        };
        self.db.insert_admin_notification(NewAdminNotification::payment_failed(&order, reason)).await?;
        info!("🔄️❌️ Order {order_id} cancelled. Reason: {reason}");
        self.call_payment_failed_hook(&order, reason).await;
        Ok(CompletionOutcome::Cancelled(order))
    }

    /// Mark an order as `Processing`. Square reports `payment.created` before the payment outcome; the
    /// transition only applies to orders still in `Pending`, so a late-arriving `payment.created` cannot
    /// regress a completed order.
    pub async fn mark_processing(&self, order_id: &OrderId) -> Result<Option<Order>, StorefrontError> {
        let order = self.db.mark_order_processing(order_id).await?;
        match &order {
            Some(o) => debug!("🔄️💳️ Order {order_id} is now {}", o.status),
            None => trace!("🔄️💳️ Order {order_id} was not in Pending. Ignoring payment.created."),
        }
        Ok(order)
    }

    /// An administrative status override, bypassing the webhook guards. This is how orders are refunded.
    /// Completed orders cannot be moved back to `Pending` or `Processing`.
    pub async fn override_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<Order, StorefrontError> {
        let current =
            self.db.fetch_order(order_id).await?.ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?;
        let regression = matches!(current.status, OrderStatus::Completed) &&
            matches!(status, OrderStatus::Pending | OrderStatus::Processing);
        if regression {
            return Err(StorefrontError::OrderModificationForbidden);
        }
        let order = self.db.set_order_status(order_id, status).await?;
        info!("🔄️🪛️ Order {order_id} status manually set to {status}");
        Ok(order)
    }

    async fn call_order_completed_hook(
        &self,
        order: &Order,
        items: Vec<FulfilledItem>,
        user: Option<crate::db_types::StoreUser>,
    ) {
        for emitter in &self.producers.order_completed_producer {
            debug!("🔄️📦️ Notifying order completed hook subscribers");
            let event = OrderCompletedEvent::new(order.clone(), items.clone(), user.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_payment_failed_hook(&self, order: &Order, reason: &str) {
        for emitter in &self.producers.payment_failed_producer {
            debug!("🔄️❌️ Notifying payment failed hook subscribers");
            let event = PaymentFailedEvent::new(order.clone(), reason.to_string());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
