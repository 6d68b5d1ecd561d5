//! Fulfillment and sales recording.
//!
//! Transitioning an order into `Delivered` writes the sales ledger rows
//! atomically with the status update, then fires a best-effort
//! review-request notification after the commit. A notification failure
//! is logged and never affects the outcome.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use common::{CustomerId, OrderId, OrderStatus, StoreId};
use storage::{CommerceStore, DeliveryOutcome};

use crate::error::Result;

/// Data handed to the notification channel when an order is delivered.
#[derive(Debug, Clone)]
pub struct DeliveryNotice {
    pub order_id: OrderId,
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub email: String,
}

/// Error produced by a notification channel.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The notification could not be sent.
    #[error("delivery notification failed: {0}")]
    Send(String),
}

/// Outbound channel for customer notifications.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Asks the customer for a review of a delivered order.
    async fn order_delivered(&self, notice: DeliveryNotice) -> std::result::Result<(), NotificationError>;
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<DeliveryNotice>,
    fail_on_send: bool,
}

/// In-memory notification service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    /// Creates a new in-memory notification service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on subsequent sends.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns the number of notices sent.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    /// Returns the notices sent so far.
    pub fn sent(&self) -> Vec<DeliveryNotice> {
        self.state.read().unwrap().sent.clone()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn order_delivered(
        &self,
        notice: DeliveryNotice,
    ) -> std::result::Result<(), NotificationError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_send {
            return Err(NotificationError::Send("smtp unreachable".to_string()));
        }
        state.sent.push(notice);
        Ok(())
    }
}

/// Notification service that only logs the intent.
///
/// Actual mail delivery lives outside this core; production wires the
/// logged notice into the platform's mail pipeline.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationService;

impl LoggingNotificationService {
    /// Creates a new logging notification service.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationService for LoggingNotificationService {
    async fn order_delivered(
        &self,
        notice: DeliveryNotice,
    ) -> std::result::Result<(), NotificationError> {
        tracing::info!(
            order_id = %notice.order_id,
            customer = %notice.customer_name,
            email = %notice.email,
            "review request for delivered order"
        );
        Ok(())
    }
}

/// Service driving order status transitions and sales recording.
pub struct FulfillmentService<S: CommerceStore, N: NotificationService> {
    store: S,
    notifier: Arc<N>,
}

impl<S, N> FulfillmentService<S, N>
where
    S: CommerceStore,
    N: NotificationService + 'static,
{
    /// Creates a new fulfillment service.
    pub fn new(store: S, notifier: Arc<N>) -> Self {
        Self { store, notifier }
    }

    /// Transitions an order's status on behalf of a store.
    ///
    /// Fails with `Forbidden` when the order does not belong to one of
    /// the store's customers and with `InvalidTransition` when the
    /// closed state machine rejects the move. Entering `Delivered`
    /// records one sales row per order line (atomically with the status
    /// update) and spawns the review notification after the commit.
    #[tracing::instrument(skip(self))]
    pub async fn transition(
        &self,
        order_id: OrderId,
        store_id: StoreId,
        status: OrderStatus,
    ) -> Result<DeliveryOutcome> {
        let outcome = self.store.transition_order(order_id, store_id, status).await?;

        if outcome.status == OrderStatus::Delivered {
            metrics::counter!("orders_delivered_total").increment(1);
            tracing::info!(
                order_id = %order_id,
                sales_recorded = outcome.sales_recorded,
                "order delivered, sales recorded"
            );

            if let Some(contact) = &outcome.contact {
                let notice = DeliveryNotice {
                    order_id,
                    store_id,
                    customer_id: contact.customer_id,
                    customer_name: contact.name.clone(),
                    email: contact.email.clone(),
                };
                let notifier = self.notifier.clone();
                // Fire-and-forget after the commit; the request outcome
                // never depends on the notification.
                tokio::spawn(async move {
                    if let Err(err) = notifier.order_delivered(notice).await {
                        metrics::counter!("notifications_failed_total").increment(1);
                        tracing::warn!(order_id = %order_id, error = %err, "delivery notification failed");
                    }
                });
            }
        }

        Ok(outcome)
    }
}
