use std::sync::Arc;
use std::time::Duration;

use crate::domain::order::Order;
use crate::messaging::QueuePublisher;
use crate::metrics::Metrics;
use crate::notifiers::{NotifyError, OrderNotifier, SecondaryStoreNotifier};
use crate::repository::Channel;

use super::errors::DispatchError;

/// Pushes a persisted order to each downstream channel. Shared by the
/// inline post-commit path and the outbox relay.
pub struct OrderDispatcher {
    order_store: Arc<dyn OrderNotifier>,
    secondary: SecondaryStoreNotifier,
    queue: QueuePublisher,
    notify_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl OrderDispatcher {
    pub fn new(
        order_store: Arc<dyn OrderNotifier>,
        secondary: SecondaryStoreNotifier,
        queue: QueuePublisher,
        notify_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            order_store,
            secondary,
            queue,
            notify_timeout,
            metrics,
        }
    }

    pub async fn notify_order_store(&self, order: &Order) -> Result<(), DispatchError> {
        let result = tokio::time::timeout(self.notify_timeout, self.order_store.notify(order))
            .await
            .unwrap_or_else(|_| {
                Err(NotifyError::Timeout {
                    url: "order-store".to_string(),
                })
            });

        result.map_err(|e| {
            tracing::warn!(order_id = %order.id(), error = %e, "Order store notification failed");
            DispatchError::primary(order.id(), &e)
        })
    }

    /// Never fails; returns whether the secondary store took the summary.
    pub async fn notify_secondary(&self, order: &Order) -> bool {
        match tokio::time::timeout(self.notify_timeout, self.secondary.notify_best_effort(order)).await {
            Ok(delivered) => delivered,
            Err(_) => {
                tracing::warn!(order_id = %order.id(), "Secondary store notification timed out, continuing");
                self.metrics.record_dispatch_failure(Channel::SecondaryStore);
                false
            }
        }
    }

    pub async fn enqueue(&self, order: &Order) -> Result<(), DispatchError> {
        self.queue
            .publish(order)
            .await
            .map_err(|source| DispatchError::QueuePublishFailed {
                order_id: order.id(),
                source,
            })
    }

    pub async fn deliver(&self, channel: Channel, order: &Order) -> Result<(), DispatchError> {
        match channel {
            Channel::OrderStore => self.notify_order_store(order).await,
            Channel::Queue => self.enqueue(order).await,
            Channel::SecondaryStore => {
                self.notify_secondary(order).await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::Harness;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_deliver_routes_by_channel() {
        let harness = Harness::new().await;
        let order = harness.sample_order();

        harness.dispatcher.deliver(Channel::OrderStore, &order).await.unwrap();
        harness.dispatcher.deliver(Channel::Queue, &order).await.unwrap();

        assert_eq!(harness.order_store.received(), vec![order.id()]);
        assert_eq!(harness.queue.message_order_ids(), vec![order.id()]);
        assert!(harness.summaries.received().is_empty());
    }

    #[tokio::test]
    async fn test_secondary_failure_is_not_an_error() {
        let harness = Harness::new().await;
        harness.summaries.fail.store(true, Ordering::SeqCst);

        let result = harness
            .dispatcher
            .deliver(Channel::SecondaryStore, &harness.sample_order())
            .await;

        assert!(result.is_ok());
        assert_eq!(harness.metrics.dispatch_failure_count(Channel::SecondaryStore), 1);
    }

    #[tokio::test]
    async fn test_hanging_order_store_times_out() {
        let harness = Harness::new().await;
        harness.order_store.hang.store(true, Ordering::SeqCst);

        let err = harness
            .dispatcher
            .notify_order_store(&harness.sample_order())
            .await
            .unwrap_err();

        assert_eq!(err.channel(), Channel::OrderStore);
    }
}
