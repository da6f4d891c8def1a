use std::sync::Arc;
use std::time::Instant;

use crate::domain::basket::BasketId;
use crate::domain::order::{Address, Order};
use crate::metrics::Metrics;
use crate::repository::{Channel, OrderRepository, OutboxStore};

use super::assembler::OrderAssembler;
use super::dispatcher::OrderDispatcher;
use super::errors::{CreateOrderError, DispatchError};
use super::stage::{OrderStage, StageTrail};
use super::uri::UriComposer;

// ============================================================================
// Order Creation Orchestrator
// ============================================================================
//
// Validating -> Assembled -> Persisted -> PrimaryNotified
//   -> SecondaryNotified -> Enqueued -> Completed
//
// `add` is the commit point. Errors before it abort the call with nothing
// written. After it, channel failures become warnings in the placement,
// the outbox entry for the channel stays pending, and the relay redelivers.
//
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Run the post-commit channels concurrently instead of in sequence
    pub parallel: bool,
    /// Outbox attempts before an entry is marked failed
    pub max_attempts: u32,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            max_attempts: 5,
        }
    }
}

/// Result of a successful `create_order`: the order exists, and these are
/// the channels that took it.
#[derive(Debug, Clone)]
pub struct OrderPlacement {
    pub order: Order,
    pub stages: Vec<OrderStage>,
    pub delivered: Vec<Channel>,
    pub warnings: Vec<DispatchError>,
}

impl OrderPlacement {
    pub fn is_fully_delivered(&self) -> bool {
        self.warnings.is_empty() && self.delivered.contains(&Channel::SecondaryStore)
    }
}

struct ChannelResults {
    primary: Result<(), DispatchError>,
    secondary: bool,
    queue: Result<(), DispatchError>,
}

pub struct OrderService {
    assembler: OrderAssembler,
    repository: Arc<dyn OrderRepository>,
    outbox: Arc<dyn OutboxStore>,
    dispatcher: Arc<OrderDispatcher>,
    metrics: Arc<Metrics>,
    options: DispatchOptions,
}

impl OrderService {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        outbox: Arc<dyn OutboxStore>,
        uri_composer: Arc<dyn UriComposer>,
        dispatcher: Arc<OrderDispatcher>,
        metrics: Arc<Metrics>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            assembler: OrderAssembler::new(repository.clone(), uri_composer),
            repository,
            outbox,
            dispatcher,
            metrics,
            options,
        }
    }

    pub async fn create_order(
        &self,
        basket_id: BasketId,
        ship_to: Address,
    ) -> Result<OrderPlacement, CreateOrderError> {
        let started = Instant::now();
        let mut trail = StageTrail::start(basket_id);

        let order = match self.commit(basket_id, ship_to, &mut trail).await {
            Ok(order) => order,
            Err(e) => {
                trail.advance(OrderStage::Aborted(e.reason()));
                self.metrics.record_order_aborted(e.reason());
                tracing::warn!(basket_id = basket_id, reason = e.reason(), error = %e, "Order creation aborted");
                return Err(e);
            }
        };

        tracing::info!(order_id = %order.id(), basket_id = basket_id, total = %order.total(), "📦 Order persisted");

        let results = if self.options.parallel {
            let results = self.dispatch_parallel(&order).await;
            trail.advance(OrderStage::PrimaryNotified);
            trail.advance(OrderStage::SecondaryNotified);
            trail.advance(OrderStage::Enqueued);
            results
        } else {
            self.dispatch_sequential(&order, &mut trail).await
        };

        let mut delivered = Vec::new();
        let mut warnings = Vec::new();

        for (channel, result) in [(Channel::OrderStore, results.primary), (Channel::Queue, results.queue)] {
            self.settle_outbox(&order, channel, &result).await;
            match result {
                Ok(()) => delivered.push(channel),
                Err(e) => {
                    self.metrics.record_dispatch_failure(channel);
                    warnings.push(e);
                }
            }
        }
        if results.secondary {
            delivered.push(Channel::SecondaryStore);
        }
        delivered.sort();

        trail.advance(OrderStage::Completed);
        self.metrics.record_order_created(started.elapsed().as_secs_f64());

        if warnings.is_empty() {
            tracing::info!(order_id = %order.id(), channels = ?delivered, "✅ Order created and dispatched");
        } else {
            tracing::warn!(
                order_id = %order.id(),
                channels = ?delivered,
                warnings = warnings.len(),
                "Order created, some channels left to the outbox relay"
            );
        }

        Ok(OrderPlacement {
            order,
            stages: trail.into_stages(),
            delivered,
            warnings,
        })
    }

    /// Everything up to and including the commit point.
    async fn commit(
        &self,
        basket_id: BasketId,
        ship_to: Address,
        trail: &mut StageTrail,
    ) -> Result<Order, CreateOrderError> {
        let draft = self.assembler.assemble(basket_id, ship_to).await?;
        trail.advance(OrderStage::Assembled);

        let order = self
            .repository
            .add(draft)
            .await
            .map_err(CreateOrderError::PersistenceFailed)?;
        trail.advance(OrderStage::Persisted);

        Ok(order)
    }

    async fn dispatch_sequential(&self, order: &Order, trail: &mut StageTrail) -> ChannelResults {
        let primary = self.dispatcher.notify_order_store(order).await;
        trail.advance(OrderStage::PrimaryNotified);

        let secondary = self.dispatcher.notify_secondary(order).await;
        trail.advance(OrderStage::SecondaryNotified);

        let queue = self.dispatcher.enqueue(order).await;
        trail.advance(OrderStage::Enqueued);

        ChannelResults {
            primary,
            secondary,
            queue,
        }
    }

    async fn dispatch_parallel(&self, order: &Order) -> ChannelResults {
        let (primary, secondary, queue) = tokio::join!(
            self.dispatcher.notify_order_store(order),
            self.dispatcher.notify_secondary(order),
            self.dispatcher.enqueue(order),
        );

        ChannelResults {
            primary,
            secondary,
            queue,
        }
    }

    /// Record the inline attempt on the channel's outbox entry. A failed
    /// save leaves the entry pending, which at worst means a duplicate.
    async fn settle_outbox(&self, order: &Order, channel: Channel, result: &Result<(), DispatchError>) {
        let entry = match self.outbox.get(order.id(), channel).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::warn!(order_id = %order.id(), channel = %channel, "No outbox entry for channel");
                return;
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id(), channel = %channel, error = %e, "Failed to load outbox entry");
                return;
            }
        };

        let mut entry = entry;
        match result {
            Ok(()) => entry.complete(),
            Err(e) => entry.record_failure(e.to_string(), self.options.max_attempts),
        }

        if let Err(e) = self.outbox.save(&entry).await {
            tracing::warn!(order_id = %order.id(), channel = %channel, error = %e, "Failed to update outbox entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::basket::Basket;
    use crate::repository::OutboxStatus;
    use crate::service::testing::{Harness, QUEUE_ATTEMPTS};
    use rust_decimal::Decimal;
    use std::sync::atomic::Ordering;

    fn address() -> Address {
        Address::new("123 Main St.", "Kent", "OH", "United States", "44240")
    }

    #[tokio::test]
    async fn test_basket_42_creates_order_with_total_25() {
        let harness = Harness::new().await;
        let service = harness.service(false);

        let placement = service.create_order(42, address()).await.unwrap();
        let order = &placement.order;

        assert_eq!(order.total(), Decimal::new(2500, 2));
        assert_eq!(order.order_items().len(), 2);
        assert_eq!(order.buyer_id(), "B1");
        assert_eq!(harness.repo.add_calls(), 1);

        assert_eq!(harness.queue.message_order_ids(), vec![order.id()]);
        assert_eq!(harness.order_store.received(), vec![order.id()]);
        assert_eq!(harness.summaries.received().len(), 1);

        assert!(placement.warnings.is_empty());
        assert!(placement.is_fully_delivered());
        assert_eq!(placement.stages.last(), Some(&OrderStage::Completed));
        assert_eq!(placement.stages.len(), 7);
        assert_eq!(harness.metrics.orders_created.get(), 1);
    }

    #[tokio::test]
    async fn test_successful_dispatch_clears_outbox() {
        let harness = Harness::new().await;
        let placement = harness.service(false).create_order(42, address()).await.unwrap();

        for channel in Channel::DURABLE {
            let entry = harness.repo.get(placement.order.id(), channel).await.unwrap().unwrap();
            assert_eq!(entry.status, OutboxStatus::Delivered);
        }
        assert!(harness.repo.pending(10, chrono::Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_basket_aborts_without_add() {
        let harness = Harness::new().await;
        let err = harness.service(false).create_order(999, address()).await.unwrap_err();

        assert!(matches!(err, CreateOrderError::BasketNotFound(999)));
        assert_eq!(harness.repo.add_calls(), 0);
        assert_eq!(harness.repo.order_count().await, 0);
        assert_eq!(harness.queue.sends.load(Ordering::SeqCst), 0);
        assert!(harness.order_store.received().is_empty());
        assert_eq!(
            harness.metrics.orders_aborted.with_label_values(&["basket_not_found"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_empty_basket_aborts_without_add() {
        let harness = Harness::new().await;
        harness.repo.insert_basket(Basket::new(8, "B1")).await;

        let err = harness.service(false).create_order(8, address()).await.unwrap_err();

        assert!(matches!(err, CreateOrderError::EmptyBasket(8)));
        assert_eq!(harness.repo.add_calls(), 0);
        assert_eq!(harness.repo.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_catalog_item_aborts_without_add() {
        let harness = Harness::new().await;
        harness
            .repo
            .insert_basket(Basket::new(9, "B1").with_item(1, Decimal::ONE, 1).with_item(3, Decimal::ONE, 1))
            .await;

        let err = harness.service(false).create_order(9, address()).await.unwrap_err();

        assert!(matches!(err, CreateOrderError::CatalogItemMissing(ref ids) if ids == &vec![3]));
        assert_eq!(harness.repo.add_calls(), 0);
        assert!(harness.queue.message_order_ids().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_aborts_before_dispatch() {
        let harness = Harness::new().await;
        harness.repo.reject_adds(true);

        let err = harness.service(false).create_order(42, address()).await.unwrap_err();

        assert!(matches!(err, CreateOrderError::PersistenceFailed(_)));
        assert!(harness.order_store.received().is_empty());
        assert_eq!(harness.queue.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_secondary_failure_changes_nothing() {
        let harness = Harness::new().await;
        harness.summaries.fail.store(true, Ordering::SeqCst);

        let placement = harness.service(false).create_order(42, address()).await.unwrap();

        assert!(placement.warnings.is_empty());
        assert!(!placement.delivered.contains(&Channel::SecondaryStore));
        assert_eq!(placement.order.total(), Decimal::new(2500, 2));

        let stored = harness.repo.get_order(placement.order.id()).await.unwrap().unwrap();
        assert_eq!(stored, placement.order);
        assert_eq!(harness.queue.message_order_ids(), vec![placement.order.id()]);
    }

    #[tokio::test]
    async fn test_queue_down_keeps_order_persisted() {
        let harness = Harness::new().await;
        harness.queue.down.store(true, Ordering::SeqCst);

        let placement = harness.service(false).create_order(42, address()).await.unwrap();
        let order_id = placement.order.id();

        assert_eq!(harness.queue.sends.load(Ordering::SeqCst), QUEUE_ATTEMPTS);
        assert_eq!(placement.warnings.len(), 1);
        match &placement.warnings[0] {
            DispatchError::QueuePublishFailed { order_id: id, source } => {
                assert_eq!(*id, order_id);
                assert_eq!(source.attempts, QUEUE_ATTEMPTS);
            }
            other => panic!("unexpected warning: {other}"),
        }

        assert_eq!(harness.repo.get_order(order_id).await.unwrap(), Some(placement.order.clone()));

        let entry = harness.repo.get(order_id, Channel::Queue).await.unwrap().unwrap();
        assert_eq!(entry.status, OutboxStatus::Pending);
        assert_eq!(entry.attempts, 1);
        assert!(entry.last_error.is_some());
        assert_eq!(harness.metrics.dispatch_failure_count(Channel::Queue), 1);
    }

    #[tokio::test]
    async fn test_queue_recovers_on_third_attempt() {
        let harness = Harness::new().await;
        harness.queue.failures_left.store(2, Ordering::SeqCst);

        let placement = harness.service(false).create_order(42, address()).await.unwrap();

        assert!(placement.warnings.is_empty());
        assert_eq!(harness.queue.sends.load(Ordering::SeqCst), 3);
        assert_eq!(harness.queue.message_order_ids(), vec![placement.order.id()]);
    }

    #[tokio::test]
    async fn test_primary_failure_is_a_warning() {
        let harness = Harness::new().await;
        harness.order_store.fail.store(true, Ordering::SeqCst);

        let placement = harness.service(false).create_order(42, address()).await.unwrap();

        assert_eq!(placement.warnings.len(), 1);
        assert_eq!(placement.warnings[0].channel(), Channel::OrderStore);
        assert_eq!(placement.delivered, vec![Channel::SecondaryStore, Channel::Queue]);
        assert_eq!(placement.stages.last(), Some(&OrderStage::Completed));

        let entry = harness
            .repo
            .get(placement.order.id(), Channel::OrderStore)
            .await
            .unwrap()
            .unwrap();
        assert!(entry.is_pending());
    }

    #[tokio::test]
    async fn test_parallel_dispatch_reaches_every_channel() {
        let harness = Harness::new().await;

        let placement = harness.service(true).create_order(42, address()).await.unwrap();

        assert!(placement.is_fully_delivered());
        assert_eq!(
            placement.delivered,
            vec![Channel::OrderStore, Channel::SecondaryStore, Channel::Queue]
        );
        assert_eq!(placement.stages.last(), Some(&OrderStage::Completed));
        assert_eq!(harness.queue.message_order_ids(), vec![placement.order.id()]);
    }

    #[tokio::test]
    async fn test_orders_get_distinct_ids() {
        let harness = Harness::new().await;
        let service = harness.service(false);

        let first = service.create_order(42, address()).await.unwrap();
        let second = service.create_order(42, address()).await.unwrap();

        assert_ne!(first.order.id(), second.order.id());
        assert_eq!(harness.repo.add_calls(), 2);
    }
}
