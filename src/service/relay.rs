use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::Metrics;
use crate::repository::{OrderRepository, OutboxEntry, OutboxStatus, OutboxStore, RepositoryError};

use super::dispatcher::OrderDispatcher;

// ============================================================================
// Outbox Relay - redelivers orders the inline dispatch could not
// ============================================================================
//
// Each pass:
// 1. Loads pending outbox entries not touched within the grace period,
//    oldest first, so an in-flight create_order settles its own entries
// 2. Skips channels that are not tracked durably
// 3. Reloads the order and pushes it to the entry's channel
// 4. Marks the entry delivered, or records the failure; once the attempt
//    budget is spent the entry is marked failed for manual reconciliation
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub interval: Duration,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub grace: Duration,
}

/// Counts for one relay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayResult {
    pub claimed: usize,
    pub delivered: usize,
    /// Failed again, left pending for a later pass
    pub released: usize,
    /// Gave up on
    pub failed: usize,
}

pub struct OutboxRelay {
    repository: Arc<dyn OrderRepository>,
    outbox: Arc<dyn OutboxStore>,
    dispatcher: Arc<OrderDispatcher>,
    metrics: Arc<Metrics>,
    config: RelayConfig,
}

impl OutboxRelay {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        outbox: Arc<dyn OutboxStore>,
        dispatcher: Arc<OrderDispatcher>,
        metrics: Arc<Metrics>,
        config: RelayConfig,
    ) -> Self {
        Self {
            repository,
            outbox,
            dispatcher,
            metrics,
            config,
        }
    }

    pub async fn run_once(&self) -> Result<RelayResult, RepositoryError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.config.grace).unwrap_or(chrono::Duration::zero());

        let entries: Vec<OutboxEntry> = self
            .outbox
            .pending(self.config.batch_size, cutoff)
            .await?
            .into_iter()
            .filter(|entry| entry.channel.is_durable())
            .collect();

        let mut result = RelayResult {
            claimed: entries.len(),
            ..RelayResult::default()
        };

        if entries.is_empty() {
            return Ok(result);
        }

        tracing::info!(count = entries.len(), "📬 Relaying pending outbox entries");

        for mut entry in entries {
            let outcome = self.relay_entry(&mut entry).await;
            self.outbox.save(&entry).await?;

            self.metrics.record_relay_outcome(entry.channel, outcome);
            match entry.status {
                OutboxStatus::Delivered => result.delivered += 1,
                OutboxStatus::Pending => result.released += 1,
                OutboxStatus::Failed => result.failed += 1,
            }
        }

        tracing::info!(
            delivered = result.delivered,
            released = result.released,
            failed = result.failed,
            "Relay pass finished"
        );

        Ok(result)
    }

    /// Updates `entry` in place and returns the outcome label.
    async fn relay_entry(&self, entry: &mut OutboxEntry) -> &'static str {
        let order = match self.repository.get_order(entry.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::error!(
                    order_id = %entry.order_id,
                    channel = %entry.channel,
                    "Outbox entry points at a missing order, needs manual reconciliation"
                );
                entry.abandon("order not found");
                return "failed";
            }
            Err(e) => {
                // Left untouched, not counted as an attempt.
                tracing::warn!(order_id = %entry.order_id, error = %e, "Failed to load order for relay");
                return "skipped";
            }
        };

        match self.dispatcher.deliver(entry.channel, &order).await {
            Ok(()) => {
                entry.complete();
                tracing::info!(
                    order_id = %entry.order_id,
                    channel = %entry.channel,
                    attempts = entry.attempts,
                    "✅ Outbox entry delivered"
                );
                "delivered"
            }
            Err(e) => {
                entry.record_failure(e.to_string(), self.config.max_attempts);
                if entry.status == OutboxStatus::Failed {
                    tracing::error!(
                        order_id = %entry.order_id,
                        channel = %entry.channel,
                        attempts = entry.attempts,
                        error = %e,
                        "Outbox entry failed permanently, needs manual reconciliation"
                    );
                    "failed"
                } else {
                    tracing::warn!(
                        order_id = %entry.order_id,
                        channel = %entry.channel,
                        attempts = entry.attempts,
                        error = %e,
                        "Outbox redelivery failed, will retry"
                    );
                    "retry"
                }
            }
        }
    }

    /// Poll until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "🔄 Starting outbox relay"
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("🛑 Outbox relay stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "Relay pass failed");
                    }
                }
            }
        }
    }
}
