use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::order::{Order, OrderPlaced};
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, RetryConfig, RetryOutcome};

use super::errors::{QueueError, QueuePublishFailed};
use super::QueueTransport;

/// Base64 of the JSON `{ orderId, orderJson }` message.
pub fn encode_message(order: &Order) -> Result<String, QueueError> {
    let message = OrderPlaced::from_order(order).map_err(|e| QueueError::Encoding(e.to_string()))?;
    let json = serde_json::to_string(&message).map_err(|e| QueueError::Encoding(e.to_string()))?;
    Ok(BASE64.encode(json))
}

pub struct QueuePublisher {
    transport: Arc<dyn QueueTransport>,
    queue_name: String,
    retry: RetryConfig,
    send_timeout: Duration,
    queue_ready: AtomicBool,
    metrics: Arc<Metrics>,
}

impl QueuePublisher {
    pub fn new(
        transport: Arc<dyn QueueTransport>,
        queue_name: impl Into<String>,
        retry: RetryConfig,
        send_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            transport,
            queue_name: queue_name.into(),
            retry,
            send_timeout,
            queue_ready: AtomicBool::new(false),
            metrics,
        }
    }

    /// Ensure the queue, then send the order event with retry.
    pub async fn publish(&self, order: &Order) -> Result<(), QueuePublishFailed> {
        let order_id = order.id();
        let body = encode_message(order).map_err(|source| QueuePublishFailed { attempts: 0, source })?;
        let key = order_id.to_string();

        let outcome = retry_on_transient(&self.retry, |attempt| {
            let body = body.as_str();
            let key = key.as_str();
            async move {
                self.metrics.record_queue_attempt(attempt);
                tracing::debug!(order_id = %order_id, attempt = attempt, queue = %self.queue_name, "Sending order event");

                self.ensure_queue().await?;
                self.send_with_timeout(key, body).await
            }
        })
        .await;

        match outcome {
            RetryOutcome::Success { attempts, .. } => {
                tracing::info!(
                    order_id = %order_id,
                    queue = %self.queue_name,
                    attempts = attempts,
                    "Order event enqueued"
                );
                Ok(())
            }
            RetryOutcome::Exhausted { error, attempts } | RetryOutcome::Permanent { error, attempts } => {
                tracing::error!(
                    order_id = %order_id,
                    queue = %self.queue_name,
                    attempts = attempts,
                    error = %error,
                    "Failed to enqueue order event"
                );
                Err(QueuePublishFailed { attempts, source: error })
            }
        }
    }

    /// Create-if-absent, skipped once it has succeeded for this publisher.
    async fn ensure_queue(&self) -> Result<(), QueueError> {
        if self.queue_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        self.transport.create_queue_if_not_exists(&self.queue_name).await?;
        self.queue_ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn send_with_timeout(&self, key: &str, body: &str) -> Result<(), QueueError> {
        tokio::time::timeout(self.send_timeout, self.transport.send(&self.queue_name, key, body))
            .await
            .map_err(|_| QueueError::Timeout(self.send_timeout.as_millis() as u64))?
    }
}
