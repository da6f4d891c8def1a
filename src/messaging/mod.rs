// ============================================================================
// Messaging - order events onto a durable queue
// ============================================================================
//
// - QueueTransport: create-if-absent + send, implemented over Redpanda/Kafka
//   where a queue is a topic
// - QueuePublisher: ensures the queue, encodes the message, sends with a
//   fixed-interval retry
//
// Delivery is at-least-once: a send that timed out may still have landed,
// so a retry can duplicate it. Consumers deduplicate on `orderId`.
//
// ============================================================================

mod errors;
mod publisher;
mod redpanda;

use async_trait::async_trait;

pub use errors::{QueueError, QueuePublishFailed};
pub use publisher::{encode_message, QueuePublisher};
pub use redpanda::{RedpandaConfig, RedpandaQueue};

#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Succeeds when the queue already exists.
    async fn create_queue_if_not_exists(&self, queue: &str) -> Result<(), QueueError>;

    async fn send(&self, queue: &str, key: &str, body: &str) -> Result<(), QueueError>;
}
