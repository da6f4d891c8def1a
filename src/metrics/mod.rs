mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

use crate::repository::Channel;

pub use server::start_metrics_server;

// ============================================================================
// Metrics - Prometheus metrics for the order workflow
// ============================================================================
//
// - Orders created / aborted before the commit point
// - Post-commit dispatch failures per channel
// - Queue publish attempts (by attempt number)
// - Outbox relay outcomes
// - End-to-end create_order latency
//
// Scraped via /metrics on the metrics server.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_created: IntCounter,
    pub orders_aborted: IntCounterVec,
    pub order_creation_duration: Histogram,

    pub dispatch_failures: IntCounterVec,
    pub queue_publish_attempts: IntCounterVec,

    pub outbox_relayed: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Orders persisted")?;
        registry.register(Box::new(orders_created.clone()))?;

        let orders_aborted = IntCounterVec::new(
            Opts::new("order_creation_aborted_total", "Order creations aborted before commit"),
            &["reason"],
        )?;
        registry.register(Box::new(orders_aborted.clone()))?;

        let order_creation_duration = Histogram::with_opts(
            HistogramOpts::new("order_creation_duration_seconds", "End-to-end create_order duration")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0]),
        )?;
        registry.register(Box::new(order_creation_duration.clone()))?;

        let dispatch_failures = IntCounterVec::new(
            Opts::new("dispatch_failures_total", "Post-commit dispatch failures"),
            &["channel"],
        )?;
        registry.register(Box::new(dispatch_failures.clone()))?;

        let queue_publish_attempts = IntCounterVec::new(
            Opts::new("queue_publish_attempts_total", "Queue send attempts"),
            &["attempt"],
        )?;
        registry.register(Box::new(queue_publish_attempts.clone()))?;

        let outbox_relayed = IntCounterVec::new(
            Opts::new("outbox_relayed_total", "Outbox entries processed by the relay"),
            &["channel", "outcome"],
        )?;
        registry.register(Box::new(outbox_relayed.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            orders_aborted,
            order_creation_duration,
            dispatch_failures,
            queue_publish_attempts,
            outbox_relayed,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_order_created(&self, duration_secs: f64) {
        self.orders_created.inc();
        self.order_creation_duration.observe(duration_secs);
    }

    pub fn record_order_aborted(&self, reason: &str) {
        self.orders_aborted.with_label_values(&[reason]).inc();
    }

    pub fn record_dispatch_failure(&self, channel: Channel) {
        self.dispatch_failures.with_label_values(&[channel.as_str()]).inc();
    }

    pub fn dispatch_failure_count(&self, channel: Channel) -> u64 {
        self.dispatch_failures.with_label_values(&[channel.as_str()]).get()
    }

    pub fn record_queue_attempt(&self, attempt: u32) {
        self.queue_publish_attempts
            .with_label_values(&[attempt.to_string().as_str()])
            .inc();
    }

    pub fn record_relay_outcome(&self, channel: Channel, outcome: &str) {
        self.outbox_relayed
            .with_label_values(&[channel.as_str(), outcome])
            .inc();
    }
}
