use clap::Args;
use std::time::Duration;

use crate::messaging::RedpandaConfig;
use crate::service::{DispatchOptions, RelayConfig};
use crate::utils::{CircuitBreakerConfig, RetryConfig};

/// Runtime configuration. Every field is a flag with an environment
/// fallback; `.env` is loaded before parsing.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// ScyllaDB contact points, comma separated
    #[arg(long, env = "SCYLLA_NODES", value_delimiter = ',', default_value = "127.0.0.1:9042")]
    pub scylla_nodes: Vec<String>,

    #[arg(long, env = "SCYLLA_KEYSPACE", default_value = "orders")]
    pub scylla_keyspace: String,

    /// Order store endpoint; receives the full order
    #[arg(long, env = "ORDER_STORE_URL")]
    pub order_store_url: String,

    /// Secondary store endpoint; receives the order summary
    #[arg(long, env = "SECONDARY_STORE_URL")]
    pub secondary_store_url: String,

    /// Base URL for catalog picture references
    #[arg(long, env = "CATALOG_BASE_URL")]
    pub catalog_base_url: String,

    #[arg(long, env = "QUEUE_BROKERS", default_value = "localhost:9092")]
    pub queue_brokers: String,

    #[arg(long, env = "QUEUE_NAME", default_value = "orders")]
    pub queue_name: String,

    #[arg(long, env = "QUEUE_USERNAME")]
    pub queue_username: Option<String>,

    #[arg(long, env = "QUEUE_PASSWORD", hide_env_values = true)]
    pub queue_password: Option<String>,

    /// Total send attempts per publish
    #[arg(long, env = "QUEUE_RETRY_ATTEMPTS", default_value_t = 3)]
    pub queue_retry_attempts: u32,

    #[arg(long, env = "QUEUE_RETRY_DELAY_MS", default_value_t = 5000)]
    pub queue_retry_delay_ms: u64,

    #[arg(long, env = "QUEUE_TIMEOUT_MS", default_value_t = 5000)]
    pub queue_timeout_ms: u64,

    #[arg(long, env = "HTTP_TIMEOUT_MS", default_value_t = 10000)]
    pub http_timeout_ms: u64,

    /// Consecutive failures before an HTTP store's circuit opens
    #[arg(long, env = "HTTP_FAILURE_THRESHOLD", default_value_t = 5)]
    pub http_failure_threshold: u32,

    /// Run post-commit channels concurrently
    #[arg(long, env = "PARALLEL_DISPATCH")]
    pub parallel_dispatch: bool,

    #[arg(long, env = "RELAY_INTERVAL_MS", default_value_t = 10000)]
    pub relay_interval_ms: u64,

    #[arg(long, env = "RELAY_BATCH_SIZE", default_value_t = 100)]
    pub relay_batch_size: usize,

    /// Delivery attempts before an outbox entry is marked failed
    #[arg(long, env = "RELAY_MAX_ATTEMPTS", default_value_t = 5)]
    pub relay_max_attempts: u32,

    #[arg(long, env = "METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be an http(s) URL, got '{1}'")]
    NotHttp(&'static str, String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("order_store_url", &self.order_store_url),
            ("secondary_store_url", &self.secondary_store_url),
            ("catalog_base_url", &self.catalog_base_url),
        ] {
            if url.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::NotHttp(name, url.clone()));
            }
        }

        if self.scylla_nodes.iter().all(|node| node.trim().is_empty()) {
            return Err(ConfigError::Empty("scylla_nodes"));
        }
        if self.queue_brokers.trim().is_empty() {
            return Err(ConfigError::Empty("queue_brokers"));
        }
        if self.queue_name.trim().is_empty() {
            return Err(ConfigError::Empty("queue_name"));
        }

        for (name, value) in [
            ("queue_retry_attempts", u64::from(self.queue_retry_attempts)),
            ("queue_timeout_ms", self.queue_timeout_ms),
            ("http_timeout_ms", self.http_timeout_ms),
            ("relay_interval_ms", self.relay_interval_ms),
            ("relay_batch_size", self.relay_batch_size as u64),
            ("relay_max_attempts", u64::from(self.relay_max_attempts)),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.http_failure_threshold.max(1),
            ..CircuitBreakerConfig::default()
        }
    }

    pub fn queue_retry(&self) -> RetryConfig {
        RetryConfig::fixed(self.queue_retry_attempts, Duration::from_millis(self.queue_retry_delay_ms))
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }

    pub fn redpanda(&self) -> RedpandaConfig {
        RedpandaConfig {
            brokers: self.queue_brokers.clone(),
            username: self.queue_username.clone(),
            password: self.queue_password.clone(),
            send_timeout: self.queue_timeout(),
        }
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            parallel: self.parallel_dispatch,
            max_attempts: self.relay_max_attempts,
        }
    }

    pub fn relay(&self) -> RelayConfig {
        let interval = Duration::from_millis(self.relay_interval_ms);
        RelayConfig {
            interval,
            batch_size: self.relay_batch_size,
            max_attempts: self.relay_max_attempts,
            grace: interval,
        }
    }
}
