use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::order::{Order, OrderSummary};
use crate::metrics::Metrics;
use crate::repository::Channel;
use super::errors::NotifyError;
use super::http::HttpStoreClient;

#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn push_summary(&self, summary: &OrderSummary) -> Result<(), NotifyError>;
}

pub struct HttpSummaryStore {
    client: HttpStoreClient,
    url: String,
}

impl HttpSummaryStore {
    pub fn new(client: HttpStoreClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SummaryStore for HttpSummaryStore {
    async fn push_summary(&self, summary: &OrderSummary) -> Result<(), NotifyError> {
        self.client.post_json(&self.url, &[], summary).await
    }
}

/// Best-effort push of the order summary. Never fails the caller.
pub struct SecondaryStoreNotifier {
    store: Arc<dyn SummaryStore>,
    metrics: Arc<Metrics>,
}

impl SecondaryStoreNotifier {
    pub fn new(store: Arc<dyn SummaryStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Returns whether the summary was delivered.
    pub async fn notify_best_effort(&self, order: &Order) -> bool {
        match self.push(order).await {
            Ok(()) => {
                tracing::info!(order_id = %order.id(), "Order summary pushed to secondary store");
                true
            }
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id(),
                    error = %e,
                    "Secondary store notification failed, continuing"
                );
                self.metrics.record_dispatch_failure(Channel::SecondaryStore);
                false
            }
        }
    }

    async fn push(&self, order: &Order) -> Result<(), NotifyError> {
        let summary = OrderSummary::from_order(order)?;
        self.store.push_summary(&summary).await
    }
}
