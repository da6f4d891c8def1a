use async_trait::async_trait;

use crate::domain::order::Order;
use super::errors::NotifyError;
use super::http::HttpStoreClient;

/// Pushes the full serialized order to the order store.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn notify(&self, order: &Order) -> Result<(), NotifyError>;
}

pub struct HttpOrderStoreNotifier {
    client: HttpStoreClient,
    base_url: String,
}

impl HttpOrderStoreNotifier {
    pub fn new(client: HttpStoreClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl OrderNotifier for HttpOrderStoreNotifier {
    async fn notify(&self, order: &Order) -> Result<(), NotifyError> {
        // The store names its document after the order id.
        let query = [("name", format!("order{}", order.id()))];

        self.client.post_json(&self.base_url, &query, order).await?;

        tracing::info!(
            order_id = %order.id(),
            store = %self.client.name(),
            "Order pushed to order store"
        );
        Ok(())
    }
}
