use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::RwLock;

use crate::domain::basket::{Basket, BasketId};
use crate::domain::catalog::{CatalogItem, CatalogItemId};
use crate::domain::order::{NewOrder, Order, OrderId};

use super::errors::RepositoryError;
use super::outbox::{due_oldest_first, Channel, OutboxEntry};
use super::{OrderRepository, OutboxStore};

#[derive(Default)]
struct Tables {
    baskets: HashMap<BasketId, Basket>,
    catalog: HashMap<CatalogItemId, CatalogItem>,
    orders: HashMap<OrderId, Order>,
    outbox: HashMap<(OrderId, Channel), OutboxEntry>,
}

/// Process-local store. One lock covers every table, so an order and its
/// outbox entries become visible together.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    tables: RwLock<Tables>,
    add_calls: AtomicU32,
    reject_adds: AtomicBool,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_basket(&self, basket: Basket) {
        self.tables.write().await.baskets.insert(basket.id, basket);
    }

    pub async fn insert_catalog_item(&self, item: CatalogItem) {
        self.tables.write().await.catalog.insert(item.id, item);
    }

    /// Make every following `add` fail, as if the store were down.
    pub fn reject_adds(&self, reject: bool) {
        self.reject_adds.store(reject, Ordering::SeqCst);
    }

    pub fn add_calls(&self) -> u32 {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_basket_with_items(&self, basket_id: BasketId) -> Result<Option<Basket>, RepositoryError> {
        Ok(self.tables.read().await.baskets.get(&basket_id).cloned())
    }

    async fn find_catalog_items(&self, ids: &[CatalogItemId]) -> Result<Vec<CatalogItem>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.catalog.get(id).cloned()).collect())
    }

    async fn add(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);

        if self.reject_adds.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("in-memory store rejecting writes".to_string()));
        }

        let order = order.into_persisted(OrderId::generate());

        let mut tables = self.tables.write().await;
        for channel in Channel::DURABLE {
            tables
                .outbox
                .insert((order.id(), channel), OutboxEntry::pending(order.id(), channel));
        }
        tables.orders.insert(order.id(), order.clone());

        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }
}

#[async_trait]
impl OutboxStore for InMemoryOrderRepository {
    async fn pending(&self, limit: usize, updated_before: DateTime<Utc>) -> Result<Vec<OutboxEntry>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(due_oldest_first(tables.outbox.values().cloned(), limit, updated_before))
    }

    async fn get(&self, order_id: OrderId, channel: Channel) -> Result<Option<OutboxEntry>, RepositoryError> {
        Ok(self.tables.read().await.outbox.get(&(order_id, channel)).cloned())
    }

    async fn save(&self, entry: &OutboxEntry) -> Result<(), RepositoryError> {
        self.tables
            .write()
            .await
            .outbox
            .insert((entry.order_id, entry.channel), entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Address, CatalogItemOrdered, OrderItem};
    use crate::repository::OutboxStatus;
    use rust_decimal::Decimal;

    fn draft() -> NewOrder {
        let item = OrderItem::new(
            CatalogItemOrdered {
                catalog_item_id: 1,
                product_name: "Cup".to_string(),
                picture_uri: "https://catalog.example/1.png".to_string(),
            },
            Decimal::ONE,
            1,
        )
        .unwrap();
        NewOrder::new("B1", Address::new("s", "c", "st", "co", "z"), vec![item]).unwrap()
    }

    #[tokio::test]
    async fn test_add_assigns_id_and_writes_outbox() {
        let repo = InMemoryOrderRepository::new();
        let order = repo.add(draft()).await.unwrap();

        assert_eq!(repo.get_order(order.id()).await.unwrap(), Some(order.clone()));
        for channel in Channel::DURABLE {
            let entry = repo.get(order.id(), channel).await.unwrap().unwrap();
            assert_eq!(entry.status, OutboxStatus::Pending);
        }
        assert!(repo.get(order.id(), Channel::SecondaryStore).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_each_add_gets_a_distinct_id() {
        let repo = InMemoryOrderRepository::new();
        let a = repo.add(draft()).await.unwrap();
        let b = repo.add(draft()).await.unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(repo.order_count().await, 2);
    }

    #[tokio::test]
    async fn test_rejected_add_stores_nothing() {
        let repo = InMemoryOrderRepository::new();
        repo.reject_adds(true);

        assert!(repo.add(draft()).await.is_err());
        assert_eq!(repo.add_calls(), 1);
        assert_eq!(repo.order_count().await, 0);
        assert!(repo.pending(10, Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_lookup_skips_missing_ids() {
        let repo = InMemoryOrderRepository::new();
        repo.insert_catalog_item(CatalogItem::new(1, "Cup", "1.png")).await;

        let found = repo.find_catalog_items(&[1, 2]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[tokio::test]
    async fn test_pending_excludes_delivered() {
        let repo = InMemoryOrderRepository::new();
        let order = repo.add(draft()).await.unwrap();

        let mut entry = repo.get(order.id(), Channel::Queue).await.unwrap().unwrap();
        entry.complete();
        repo.save(&entry).await.unwrap();

        let pending = repo.pending(10, Utc::now()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].channel, Channel::OrderStore);
    }

    #[tokio::test]
    async fn test_pending_honours_cutoff() {
        let repo = InMemoryOrderRepository::new();
        let order = repo.add(draft()).await.unwrap();
        let entry = repo.get(order.id(), Channel::Queue).await.unwrap().unwrap();

        let before = repo.pending(10, entry.updated_at - chrono::Duration::seconds(1)).await.unwrap();
        assert!(before.is_empty());
        assert_eq!(repo.pending(10, entry.updated_at).await.unwrap().len(), 2);
    }
}
