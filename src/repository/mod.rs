// ============================================================================
// Repository Layer
// ============================================================================
//
// Capability interfaces the workflow depends on, never a concrete store:
// - OrderRepository: basket/catalog reads and the order commit point
// - OutboxStore:     per-channel dispatch ledger written with the order
//
// Backends:
// - memory/ - process-local, used by tests and local runs
// - scylla_store/ - ScyllaDB, order + outbox rows in one logged batch
//
// ============================================================================

mod errors;
mod memory;
mod outbox;
mod scylla_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::basket::{Basket, BasketId};
use crate::domain::catalog::{CatalogItem, CatalogItemId};
use crate::domain::order::{NewOrder, Order, OrderId};

pub use errors::RepositoryError;
pub use memory::InMemoryOrderRepository;
pub use outbox::{Channel, OutboxEntry, OutboxStatus};
pub use scylla_store::ScyllaOrderRepository;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Basket with its items, or `None` when no basket has this id.
    async fn find_basket_with_items(&self, basket_id: BasketId) -> Result<Option<Basket>, RepositoryError>;

    /// Catalog items matching `ids`. Missing ids are simply absent.
    async fn find_catalog_items(&self, ids: &[CatalogItemId]) -> Result<Vec<CatalogItem>, RepositoryError>;

    /// Commit point. Assigns the order id and durably stores the order
    /// together with a pending outbox entry per durable channel.
    async fn add(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;
}

#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Up to `limit` pending entries last updated at or before
    /// `updated_before`, oldest first. The cutoff is applied before the limit.
    async fn pending(&self, limit: usize, updated_before: DateTime<Utc>) -> Result<Vec<OutboxEntry>, RepositoryError>;

    async fn get(&self, order_id: OrderId, channel: Channel) -> Result<Option<OutboxEntry>, RepositoryError>;

    /// Persist the entry's current status, attempts and last error.
    async fn save(&self, entry: &OutboxEntry) -> Result<(), RepositoryError>;
}
