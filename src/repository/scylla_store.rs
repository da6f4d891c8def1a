use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use rust_decimal::Decimal;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::batch::Batch;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::basket::{Basket, BasketId, BasketItem};
use crate::domain::catalog::{CatalogItem, CatalogItemId};
use crate::domain::order::{Address, NewOrder, Order, OrderId, OrderItem};

use super::errors::RepositoryError;
use super::outbox::{due_oldest_first, Channel, OutboxEntry, OutboxStatus};
use super::{OrderRepository, OutboxStore};

// ============================================================================
// ScyllaDB Order Repository
// ============================================================================
//
// Tables:
// - baskets / basket_items / catalog_items: read-only from this service
// - orders:       one row per order, address and items as JSON text
// - order_outbox: one row per (order, durable channel), indexed on status
//
// `add` writes the order row and its outbox rows in one logged batch, so
// either all of them exist or none do.
//
// ============================================================================

const SCHEMA: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS baskets (id int PRIMARY KEY, buyer_id text)",
    "CREATE TABLE IF NOT EXISTS basket_items (
        basket_id int, item_id int, catalog_item_id int,
        unit_price text, quantity int,
        PRIMARY KEY (basket_id, item_id))",
    "CREATE TABLE IF NOT EXISTS catalog_items (id int PRIMARY KEY, name text, picture_uri text)",
    "CREATE TABLE IF NOT EXISTS orders (
        id uuid PRIMARY KEY, buyer_id text, order_date timestamp,
        ship_to_address text, order_items text)",
    "CREATE TABLE IF NOT EXISTS order_outbox (
        order_id uuid, channel text, status text, attempts int, last_error text,
        created_at timestamp, updated_at timestamp,
        PRIMARY KEY (order_id, channel))",
    "CREATE INDEX IF NOT EXISTS order_outbox_status ON order_outbox (status)",
];

const INSERT_ORDER: &str = "INSERT INTO orders (id, buyer_id, order_date, ship_to_address, order_items) \
     VALUES (?, ?, ?, ?, ?)";

const UPSERT_OUTBOX: &str = "INSERT INTO order_outbox \
     (order_id, channel, status, attempts, last_error, created_at, updated_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?)";

const SELECT_OUTBOX: &str = "SELECT order_id, channel, status, attempts, last_error, created_at, updated_at \
     FROM order_outbox";

type OutboxRow = (Uuid, String, String, i32, Option<String>, DateTime<Utc>, DateTime<Utc>);

type OutboxValues = (Uuid, String, String, i32, Option<String>, DateTime<Utc>, DateTime<Utc>);

pub struct ScyllaOrderRepository {
    session: Arc<Session>,
}

impl ScyllaOrderRepository {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Connect, optionally create keyspace and tables, and switch to the
    /// keyspace.
    pub async fn connect(nodes: &[String], keyspace: &str, create_schema: bool) -> anyhow::Result<Self> {
        tracing::info!(nodes = ?nodes, keyspace = %keyspace, "Connecting to ScyllaDB");

        let session: Session = SessionBuilder::new().known_nodes(nodes).build().await?;

        if create_schema {
            session
                .query_unpaged(
                    format!(
                        "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH REPLICATION = \
                         {{'class': 'SimpleStrategy', 'replication_factor': 1}}"
                    ),
                    &[],
                )
                .await?;
        }

        session.use_keyspace(keyspace, false).await?;

        if create_schema {
            for statement in SCHEMA {
                session.query_unpaged(statement, &[]).await?;
            }
            tracing::info!(keyspace = %keyspace, "Schema ensured");
        }

        Ok(Self::new(Arc::new(session)))
    }

    fn outbox_values(entry: &OutboxEntry) -> OutboxValues {
        (
            entry.order_id.as_uuid(),
            entry.channel.as_str().to_string(),
            entry.status.as_str().to_string(),
            i32::try_from(entry.attempts).unwrap_or(i32::MAX),
            entry.last_error.clone(),
            entry.created_at,
            entry.updated_at,
        )
    }

    /// Prices are stored as decimal text so any scale survives.
    fn parse_unit_price(raw: &str) -> Result<Decimal, RepositoryError> {
        Decimal::from_str(raw.trim())
            .map_err(|e| RepositoryError::MalformedRow(format!("unit price '{raw}': {e}")))
    }

    fn outbox_from_row(row: OutboxRow) -> Result<OutboxEntry, RepositoryError> {
        let (order_id, channel, status, attempts, last_error, created_at, updated_at) = row;

        Ok(OutboxEntry {
            order_id: OrderId(order_id),
            channel: channel.parse().map_err(RepositoryError::MalformedRow)?,
            status: status.parse().map_err(RepositoryError::MalformedRow)?,
            attempts: u32::try_from(attempts).unwrap_or(0),
            last_error,
            created_at,
            updated_at,
        })
    }
}

#[async_trait]
impl OrderRepository for ScyllaOrderRepository {
    async fn find_basket_with_items(&self, basket_id: BasketId) -> Result<Option<Basket>, RepositoryError> {
        let buyer = self
            .session
            .query_unpaged("SELECT buyer_id FROM baskets WHERE id = ?", (basket_id,))
            .await
            .map_err(RepositoryError::unavailable)?
            .into_rows_result()
            .map_err(RepositoryError::unavailable)?
            .maybe_first_row::<(String,)>()
            .map_err(RepositoryError::unavailable)?;

        let Some((buyer_id,)) = buyer else {
            return Ok(None);
        };

        let rows_result = self
            .session
            .query_unpaged(
                "SELECT catalog_item_id, unit_price, quantity FROM basket_items WHERE basket_id = ?",
                (basket_id,),
            )
            .await
            .map_err(RepositoryError::unavailable)?
            .into_rows_result()
            .map_err(RepositoryError::unavailable)?;

        let mut items = Vec::new();
        for row in rows_result
            .rows::<(i32, String, i32)>()
            .map_err(RepositoryError::unavailable)?
        {
            let (catalog_item_id, unit_price, quantity) = row.map_err(RepositoryError::unavailable)?;
            items.push(BasketItem {
                catalog_item_id,
                unit_price: Self::parse_unit_price(&unit_price)?,
                quantity,
            });
        }

        tracing::debug!(basket_id = basket_id, item_count = items.len(), "Loaded basket");

        Ok(Some(Basket {
            id: basket_id,
            buyer_id,
            items,
        }))
    }

    async fn find_catalog_items(&self, ids: &[CatalogItemId]) -> Result<Vec<CatalogItem>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows_result = self
            .session
            .query_unpaged(
                "SELECT id, name, picture_uri FROM catalog_items WHERE id IN ?",
                (ids.to_vec(),),
            )
            .await
            .map_err(RepositoryError::unavailable)?
            .into_rows_result()
            .map_err(RepositoryError::unavailable)?;

        let mut items = Vec::with_capacity(ids.len());
        for row in rows_result
            .rows::<(i32, String, String)>()
            .map_err(RepositoryError::unavailable)?
        {
            let (id, name, picture_uri) = row.map_err(RepositoryError::unavailable)?;
            items.push(CatalogItem { id, name, picture_uri });
        }

        Ok(items)
    }

    async fn add(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let order = order.into_persisted(OrderId::generate());
        let address_json = serde_json::to_string(order.ship_to_address())?;
        let items_json = serde_json::to_string(order.order_items())?;

        let [first, second] = Channel::DURABLE.map(|channel| OutboxEntry::pending(order.id(), channel));

        let mut batch = Batch::default();
        batch.append_statement(INSERT_ORDER);
        batch.append_statement(UPSERT_OUTBOX);
        batch.append_statement(UPSERT_OUTBOX);

        tracing::debug!(
            order_id = %order.id(),
            item_count = order.order_items().len(),
            "Persisting order with outbox entries"
        );

        self.session
            .batch(
                &batch,
                (
                    (
                        order.id().as_uuid(),
                        order.buyer_id().to_string(),
                        order.order_date(),
                        address_json,
                        items_json,
                    ),
                    Self::outbox_values(&first),
                    Self::outbox_values(&second),
                ),
            )
            .await
            .map_err(RepositoryError::unavailable)?;

        tracing::info!(order_id = %order.id(), "Persisted order and outbox entries");

        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = self
            .session
            .query_unpaged(
                "SELECT buyer_id, order_date, ship_to_address, order_items FROM orders WHERE id = ?",
                (id.as_uuid(),),
            )
            .await
            .map_err(RepositoryError::unavailable)?
            .into_rows_result()
            .map_err(RepositoryError::unavailable)?
            .maybe_first_row::<(String, DateTime<Utc>, String, String)>()
            .map_err(RepositoryError::unavailable)?;

        let Some((buyer_id, order_date, address_json, items_json)) = row else {
            return Ok(None);
        };

        let address: Address = serde_json::from_str(&address_json)?;
        let items: Vec<OrderItem> = serde_json::from_str(&items_json)?;

        Ok(Some(Order::restore(id, buyer_id, order_date, address, items)?))
    }
}

#[async_trait]
impl OutboxStore for ScyllaOrderRepository {
    async fn pending(&self, limit: usize, updated_before: DateTime<Utc>) -> Result<Vec<OutboxEntry>, RepositoryError> {
        // The status index has no global order, so every due row is paged in
        // and the oldest are picked here.
        let mut rows = self
            .session
            .query_iter(
                format!("{SELECT_OUTBOX} WHERE status = ? AND updated_at <= ? ALLOW FILTERING"),
                (OutboxStatus::Pending.as_str(), updated_before),
            )
            .await
            .map_err(RepositoryError::unavailable)?
            .rows_stream::<OutboxRow>()
            .map_err(RepositoryError::unavailable)?;

        let mut entries = Vec::new();
        while let Some(row) = rows.try_next().await.map_err(RepositoryError::unavailable)? {
            entries.push(Self::outbox_from_row(row)?);
        }

        Ok(due_oldest_first(entries, limit, updated_before))
    }

    async fn get(&self, order_id: OrderId, channel: Channel) -> Result<Option<OutboxEntry>, RepositoryError> {
        let row = self
            .session
            .query_unpaged(
                format!("{SELECT_OUTBOX} WHERE order_id = ? AND channel = ?"),
                (order_id.as_uuid(), channel.as_str()),
            )
            .await
            .map_err(RepositoryError::unavailable)?
            .into_rows_result()
            .map_err(RepositoryError::unavailable)?
            .maybe_first_row::<OutboxRow>()
            .map_err(RepositoryError::unavailable)?;

        row.map(Self::outbox_from_row).transpose()
    }

    async fn save(&self, entry: &OutboxEntry) -> Result<(), RepositoryError> {
        self.session
            .query_unpaged(UPSERT_OUTBOX, Self::outbox_values(entry))
            .await
            .map_err(RepositoryError::unavailable)?;

        tracing::debug!(
            order_id = %entry.order_id,
            channel = %entry.channel,
            status = entry.status.as_str(),
            attempts = entry.attempts,
            "Saved outbox entry"
        );

        Ok(())
    }
}
