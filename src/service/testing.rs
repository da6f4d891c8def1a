use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::basket::Basket;
use crate::domain::catalog::CatalogItem;
use crate::domain::order::{Address, CatalogItemOrdered, NewOrder, Order, OrderId, OrderItem, OrderPlaced, OrderSummary};
use crate::messaging::{QueueError, QueuePublisher, QueueTransport};
use crate::metrics::Metrics;
use crate::notifiers::{NotifyError, OrderNotifier, SecondaryStoreNotifier, SummaryStore};
use crate::repository::{InMemoryOrderRepository, OrderRepository};
use crate::utils::RetryConfig;

use super::dispatcher::OrderDispatcher;
use super::order_service::{DispatchOptions, OrderService};
use super::uri::CatalogUriComposer;

pub const QUEUE_ATTEMPTS: u32 = 3;

#[derive(Default)]
pub struct RecordingOrderStore {
    pub fail: AtomicBool,
    pub hang: AtomicBool,
    received: Mutex<Vec<OrderId>>,
}

impl RecordingOrderStore {
    pub fn received(&self) -> Vec<OrderId> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderNotifier for RecordingOrderStore {
    async fn notify(&self, order: &Order) -> Result<(), NotifyError> {
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Status {
                url: "http://order-store".to_string(),
                status: 500,
                body: "boom".to_string(),
            });
        }
        self.received.lock().unwrap().push(order.id());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSummaryStore {
    pub fail: AtomicBool,
    received: Mutex<Vec<OrderSummary>>,
}

impl RecordingSummaryStore {
    pub fn received(&self) -> Vec<OrderSummary> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummaryStore for RecordingSummaryStore {
    async fn push_summary(&self, summary: &OrderSummary) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Request {
                url: "http://secondary-store".to_string(),
                message: "connection refused".to_string(),
            });
        }
        self.received.lock().unwrap().push(summary.clone());
        Ok(())
    }
}

/// Queue fake. `down` fails every send; `failures_left` fails that many
/// sends and then recovers.
#[derive(Default)]
pub struct RecordingQueue {
    pub down: AtomicBool,
    pub failures_left: AtomicU32,
    pub sends: AtomicU32,
    messages: Mutex<Vec<String>>,
}

impl RecordingQueue {
    pub fn message_order_ids(&self) -> Vec<OrderId> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|body| {
                let json = BASE64.decode(body).unwrap();
                let message: OrderPlaced = serde_json::from_slice(&json).unwrap();
                message.order_id
            })
            .collect()
    }
}

#[async_trait]
impl QueueTransport for RecordingQueue {
    async fn create_queue_if_not_exists(&self, _queue: &str) -> Result<(), QueueError> {
        Ok(())
    }

    async fn send(&self, _queue: &str, _key: &str, body: &str) -> Result<(), QueueError> {
        self.sends.fetch_add(1, Ordering::SeqCst);

        let flaky = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if self.down.load(Ordering::SeqCst) || flaky {
            return Err(QueueError::Transport {
                message: "broker unreachable".to_string(),
                transient: true,
            });
        }

        self.messages.lock().unwrap().push(body.to_string());
        Ok(())
    }
}

/// In-memory store seeded with basket 42 (two items, total 25.00) and
/// catalog items 1 and 2, wired to recording fakes.
pub struct Harness {
    pub repo: Arc<InMemoryOrderRepository>,
    pub order_store: Arc<RecordingOrderStore>,
    pub summaries: Arc<RecordingSummaryStore>,
    pub queue: Arc<RecordingQueue>,
    pub metrics: Arc<Metrics>,
    pub dispatcher: Arc<OrderDispatcher>,
}

impl Harness {
    pub async fn new() -> Self {
        let repo = Arc::new(InMemoryOrderRepository::new());
        repo.insert_catalog_item(CatalogItem::new(1, ".NET Bot Black Sweatshirt", "images/products/1.png"))
            .await;
        repo.insert_catalog_item(CatalogItem::new(2, ".NET Black & White Mug", "images/products/2.png"))
            .await;
        repo.insert_basket(
            Basket::new(42, "B1")
                .with_item(1, Decimal::new(1000, 2), 2)
                .with_item(2, Decimal::new(500, 2), 1),
        )
        .await;

        let metrics = Arc::new(Metrics::new().unwrap());
        let order_store = Arc::new(RecordingOrderStore::default());
        let summaries = Arc::new(RecordingSummaryStore::default());
        let queue = Arc::new(RecordingQueue::default());

        let dispatcher = Arc::new(OrderDispatcher::new(
            order_store.clone(),
            SecondaryStoreNotifier::new(summaries.clone(), metrics.clone()),
            QueuePublisher::new(
                queue.clone(),
                "eshop-orders",
                RetryConfig::fixed(QUEUE_ATTEMPTS, Duration::from_millis(5)),
                Duration::from_millis(200),
                metrics.clone(),
            ),
            Duration::from_millis(100),
            metrics.clone(),
        ));

        Self {
            repo,
            order_store,
            summaries,
            queue,
            metrics,
            dispatcher,
        }
    }

    pub fn service(&self, parallel: bool) -> OrderService {
        OrderService::new(
            self.repo.clone(),
            self.repo.clone(),
            Arc::new(CatalogUriComposer::new("https://shop.example")),
            self.dispatcher.clone(),
            self.metrics.clone(),
            DispatchOptions {
                parallel,
                max_attempts: 5,
            },
        )
    }

    pub fn sample_order(&self) -> Order {
        sample_draft().into_persisted(OrderId::generate())
    }

    /// Persist without dispatching, leaving both outbox entries pending.
    pub async fn persist_sample_order(&self) -> Order {
        self.repo.add(sample_draft()).await.unwrap()
    }
}

fn sample_draft() -> NewOrder {
    let item = OrderItem::new(
        CatalogItemOrdered {
            catalog_item_id: 1,
            product_name: ".NET Bot Black Sweatshirt".to_string(),
            picture_uri: "https://shop.example/images/products/1.png".to_string(),
        },
        Decimal::new(1000, 2),
        2,
    )
    .unwrap();

    NewOrder::new("B1", Address::new("123 Main St.", "Kent", "OH", "United States", "44240"), vec![item]).unwrap()
}
