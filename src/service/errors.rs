use crate::domain::basket::BasketId;
use crate::domain::catalog::CatalogItemId;
use crate::domain::order::{OrderError, OrderId};
use crate::messaging::QueuePublishFailed;
use crate::notifiers::NotifyError;
use crate::repository::{Channel, RepositoryError};

/// Why an order was not created. Every variant happens before the commit
/// point, so nothing was persisted or sent.
#[derive(Debug, thiserror::Error)]
pub enum CreateOrderError {
    #[error("Basket {0} not found")]
    BasketNotFound(BasketId),

    #[error("Basket {0} has no items")]
    EmptyBasket(BasketId),

    #[error("Catalog items missing: {0:?}")]
    CatalogItemMissing(Vec<CatalogItemId>),

    #[error("Invalid basket item: {0}")]
    InvalidItem(#[from] OrderError),

    #[error("Basket or catalog lookup failed: {0}")]
    LookupFailed(#[source] RepositoryError),

    #[error("Failed to persist order: {0}")]
    PersistenceFailed(#[source] RepositoryError),
}

impl CreateOrderError {
    /// Metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            CreateOrderError::BasketNotFound(_) => "basket_not_found",
            CreateOrderError::EmptyBasket(_) => "empty_basket",
            CreateOrderError::CatalogItemMissing(_) => "catalog_item_missing",
            CreateOrderError::InvalidItem(_) => "invalid_item",
            CreateOrderError::LookupFailed(_) => "lookup_failed",
            CreateOrderError::PersistenceFailed(_) => "persistence_failed",
        }
    }
}

/// A downstream that did not take a committed order. Reported as a
/// warning; the order stays created.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("Order store notification failed for order {order_id}: {message}")]
    PrimaryNotificationFailed { order_id: OrderId, message: String },

    #[error("Queue publish failed for order {order_id}: {source}")]
    QueuePublishFailed {
        order_id: OrderId,
        #[source]
        source: QueuePublishFailed,
    },
}

impl DispatchError {
    pub(crate) fn primary(order_id: OrderId, err: &NotifyError) -> Self {
        DispatchError::PrimaryNotificationFailed {
            order_id,
            message: err.to_string(),
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            DispatchError::PrimaryNotificationFailed { .. } => Channel::OrderStore,
            DispatchError::QueuePublishFailed { .. } => Channel::Queue,
        }
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            DispatchError::PrimaryNotificationFailed { order_id, .. }
            | DispatchError::QueuePublishFailed { order_id, .. } => *order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::QueueError;

    #[test]
    fn test_reason_labels() {
        assert_eq!(CreateOrderError::BasketNotFound(1).reason(), "basket_not_found");
        assert_eq!(CreateOrderError::EmptyBasket(1).reason(), "empty_basket");
        assert_eq!(CreateOrderError::CatalogItemMissing(vec![3]).reason(), "catalog_item_missing");
        assert_eq!(
            CreateOrderError::PersistenceFailed(RepositoryError::Unavailable("down".into())).reason(),
            "persistence_failed"
        );
    }

    #[test]
    fn test_dispatch_error_maps_to_channel() {
        let order_id = OrderId::generate();
        let queue = DispatchError::QueuePublishFailed {
            order_id,
            source: QueuePublishFailed {
                attempts: 3,
                source: QueueError::Timeout(5000),
            },
        };
        let primary = DispatchError::primary(order_id, &NotifyError::CircuitOpen("order-store".into()));

        assert_eq!(queue.channel(), Channel::Queue);
        assert_eq!(primary.channel(), Channel::OrderStore);
        assert_eq!(primary.order_id(), order_id);
    }
}
