use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::OrderError;
use super::value_objects::{Address, OrderId, OrderItem};

// ============================================================================
// Order Aggregate
// ============================================================================
//
// Two shapes of the same aggregate:
// - NewOrder: assembled from a basket, not yet persisted, has no identity
// - Order:    returned by the repository, identity fixed for its lifetime
//
// The item list is non-empty and cannot be changed after construction.
// The total is always derived from the items, never stored.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    buyer_id: String,
    ship_to_address: Address,
    order_items: Vec<OrderItem>,
    order_date: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(
        buyer_id: impl Into<String>,
        ship_to_address: Address,
        order_items: Vec<OrderItem>,
    ) -> Result<Self, OrderError> {
        if order_items.is_empty() {
            return Err(OrderError::EmptyItems);
        }

        Ok(Self {
            buyer_id: buyer_id.into(),
            ship_to_address,
            order_items,
            // Storage keeps milliseconds only.
            order_date: Utc::now().trunc_subsecs(3),
        })
    }

    pub fn buyer_id(&self) -> &str {
        &self.buyer_id
    }

    pub fn order_items(&self) -> &[OrderItem] {
        &self.order_items
    }

    pub fn total(&self) -> Decimal {
        total_of(&self.order_items)
    }

    /// Consumes the draft, so an identity can only be attached once.
    pub fn into_persisted(self, id: OrderId) -> Order {
        Order {
            id,
            buyer_id: self.buyer_id,
            order_date: self.order_date,
            ship_to_address: self.ship_to_address,
            order_items: self.order_items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    buyer_id: String,
    order_date: DateTime<Utc>,
    ship_to_address: Address,
    order_items: Vec<OrderItem>,
}

impl Order {
    /// Rebuild a persisted order from storage.
    pub fn restore(
        id: OrderId,
        buyer_id: String,
        order_date: DateTime<Utc>,
        ship_to_address: Address,
        order_items: Vec<OrderItem>,
    ) -> Result<Self, OrderError> {
        if order_items.is_empty() {
            return Err(OrderError::EmptyItems);
        }

        Ok(Self {
            id,
            buyer_id,
            order_date,
            ship_to_address,
            order_items,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn buyer_id(&self) -> &str {
        &self.buyer_id
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn ship_to_address(&self) -> &Address {
        &self.ship_to_address
    }

    pub fn order_items(&self) -> &[OrderItem] {
        &self.order_items
    }

    pub fn total(&self) -> Decimal {
        total_of(&self.order_items)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn total_of(items: &[OrderItem]) -> Decimal {
    items.iter().map(OrderItem::line_total).sum()
}
