use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::aggregate::Order;
use super::value_objects::OrderId;

// ============================================================================
// Integration Payloads
// ============================================================================
//
// What leaves the service once an order is persisted:
// - OrderPlaced:  queue message, consumers deduplicate on `order_id`
// - OrderSummary: reduced document for the secondary store
//
// The primary store receives the serialized Order itself.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub order_json: String,
}

impl OrderPlaced {
    pub fn from_order(order: &Order) -> serde_json::Result<Self> {
        Ok(Self {
            order_id: order.id(),
            order_json: order.to_json()?,
        })
    }
}

/// Address and items are nested as JSON strings, matching what the
/// secondary store ingests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    pub ship_to_address: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub items: String,
}

impl OrderSummary {
    pub fn from_order(order: &Order) -> serde_json::Result<Self> {
        Ok(Self {
            id: order.id(),
            ship_to_address: serde_json::to_string(order.ship_to_address())?,
            total: order.total(),
            items: serde_json::to_string(order.order_items())?,
        })
    }
}
