use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::CatalogItemId;

pub type BasketId = i32;

/// A buyer's pending selection, loaded together with its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Basket {
    pub id: BasketId,
    pub buyer_id: String,
    pub items: Vec<BasketItem>,
}

impl Basket {
    pub fn new(id: BasketId, buyer_id: impl Into<String>) -> Self {
        Self {
            id,
            buyer_id: buyer_id.into(),
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, catalog_item_id: CatalogItemId, unit_price: Decimal, quantity: i32) -> Self {
        self.items.push(BasketItem {
            catalog_item_id,
            unit_price,
            quantity,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct catalog ids referenced by the basket, in first-seen order.
    pub fn catalog_item_ids(&self) -> Vec<CatalogItemId> {
        let mut ids = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if !ids.contains(&item.catalog_item_id) {
                ids.push(item.catalog_item_id);
            }
        }
        ids
    }
}

/// Price is the one the buyer saw when adding to the basket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketItem {
    pub catalog_item_id: CatalogItemId,
    pub unit_price: Decimal,
    pub quantity: i32,
}
