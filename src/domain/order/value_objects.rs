use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::catalog::CatalogItemId;
use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Order identity, assigned once by the repository on persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    /// Time-ordered id so orders sort by creation.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Shipping address. Opaque to the workflow beyond serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        country: impl Into<String>,
        zip_code: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            state: state.into(),
            country: country.into(),
            zip_code: zip_code.into(),
        }
    }
}

/// Snapshot of the catalog item taken when the order was placed. Later
/// catalog edits never reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemOrdered {
    pub catalog_item_id: CatalogItemId,
    pub product_name: String,
    pub picture_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    item_ordered: CatalogItemOrdered,
    #[serde(with = "rust_decimal::serde::float")]
    unit_price: Decimal,
    units: u32,
}

impl OrderItem {
    pub fn new(item_ordered: CatalogItemOrdered, unit_price: Decimal, units: i32) -> Result<Self, OrderError> {
        if unit_price < Decimal::ZERO {
            return Err(OrderError::NegativeUnitPrice {
                catalog_item_id: item_ordered.catalog_item_id,
                unit_price,
            });
        }

        let units = u32::try_from(units)
            .ok()
            .filter(|units| *units >= 1)
            .ok_or(OrderError::InvalidQuantity {
                catalog_item_id: item_ordered.catalog_item_id,
                quantity: units,
            })?;

        Ok(Self {
            item_ordered,
            unit_price,
            units,
        })
    }

    pub fn item_ordered(&self) -> &CatalogItemOrdered {
        &self.item_ordered
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn units(&self) -> u32 {
        self.units
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.units)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
