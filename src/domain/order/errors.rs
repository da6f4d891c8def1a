use rust_decimal::Decimal;

use crate::domain::catalog::CatalogItemId;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid quantity {quantity} for catalog item {catalog_item_id}")]
    InvalidQuantity {
        catalog_item_id: CatalogItemId,
        quantity: i32,
    },

    #[error("Negative unit price {unit_price} for catalog item {catalog_item_id}")]
    NegativeUnitPrice {
        catalog_item_id: CatalogItemId,
        unit_price: Decimal,
    },
}
