use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::basket::BasketId;
use crate::domain::catalog::{CatalogItem, CatalogItemId};
use crate::domain::order::{Address, CatalogItemOrdered, NewOrder, OrderItem};
use crate::repository::OrderRepository;

use super::errors::CreateOrderError;
use super::uri::UriComposer;

// ============================================================================
// Order Assembler
// ============================================================================
//
// Basket + catalog snapshots -> NewOrder. Two reads, no writes, no network
// side effects. Prices come from the basket, names and pictures from the
// catalog as it is right now.
//
// ============================================================================

pub struct OrderAssembler {
    repository: Arc<dyn OrderRepository>,
    uri_composer: Arc<dyn UriComposer>,
}

impl OrderAssembler {
    pub fn new(repository: Arc<dyn OrderRepository>, uri_composer: Arc<dyn UriComposer>) -> Self {
        Self {
            repository,
            uri_composer,
        }
    }

    pub async fn assemble(&self, basket_id: BasketId, ship_to: Address) -> Result<NewOrder, CreateOrderError> {
        let basket = self
            .repository
            .find_basket_with_items(basket_id)
            .await
            .map_err(CreateOrderError::LookupFailed)?
            .ok_or(CreateOrderError::BasketNotFound(basket_id))?;

        if basket.is_empty() {
            return Err(CreateOrderError::EmptyBasket(basket_id));
        }

        let ids = basket.catalog_item_ids();
        let catalog: HashMap<CatalogItemId, CatalogItem> = self
            .repository
            .find_catalog_items(&ids)
            .await
            .map_err(CreateOrderError::LookupFailed)?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let missing: Vec<CatalogItemId> = ids.into_iter().filter(|id| !catalog.contains_key(id)).collect();
        if !missing.is_empty() {
            tracing::warn!(basket_id = basket_id, missing = ?missing, "Basket references unknown catalog items");
            return Err(CreateOrderError::CatalogItemMissing(missing));
        }

        let mut items = Vec::with_capacity(basket.items.len());
        for basket_item in &basket.items {
            let Some(catalog_item) = catalog.get(&basket_item.catalog_item_id) else {
                return Err(CreateOrderError::CatalogItemMissing(vec![basket_item.catalog_item_id]));
            };

            let snapshot = CatalogItemOrdered {
                catalog_item_id: catalog_item.id,
                product_name: catalog_item.name.clone(),
                picture_uri: self.uri_composer.compose_picture_uri(&catalog_item.picture_uri),
            };

            items.push(OrderItem::new(snapshot, basket_item.unit_price, basket_item.quantity)?);
        }

        let order = NewOrder::new(basket.buyer_id, ship_to, items)?;

        tracing::debug!(
            basket_id = basket_id,
            item_count = order.order_items().len(),
            total = %order.total(),
            "Order assembled"
        );

        Ok(order)
    }
}
