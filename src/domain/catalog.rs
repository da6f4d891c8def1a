use serde::{Deserialize, Serialize};

pub type CatalogItemId = i32;

/// Catalog record as read at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub name: String,
    /// Relative or placeholder-hosted reference; see `CatalogUriComposer`.
    pub picture_uri: String,
}

impl CatalogItem {
    pub fn new(id: CatalogItemId, name: impl Into<String>, picture_uri: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            picture_uri: picture_uri.into(),
        }
    }
}
