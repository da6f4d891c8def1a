// ============================================================================
// Store Notifiers
// ============================================================================
//
// HTTP pushes of a persisted order:
// - OrderNotifier:           full order to the order store (primary)
// - SecondaryStoreNotifier:  reduced summary, failures logged and swallowed
//
// Both go through HttpStoreClient, which applies the request timeout and a
// per-endpoint circuit breaker.
//
// ============================================================================

mod errors;
mod http;
mod order_store;
mod secondary_store;

pub use errors::NotifyError;
pub use http::HttpStoreClient;
pub use order_store::{HttpOrderStoreNotifier, OrderNotifier};
pub use secondary_store::{HttpSummaryStore, SecondaryStoreNotifier, SummaryStore};
