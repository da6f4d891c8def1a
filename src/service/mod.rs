// ============================================================================
// Order Workflow
// ============================================================================
//
// - OrderAssembler:  basket + catalog -> NewOrder (reads only)
// - OrderService:    assemble, persist (commit point), then fan out
// - OrderDispatcher: one downstream channel at a time
// - OutboxRelay:     background redelivery of what fan-out missed
//
// ============================================================================

mod assembler;
mod dispatcher;
mod errors;
mod order_service;
mod relay;
mod stage;
mod uri;

#[cfg(test)]
pub(crate) mod testing;

pub use assembler::OrderAssembler;
pub use dispatcher::OrderDispatcher;
pub use errors::{CreateOrderError, DispatchError};
pub use order_service::{DispatchOptions, OrderPlacement, OrderService};
pub use relay::{OutboxRelay, RelayConfig, RelayResult};
pub use stage::{OrderStage, StageTrail};
pub use uri::{CatalogUriComposer, UriComposer, PLACEHOLDER_BASE_URL};
