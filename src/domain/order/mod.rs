// ============================================================================
// Order Domain - the aggregate created at checkout
// ============================================================================
//
// - Value objects (OrderId, Address, CatalogItemOrdered, OrderItem)
// - Errors (OrderError)
// - Aggregate (NewOrder before persistence, Order after)
// - Events (payloads pushed to the stores and the queue)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod aggregate;
pub mod events;

pub use value_objects::*;
pub use errors::*;
pub use aggregate::*;
pub use events::*;
