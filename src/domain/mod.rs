// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Pure data and invariants for the checkout flow:
// - basket/   - the buyer's pending selection (read-only snapshot here)
// - catalog/  - catalog item snapshots used to describe what was ordered
// - order/    - the Order aggregate and its integration payloads
//
// Nothing in this layer performs I/O. Repositories, notifiers and the
// queue publisher live outside and depend on these types.
//
// ============================================================================

pub mod basket;
pub mod catalog;
pub mod order;
