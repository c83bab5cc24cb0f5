// ============================================================================
// Order Domain - sample consumer of dispatched events
// ============================================================================
//
// - Value objects (OrderItem, OrderStatus)
// - Event payloads (OrderCreated, OrderConfirmed, ...)
// - Errors (OrderError enum)
// - Projection (OrderProjection and its routing table)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod errors;
pub mod projection;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use errors::*;
pub use projection::*;
