// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// The envelope every domain event travels in, and its wire codec.
//
// ============================================================================

mod core;

pub use self::core::*;
