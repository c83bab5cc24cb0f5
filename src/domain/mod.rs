// ============================================================================
// Domain Layer - handlers plugged into the dispatcher
// ============================================================================

pub mod order;
