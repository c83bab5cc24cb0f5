// ============================================================================
// Dispatch - routes decoded envelopes to domain handlers by event type
// ============================================================================

mod dispatcher;
mod errors;
mod event_map;

pub use dispatcher::{event_handler, Dispatcher};
pub use errors::DispatchError;
pub use event_map::{EventHandler, EventMap};
