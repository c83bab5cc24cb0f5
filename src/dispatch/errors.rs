use crate::event_sourcing::DecodeError;
use crate::middleware::RecordCountError;

// ============================================================================
// Dispatch Errors
// ============================================================================
//
// Every variant is surfaced to the trigger binding, which decides whether the
// batch gets redelivered. An unknown event type is not an error at all.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    RecordCount(#[from] RecordCountError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The domain handler's own error, untouched
    #[error(transparent)]
    Handler(anyhow::Error),
}

impl DispatchError {
    pub fn is_handler_error(&self) -> bool {
        matches!(self, DispatchError::Handler(_))
    }

    pub fn into_handler_error(self) -> Option<anyhow::Error> {
        match self {
            DispatchError::Handler(err) => Some(err),
            _ => None,
        }
    }
}
