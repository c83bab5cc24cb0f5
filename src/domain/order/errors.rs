use super::value_objects::OrderStatus;

// ============================================================================
// Order Projection Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Invalid {event_type} payload: {reason}")]
    InvalidPayload {
        event_type: &'static str,
        reason: String,
    },

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order already exists: {0}")]
    AlreadyExists(String),

    #[error("Out of order event for {order_id}: expected version {expected}, got {actual}")]
    VersionMismatch {
        order_id: String,
        expected: i64,
        actual: i64,
    },

    #[error("Cannot move order from {from:?} to {to:?}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),
}
