use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::event_sourcing::EventEnvelope;
use super::errors::OrderError;
use super::value_objects::OrderItem;

// ============================================================================
// Order Events - payloads carried inside the envelope
// ============================================================================
//
// The dispatcher routes on `EventEnvelope::event_type`; these are the types
// the order handlers parse out of `EventEnvelope::payload`.
//
// ============================================================================

pub const ORDER_CREATED: &str = "OrderCreated";
pub const ORDER_CONFIRMED: &str = "OrderConfirmed";
pub const ORDER_SHIPPED: &str = "OrderShipped";
pub const ORDER_CANCELLED: &str = "OrderCancelled";

pub trait OrderPayload: Serialize + DeserializeOwned {
    const EVENT_TYPE: &'static str;
}

/// Order Created - Initial event in order lifecycle
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderCreated {
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
}

impl OrderPayload for OrderCreated {
    const EVENT_TYPE: &'static str = ORDER_CREATED;
}

/// Order Confirmed - Order accepted for fulfillment
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderConfirmed {
    pub confirmed_at: DateTime<Utc>,
}

impl OrderPayload for OrderConfirmed {
    const EVENT_TYPE: &'static str = ORDER_CONFIRMED;
}

/// Order Shipped - Order dispatched to customer
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderShipped {
    pub tracking_number: String,
    pub carrier: String,
    pub shipped_at: DateTime<Utc>,
}

impl OrderPayload for OrderShipped {
    const EVENT_TYPE: &'static str = ORDER_SHIPPED;
}

/// Order Cancelled - Order lifecycle ended
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderCancelled {
    pub reason: Option<String>,
}

impl OrderPayload for OrderCancelled {
    const EVENT_TYPE: &'static str = ORDER_CANCELLED;
}

/// Parse the opaque envelope payload as `P`
pub fn parse_payload<P: OrderPayload>(envelope: &EventEnvelope) -> Result<P, OrderError> {
    serde_json::from_str(&envelope.payload).map_err(|e| OrderError::InvalidPayload {
        event_type: P::EVENT_TYPE,
        reason: e.to_string(),
    })
}

/// Wrap a payload into an envelope ready to go on the stream
pub fn order_envelope<P: OrderPayload>(
    order_id: &str,
    version: i64,
    payload: &P,
) -> serde_json::Result<EventEnvelope> {
    Ok(
        EventEnvelope::new(Uuid::new_v4().to_string(), P::EVENT_TYPE, order_id, "Order", version)
            .with_payload(serde_json::to_string(payload)?),
    )
}
