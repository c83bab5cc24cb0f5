use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dispatch::EventMap;
use crate::event_sourcing::EventEnvelope;
use super::errors::OrderError;
use super::events::*;
use super::value_objects::{OrderItem, OrderStatus};

// ============================================================================
// Order Projection - read model fed by dispatched order events
// ============================================================================
//
// Each handler checks that the event carries the next aggregate version for
// its order. A gap or replay is reported as an error so the transport can
// redeliver; nothing is applied in that case.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub order_id: String,
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub version: i64,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub cancelled_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct OrderProjection {
    orders: RwLock<HashMap<String, OrderView>>,
}

impl OrderProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, order_id: &str) -> Option<OrderView> {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(order_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.orders.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn on_created(&self, envelope: &EventEnvelope) -> Result<(), OrderError> {
        let created: OrderCreated = parse_payload(envelope)?;
        if created.items.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        if let Some(item) = created.items.iter().find(|item| item.quantity <= 0) {
            return Err(OrderError::InvalidQuantity(item.quantity));
        }

        let mut orders = self.orders.write().unwrap_or_else(PoisonError::into_inner);
        if orders.contains_key(&envelope.aggregate_id) {
            return Err(OrderError::AlreadyExists(envelope.aggregate_id.clone()));
        }

        orders.insert(
            envelope.aggregate_id.clone(),
            OrderView {
                order_id: envelope.aggregate_id.clone(),
                customer_id: created.customer_id,
                items: created.items,
                status: OrderStatus::Created,
                version: envelope.aggregate_version,
                tracking_number: None,
                carrier: None,
                cancelled_reason: None,
                updated_at: envelope.created,
            },
        );
        Ok(())
    }

    pub fn on_confirmed(&self, envelope: &EventEnvelope) -> Result<(), OrderError> {
        let _confirmed: OrderConfirmed = parse_payload(envelope)?;
        self.transition(envelope, &[OrderStatus::Created], OrderStatus::Confirmed, |_| {})
    }

    pub fn on_shipped(&self, envelope: &EventEnvelope) -> Result<(), OrderError> {
        let shipped: OrderShipped = parse_payload(envelope)?;
        self.transition(envelope, &[OrderStatus::Confirmed], OrderStatus::Shipped, |view| {
            view.tracking_number = Some(shipped.tracking_number);
            view.carrier = Some(shipped.carrier);
        })
    }

    pub fn on_cancelled(&self, envelope: &EventEnvelope) -> Result<(), OrderError> {
        let cancelled: OrderCancelled = parse_payload(envelope)?;
        self.transition(
            envelope,
            &[OrderStatus::Created, OrderStatus::Confirmed],
            OrderStatus::Cancelled,
            |view| view.cancelled_reason = cancelled.reason,
        )
    }

    fn transition(
        &self,
        envelope: &EventEnvelope,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
        update: impl FnOnce(&mut OrderView),
    ) -> Result<(), OrderError> {
        let mut orders = self.orders.write().unwrap_or_else(PoisonError::into_inner);
        let view = orders
            .get_mut(&envelope.aggregate_id)
            .ok_or_else(|| OrderError::NotFound(envelope.aggregate_id.clone()))?;

        // An order already at i64::MAX has no next version
        let next = view.version.checked_add(1);
        if next != Some(envelope.aggregate_version) {
            return Err(OrderError::VersionMismatch {
                order_id: view.order_id.clone(),
                expected: next.unwrap_or(view.version),
                actual: envelope.aggregate_version,
            });
        }
        if !allowed_from.contains(&view.status) {
            return Err(OrderError::InvalidStatusTransition { from: view.status, to });
        }

        update(view);
        view.status = to;
        view.version = envelope.aggregate_version;
        view.updated_at = envelope.created;
        Ok(())
    }
}

/// Routing table for every order event, all feeding `projection`
pub fn order_event_map(projection: Arc<OrderProjection>) -> EventMap {
    let created = Arc::clone(&projection);
    let confirmed = Arc::clone(&projection);
    let shipped = Arc::clone(&projection);
    let cancelled = projection;

    EventMap::new()
        .with_handler(ORDER_CREATED, move |e: &EventEnvelope| Ok(created.on_created(e)?))
        .with_handler(ORDER_CONFIRMED, move |e: &EventEnvelope| Ok(confirmed.on_confirmed(e)?))
        .with_handler(ORDER_SHIPPED, move |e: &EventEnvelope| Ok(shipped.on_shipped(e)?))
        .with_handler(ORDER_CANCELLED, move |e: &EventEnvelope| Ok(cancelled.on_cancelled(e)?))
}
