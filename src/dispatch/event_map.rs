use std::collections::HashMap;
use std::fmt;

use crate::event_sourcing::EventEnvelope;

// ============================================================================
// Routing Table - event type -> handler
// ============================================================================
//
// Built once at startup and only read afterwards. Lookups never mutate the
// map, so a single instance behind an `Arc` serves every concurrent
// invocation without locking.
//
// ============================================================================

/// Handles one decoded domain event
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &EventEnvelope) -> anyhow::Result<()>;
}

impl<F> EventHandler for F
where
    F: Fn(&EventEnvelope) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, event: &EventEnvelope) -> anyhow::Result<()> {
        self(event)
    }
}

#[derive(Default)]
pub struct EventMap {
    handlers: HashMap<String, Box<dyn EventHandler>>,
}

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure for `event_type`, replacing any earlier handler
    pub fn with_handler<F>(self, event_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&EventEnvelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.with_event_handler(event_type, handler)
    }

    pub fn with_event_handler<H>(mut self, event_type: impl Into<String>, handler: H) -> Self
    where
        H: EventHandler + 'static,
    {
        self.insert(event_type, Box::new(handler));
        self
    }

    /// Returns the handler previously registered for the type, if any
    pub fn insert(
        &mut self,
        event_type: impl Into<String>,
        handler: Box<dyn EventHandler>,
    ) -> Option<Box<dyn EventHandler>> {
        let event_type = event_type.into();
        tracing::debug!(event_type = %event_type, "Registering event handler");
        self.handlers.insert(event_type, handler)
    }

    pub fn get(&self, event_type: &str) -> Option<&dyn EventHandler> {
        self.handlers.get(event_type).map(|handler| &**handler)
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl fmt::Debug for EventMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.event_types().collect();
        types.sort_unstable();
        f.debug_struct("EventMap").field("event_types", &types).finish()
    }
}
