//! Event dispatch layer between a stream trigger and domain-event handlers.
//!
//! A trigger hands over a batch of raw records. The [`Dispatcher`] checks the
//! batch holds exactly one record, decodes it into an [`EventEnvelope`], looks
//! the envelope's type up in an [`EventMap`] and runs the matching handler,
//! logging a timed outcome record. [`middleware`] holds the record-count guard
//! for arbitrary batch handlers.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod event_sourcing;
pub mod http;
pub mod messaging;
pub mod metrics;
pub mod middleware;

#[cfg(test)]
mod test_support;

pub use dispatch::{event_handler, DispatchError, Dispatcher, EventHandler, EventMap};
pub use event_sourcing::{decode_envelope, encode_envelope, DecodeError, EventEnvelope};
pub use messaging::{DynamoDbEvent, KinesisEvent, RecordBatch};
pub use middleware::{
    expect_dynamodb_event_records, expect_kinesis_event_records, expect_records, RecordCountError,
};
