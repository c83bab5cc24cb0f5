pub mod event;

// Re-export core types for convenience
pub use event::{decode_envelope, encode_envelope, DecodeError, EventEnvelope};
