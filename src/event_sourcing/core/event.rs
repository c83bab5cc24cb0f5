use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Event Envelope - Domain Event Metadata
// ============================================================================
//
// One occurrence of a domain event as it travels over the stream. The
// dispatcher only reads the routing and audit metadata; `payload` stays an
// opaque string that the selected handler interprets.
//
// Wire shape (JSON):
//   {"ID", "Type", "AggregateID", "AggregateType", "AggregateVersion",
//    "Payload", "Created"}
//
// Producers are loose about the wire: keys match in any letter case and a
// `null` counts as absent. Missing fields decode to their zero values, so an
// envelope without a `Type` still decodes and is simply never routed. The
// zero `Created` is 0001-01-01T00:00:00Z, not the Unix epoch.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct EventEnvelope {
    #[serde(rename = "ID")]
    pub id: String,

    /// Routing key
    #[serde(rename = "Type")]
    pub event_type: String,

    #[serde(rename = "AggregateID")]
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub aggregate_version: i64,

    pub payload: String,
    pub created: DateTime<Utc>,
}

/// Wire names, in the order they are encoded
const WIRE_FIELDS: [&str; 7] = [
    "ID",
    "Type",
    "AggregateID",
    "AggregateType",
    "AggregateVersion",
    "Payload",
    "Created",
];

/// Creation time of an envelope that never said when it was created
pub fn zero_time() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_default()
}

impl Default for EventEnvelope {
    fn default() -> Self {
        Self {
            id: String::new(),
            event_type: String::new(),
            aggregate_id: String::new(),
            aggregate_type: String::new(),
            aggregate_version: 0,
            payload: String::new(),
            created: zero_time(),
        }
    }
}

impl EventEnvelope {
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        aggregate_version: i64,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            aggregate_version,
            payload: String::new(),
            created: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// An envelope can only be routed when it carries a type tag
    pub fn is_routable(&self) -> bool {
        !self.event_type.is_empty()
    }
}

// ============================================================================
// Envelope Codec
// ============================================================================

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Decode one raw stream record into an envelope. Either the whole envelope
/// is populated or the call fails.
pub fn decode_envelope(data: &[u8]) -> Result<EventEnvelope, DecodeError> {
    let fields = match serde_json::from_slice::<Value>(data)? {
        Value::Object(fields) => fields,
        Value::Null => return Ok(EventEnvelope::default()),
        other => {
            let found = match &other {
                Value::Bool(b) => Unexpected::Bool(*b),
                Value::String(s) => Unexpected::Str(s),
                Value::Array(_) => Unexpected::Seq,
                _ => Unexpected::Other("number"),
            };
            return Err(serde_json::Error::invalid_type(found, &"an event envelope object").into());
        }
    };

    Ok(serde_json::from_value(Value::Object(canonical_fields(fields)))?)
}

/// Rename keys to their wire spelling and drop nulls and unknown keys.
/// An exactly spelled key beats any other casing of the same field.
fn canonical_fields(fields: Map<String, Value>) -> Map<String, Value> {
    let mut canonical = Map::new();
    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        let Some(name) = WIRE_FIELDS.iter().find(|name| name.eq_ignore_ascii_case(&key)) else {
            continue;
        };
        if key == *name || !canonical.contains_key(*name) {
            canonical.insert(name.to_string(), value);
        }
    }
    canonical
}

pub fn encode_envelope(envelope: &EventEnvelope) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(envelope)
}
