use serde::{Deserialize, Serialize};

// ============================================================================
// Stream Trigger Batches
// ============================================================================
//
// The shapes the stream transport hands us on each invocation, in the JSON
// layout the trigger delivers them. Only the record count and, for Kinesis,
// the raw data bytes are ever inspected here. Kinesis `data` travels as
// standard base64.
//
// ============================================================================

/// Anything delivered as an ordered batch of records
pub trait RecordBatch {
    /// Name used in error messages, e.g. "KinesisEvent"
    const KIND: &'static str;

    fn record_count(&self) -> usize;
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct KinesisEvent {
    pub records: Vec<KinesisEventRecord>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct KinesisEventRecord {
    #[serde(rename = "eventID")]
    pub event_id: String,
    pub event_name: String,
    pub event_source: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub aws_region: String,
    pub kinesis: KinesisRecord,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct KinesisRecord {
    pub partition_key: String,
    pub sequence_number: String,
    #[serde(with = "base64_data")]
    pub data: Vec<u8>,
}

mod base64_data {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

impl KinesisEvent {
    pub fn new(records: Vec<KinesisEventRecord>) -> Self {
        Self { records }
    }

    /// Build a batch with one record per payload
    pub fn from_payloads<I, D>(payloads: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Vec<u8>>,
    {
        Self::new(
            payloads
                .into_iter()
                .map(KinesisEventRecord::with_data)
                .collect(),
        )
    }
}

impl KinesisEventRecord {
    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        Self {
            kinesis: KinesisRecord {
                data: data.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

impl RecordBatch for KinesisEvent {
    const KIND: &'static str = "KinesisEvent";

    fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct DynamoDbEvent {
    pub records: Vec<DynamoDbEventRecord>,
}

/// A change record from a DynamoDB stream. The item images stay raw JSON;
/// nothing in this crate looks inside them.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DynamoDbEventRecord {
    #[serde(rename = "eventID")]
    pub event_id: String,
    pub event_name: String,
    pub event_source: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub aws_region: String,
    pub dynamodb: serde_json::Value,
}

impl DynamoDbEvent {
    pub fn new(records: Vec<DynamoDbEventRecord>) -> Self {
        Self { records }
    }
}

impl RecordBatch for DynamoDbEvent {
    const KIND: &'static str = "DynamoDBEvent";

    fn record_count(&self) -> usize {
        self.records.len()
    }
}
