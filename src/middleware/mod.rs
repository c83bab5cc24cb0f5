mod record_count;

pub use record_count::{
    ensure_record_count, expect_dynamodb_event_records, expect_kinesis_event_records,
    expect_records, RecordCountError,
};
