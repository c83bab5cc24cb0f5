use crate::messaging::{DynamoDbEvent, KinesisEvent, RecordBatch};

// ============================================================================
// Record-Count Guard
// ============================================================================
//
// Wraps a batch handler so it only runs when the batch holds exactly the
// expected number of records. A mismatch is logged once and returned to the
// caller without touching the wrapped handler. The wrapper keeps no state,
// so one instance can serve any number of concurrent invocations.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unexpected {batch_kind} records length: {actual}. Expected count: {expected}")]
pub struct RecordCountError {
    pub batch_kind: &'static str,
    pub actual: usize,
    pub expected: usize,
}

/// Check the batch length and log the mismatch, if any
pub fn ensure_record_count<B: RecordBatch>(
    batch: &B,
    expected: usize,
) -> Result<(), RecordCountError> {
    let actual = batch.record_count();
    if actual == expected {
        return Ok(());
    }

    let err = RecordCountError {
        batch_kind: B::KIND,
        actual,
        expected,
    };
    tracing::error!(
        error = %err,
        batch_kind = B::KIND,
        actual = actual,
        expected = expected,
        "{}",
        err
    );
    Err(err)
}

/// Wrap `handler` so it is only invoked with batches of exactly `count` records.
/// The handler's own result, errors included, is returned untouched.
pub fn expect_records<B, F, T, E>(count: usize, handler: F) -> impl Fn(B) -> Result<T, E>
where
    B: RecordBatch,
    F: Fn(B) -> Result<T, E>,
    E: From<RecordCountError>,
{
    move |batch: B| {
        ensure_record_count(&batch, count)?;
        handler(batch)
    }
}

pub fn expect_kinesis_event_records<F, T, E>(
    count: usize,
    handler: F,
) -> impl Fn(KinesisEvent) -> Result<T, E>
where
    F: Fn(KinesisEvent) -> Result<T, E>,
    E: From<RecordCountError>,
{
    expect_records(count, handler)
}

pub fn expect_dynamodb_event_records<F, T, E>(
    count: usize,
    handler: F,
) -> impl Fn(DynamoDbEvent) -> Result<T, E>
where
    F: Fn(DynamoDbEvent) -> Result<T, E>,
    E: From<RecordCountError>,
{
    expect_records(count, handler)
}
