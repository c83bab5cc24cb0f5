use std::sync::Arc;
use std::time::Instant;

use chrono::SecondsFormat;

use super::{DispatchError, EventMap};
use crate::event_sourcing::{decode_envelope, EventEnvelope};
use crate::messaging::{KinesisEvent, RecordBatch};
use crate::metrics::DispatchMetrics;
use crate::middleware::ensure_record_count;

// ============================================================================
// Event Dispatcher - single entry point bound to the stream trigger
// ============================================================================
//
// Per invocation:
//   Received -> CountChecked -> Decoded -> Routed | Skipped -> Invoked -> Logged
//
// - Exactly one record per batch, anything else is rejected before decoding
// - Undecodable payloads are logged and returned, no handler runs
// - Unknown event types are a silent success
// - Routed events get exactly one outcome log, timed around the handler only
//
// The dispatcher never retries. Whatever the handler returns is what the
// transport sees, and redelivery is the transport's business.
//
// ============================================================================

const EXPECTED_RECORDS: usize = 1;

#[derive(Clone)]
pub struct Dispatcher {
    event_map: Arc<EventMap>,
    metrics: Option<Arc<DispatchMetrics>>,
}

impl Dispatcher {
    pub fn new(event_map: impl Into<Arc<EventMap>>) -> Self {
        Self {
            event_map: event_map.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn event_map(&self) -> &EventMap {
        &self.event_map
    }

    pub fn dispatch(&self, batch: &KinesisEvent) -> Result<(), DispatchError> {
        if let Err(err) = ensure_record_count(batch, EXPECTED_RECORDS) {
            if let Some(metrics) = &self.metrics {
                metrics.record_rejected_batch(KinesisEvent::KIND);
            }
            return Err(err.into());
        }

        let envelope = match decode_envelope(&batch.records[0].kinesis.data) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::error!(error = %err, "Failed parsing event");
                if let Some(metrics) = &self.metrics {
                    metrics.record_decode_failure();
                }
                return Err(err.into());
            }
        };

        let handler = match self.event_map.get(&envelope.event_type) {
            Some(handler) if envelope.is_routable() => handler,
            _ => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_skipped();
                }
                return Ok(());
            }
        };

        let start = Instant::now();
        let result = handler.handle(&envelope);
        let elapsed = start.elapsed();

        log_outcome(&envelope, duration_ms(elapsed.as_millis()), result.as_ref().err());
        if let Some(metrics) = &self.metrics {
            metrics.record_handled(&envelope.event_type, elapsed.as_secs_f64(), result.is_ok());
        }

        result.map_err(DispatchError::Handler)
    }
}

fn duration_ms(millis: u128) -> u64 {
    u64::try_from(millis).unwrap_or(u64::MAX)
}

fn log_outcome(event: &EventEnvelope, duration_ms: u64, error: Option<&anyhow::Error>) {
    match error {
        None => tracing::info!(
            EventID = %event.id,
            EventType = %event.event_type,
            AggregateID = %event.aggregate_id,
            AggregateType = %event.aggregate_type,
            AggregateVersion = event.aggregate_version,
            Created = %event.created.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            DurationMS = duration_ms,
            "Consumed event"
        ),
        Some(err) => tracing::error!(
            error = %err,
            EventID = %event.id,
            EventType = %event.event_type,
            AggregateID = %event.aggregate_id,
            AggregateType = %event.aggregate_type,
            AggregateVersion = event.aggregate_version,
            Created = %event.created.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            DurationMS = duration_ms,
            "Failed consuming event"
        ),
    }
}

/// Build the trigger-facing handler for a routing table
pub fn event_handler(
    event_map: EventMap,
) -> impl Fn(KinesisEvent) -> Result<(), DispatchError> + Send + Sync + Clone {
    let dispatcher = Dispatcher::new(event_map);
    move |batch: KinesisEvent| dispatcher.dispatch(&batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::encode_envelope;
    use crate::middleware::expect_kinesis_event_records;
    use crate::test_support::capture_logs;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing::Level;

    fn sample_envelope() -> EventEnvelope {
        EventEnvelope::new("123", "Foo", "abc", "Bar", 1)
            .with_payload("{}")
            .with_created(DateTime::<Utc>::from_timestamp(0, 0).unwrap())
    }

    fn batch_of(envelope: &EventEnvelope, copies: usize) -> KinesisEvent {
        let data = encode_envelope(envelope).unwrap();
        KinesisEvent::from_payloads(std::iter::repeat(data).take(copies))
    }

    fn counting_map(event_type: &str, calls: Arc<AtomicUsize>) -> EventMap {
        EventMap::new().with_handler(event_type, move |_: &EventEnvelope| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_mapped_event_is_delivered_unchanged() {
        let received = Arc::new(Mutex::new(None));
        let sink = received.clone();
        let handler = event_handler(EventMap::new().with_handler("Foo", move |event: &EventEnvelope| {
            *sink.lock().unwrap() = Some(event.clone());
            Ok(())
        }));

        let event = sample_envelope();
        assert!(handler(batch_of(&event, 1)).is_ok());

        assert_eq!(received.lock().unwrap().as_ref(), Some(&event));
    }

    #[test]
    fn test_unmapped_event_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = event_handler(counting_map("Unmapped", calls.clone()));

        let (result, logs) = capture_logs(|| handler(batch_of(&sample_envelope(), 1)));

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(logs.is_empty());
    }

    #[test]
    fn test_event_without_type_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = event_handler(counting_map("", calls.clone()));

        let result = handler(KinesisEvent::from_payloads([r#"{"ID":"1"}"#]));

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_lowercase_keys_and_nulls_still_route() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = event_handler(counting_map("Foo", calls.clone()));

        let result = handler(KinesisEvent::from_payloads([r#"{"id":"1","type":"Foo","Payload":null}"#]));

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_from_trigger_json() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = event_handler(counting_map("Foo", calls.clone()));
        let batch: KinesisEvent = serde_json::from_str(
            r#"{"Records":[{"eventID":"shardId-000000000000:1","kinesis":{"partitionKey":"1","data":"eyJpZCI6IjEiLCJ0eXBlIjoiRm9vIiwiUGF5bG9hZCI6bnVsbH0="}}]}"#,
        )
        .unwrap();

        assert!(handler(batch).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unmarshalling_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = event_handler(counting_map("Foo", calls.clone()));

        let (result, logs) = capture_logs(|| handler(KinesisEvent::from_payloads(["invalid-json"])));

        assert!(matches!(result, Err(DispatchError::Decode(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, Level::ERROR);
        assert_eq!(logs[0].message, "Failed parsing event");
        assert!(logs[0].field("error").is_some());
        assert!(logs[0].field("EventID").is_none());
    }

    #[test]
    fn test_expected_record_count() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = event_handler(counting_map("Foo", calls.clone()));

        assert!(handler(batch_of(&sample_envelope(), 1)).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unexpected_record_count() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = event_handler(counting_map("Foo", calls.clone()));

        for copies in [0, 2, 3] {
            let (result, logs) = capture_logs(|| handler(batch_of(&sample_envelope(), copies)));

            let err = result.unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Unexpected KinesisEvent records length: {copies}. Expected count: 1")
            );
            assert_eq!(logs.len(), 1);
            assert_eq!(logs[0].level, Level::ERROR);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_count_checked_before_decoding() {
        let handler = event_handler(EventMap::new());

        let (result, logs) = capture_logs(|| {
            handler(KinesisEvent::from_payloads(["invalid-json", "invalid-json"]))
        });

        assert!(matches!(result, Err(DispatchError::RecordCount(_))));
        assert!(logs.iter().all(|log| log.message != "Failed parsing event"));
    }

    #[test]
    fn test_consumed_event_outcome_log() {
        let handler = event_handler(EventMap::new().with_handler("Foo", |_: &EventEnvelope| Ok(())));

        let (result, logs) = capture_logs(|| handler(batch_of(&sample_envelope(), 1)));

        assert!(result.is_ok());
        assert_eq!(logs.len(), 1);
        let log = &logs[0];
        assert_eq!(log.level, Level::INFO);
        assert_eq!(log.message, "Consumed event");
        assert_eq!(log.field("EventID"), Some("123"));
        assert_eq!(log.field("EventType"), Some("Foo"));
        assert_eq!(log.field("AggregateID"), Some("abc"));
        assert_eq!(log.field("AggregateType"), Some("Bar"));
        assert_eq!(log.field("AggregateVersion"), Some("1"));
        assert_eq!(log.field("Created"), Some("1970-01-01T00:00:00Z"));
        assert!(log.field("DurationMS").unwrap().parse::<u64>().is_ok());
        assert!(log.field("error").is_none());
    }

    #[test]
    fn test_created_logged_in_utc_z_form() {
        let handler = event_handler(EventMap::new().with_handler("Foo", |_: &EventEnvelope| Ok(())));
        let created = DateTime::parse_from_rfc3339("2024-03-01T10:00:00.250+02:00")
            .unwrap()
            .with_timezone(&Utc);

        let (_, logs) = capture_logs(|| handler(batch_of(&sample_envelope().with_created(created), 1)));

        assert_eq!(logs[0].field("Created"), Some("2024-03-01T08:00:00.250Z"));
    }

    #[test]
    fn test_unmapped_types_share_one_skipped_series() {
        let metrics = Arc::new(DispatchMetrics::new().unwrap());
        let dispatcher = Dispatcher::new(EventMap::new()).with_metrics(metrics.clone());

        for i in 0..50 {
            let unknown = EventEnvelope::new(i.to_string(), format!("Unmapped{i}"), "abc", "Bar", 1);
            assert!(dispatcher.dispatch(&batch_of(&unknown, 1)).is_ok());
        }

        let gathered = metrics.registry().gather();
        let skipped = gathered.iter().find(|m| m.name() == "events_skipped_total").unwrap();
        assert_eq!(skipped.metric.len(), 1);
        assert_eq!(metrics.events_skipped.get(), 50);
    }

    #[test]
    fn test_handler_error_is_logged_and_returned_verbatim() {
        #[derive(Debug, thiserror::Error)]
        #[error("projection unavailable")]
        struct ProjectionUnavailable;

        let handler = event_handler(EventMap::new().with_handler("Foo", |_: &EventEnvelope| {
            Err(ProjectionUnavailable.into())
        }));

        let (result, logs) = capture_logs(|| handler(batch_of(&sample_envelope(), 1)));

        let err = result.unwrap_err();
        assert!(err.is_handler_error());
        assert_eq!(err.to_string(), "projection unavailable");
        let inner = err.into_handler_error().unwrap();
        assert!(inner.downcast_ref::<ProjectionUnavailable>().is_some());

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, Level::ERROR);
        assert_eq!(logs[0].message, "Failed consuming event");
        assert_eq!(logs[0].field("error"), Some("projection unavailable"));
        assert_eq!(logs[0].field("EventID"), Some("123"));
        assert!(logs[0].field("DurationMS").is_some());
    }

    #[test]
    fn test_handler_invoked_once_per_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = event_handler(EventMap::new().with_handler("Foo", move |_: &EventEnvelope| {
            counter.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("always fails")
        }));

        assert!(handler(batch_of(&sample_envelope(), 1)).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duration_brackets_handler() {
        let handler = event_handler(EventMap::new().with_handler("Foo", |_: &EventEnvelope| {
            std::thread::sleep(std::time::Duration::from_millis(25));
            Ok(())
        }));

        let (_, logs) = capture_logs(|| handler(batch_of(&sample_envelope(), 1)));

        let duration: u64 = logs[0].field("DurationMS").unwrap().parse().unwrap();
        assert!(duration >= 25);
    }

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(7), 7);
        assert_eq!(duration_ms(u128::MAX), u64::MAX);
    }

    #[test]
    fn test_composes_with_record_count_guard() {
        let calls = Arc::new(AtomicUsize::new(0));
        let guarded = expect_kinesis_event_records(1, event_handler(counting_map("Foo", calls.clone())));

        assert!(guarded(batch_of(&sample_envelope(), 1)).is_ok());
        assert!(matches!(
            guarded(batch_of(&sample_envelope(), 2)),
            Err(DispatchError::RecordCount(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_metrics_follow_outcomes() {
        let metrics = Arc::new(DispatchMetrics::new().unwrap());
        let dispatcher = Dispatcher::new(
            EventMap::new()
                .with_handler("Foo", |_: &EventEnvelope| Ok(()))
                .with_handler("Bar", |_: &EventEnvelope| anyhow::bail!("boom")),
        )
        .with_metrics(metrics.clone());

        let bar = EventEnvelope::new("2", "Bar", "abc", "Bar", 2);
        let unknown = EventEnvelope::new("3", "Baz", "abc", "Bar", 3);

        assert!(dispatcher.dispatch(&batch_of(&sample_envelope(), 1)).is_ok());
        assert!(dispatcher.dispatch(&batch_of(&bar, 1)).is_err());
        assert!(dispatcher.dispatch(&batch_of(&unknown, 1)).is_ok());
        assert!(dispatcher.dispatch(&batch_of(&unknown, 2)).is_err());
        assert!(dispatcher.dispatch(&KinesisEvent::from_payloads(["nope"])).is_err());

        assert_eq!(metrics.events_consumed.with_label_values(&["Foo"]).get(), 1);
        assert_eq!(metrics.events_failed.with_label_values(&["Bar"]).get(), 1);
        assert_eq!(metrics.events_skipped.get(), 1);
        assert_eq!(metrics.batches_rejected.with_label_values(&["KinesisEvent"]).get(), 1);
        assert_eq!(metrics.decode_failures.get(), 1);
    }

    #[test]
    fn test_dispatcher_shared_across_threads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(counting_map("Foo", calls.clone()));
        let batch = batch_of(&sample_envelope(), 1);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let dispatcher = dispatcher.clone();
                let batch = &batch;
                scope.spawn(move || dispatcher.dispatch(batch).unwrap());
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }
}
