// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the dispatcher
// ============================================================================
//
// Counts every outcome the dispatcher can reach:
// - events consumed / failed by handlers, with handler latency
// - events skipped because no handler is registered for their type
// - batches rejected by the record-count check
// - payloads that could not be decoded
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct DispatchMetrics {
    registry: Registry,

    pub events_consumed: IntCounterVec,
    pub events_failed: IntCounterVec,
    pub handler_duration: HistogramVec,
    pub events_skipped: IntCounter,

    pub batches_rejected: IntCounterVec,
    pub decode_failures: IntCounter,
}

impl DispatchMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let events_consumed = IntCounterVec::new(
            Opts::new("events_consumed_total", "Total events consumed by a handler"),
            &["event_type"],
        )?;
        registry.register(Box::new(events_consumed.clone()))?;

        let events_failed = IntCounterVec::new(
            Opts::new("events_failed_total", "Total events whose handler returned an error"),
            &["event_type"],
        )?;
        registry.register(Box::new(events_failed.clone()))?;

        let handler_duration = HistogramVec::new(
            HistogramOpts::new("event_handler_duration_seconds", "Event handler duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["event_type"],
        )?;
        registry.register(Box::new(handler_duration.clone()))?;

        // Unlabelled: skipped types are producer-controlled and unbounded
        let events_skipped = IntCounter::new(
            "events_skipped_total",
            "Total events with no registered handler",
        )?;
        registry.register(Box::new(events_skipped.clone()))?;

        let batches_rejected = IntCounterVec::new(
            Opts::new("batches_rejected_total", "Total batches with an unexpected record count"),
            &["batch_kind"],
        )?;
        registry.register(Box::new(batches_rejected.clone()))?;

        let decode_failures = IntCounter::new(
            "decode_failures_total",
            "Total records that could not be decoded into an event envelope",
        )?;
        registry.register(Box::new(decode_failures.clone()))?;

        Ok(Self {
            registry,
            events_consumed,
            events_failed,
            handler_duration,
            events_skipped,
            batches_rejected,
            decode_failures,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a handler invocation
    pub fn record_handled(&self, event_type: &str, duration_secs: f64, success: bool) {
        if success {
            self.events_consumed.with_label_values(&[event_type]).inc();
        } else {
            self.events_failed.with_label_values(&[event_type]).inc();
        }
        self.handler_duration.with_label_values(&[event_type]).observe(duration_secs);
    }

    pub fn record_skipped(&self) {
        self.events_skipped.inc();
    }

    pub fn record_rejected_batch(&self, batch_kind: &str) {
        self.batches_rejected.with_label_values(&[batch_kind]).inc();
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.inc();
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
