use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use event_dispatch::config::AppConfig;
use event_dispatch::domain::order::{
    order_envelope, order_event_map, OrderConfirmed, OrderCreated, OrderItem, OrderProjection,
    OrderShipped,
};
use event_dispatch::messaging::DynamoDbEventRecord;
use event_dispatch::metrics::{start_metrics_server, DispatchMetrics};
use event_dispatch::{
    encode_envelope, expect_dynamodb_event_records, Dispatcher, DynamoDbEvent, EventEnvelope,
    KinesisEvent,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    // RUST_LOG wins over the configured filter
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    tracing::info!(?config, "🚀 Starting event dispatch demo");

    let metrics = Arc::new(DispatchMetrics::new()?);
    if config.metrics_enabled {
        let registry = Arc::new(metrics.registry().clone());
        let port = config.metrics_port;
        std::thread::spawn(move || {
            if let Err(e) = actix_web::rt::System::new().block_on(start_metrics_server(registry, port)) {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    }

    // === Routing table, built once and shared by every shard consumer ===
    let projection = Arc::new(OrderProjection::new());
    let dispatcher = Dispatcher::new(order_event_map(projection.clone())).with_metrics(metrics.clone());
    tracing::info!(event_map = ?dispatcher.event_map(), "Routing table ready");

    // === Simulated Kinesis shards: ordered within a shard, concurrent across ===
    let mut consumers = Vec::new();
    for shard in ["shard-0", "shard-1"] {
        let (tx, rx) = mpsc::channel(16);
        consumers.push(tokio::spawn(consume_shard(shard, rx, dispatcher.clone())));
        tokio::spawn(produce_order_batches(format!("order-{}", Uuid::new_v4()), tx));
    }
    for consumer in consumers {
        consumer.await?;
    }

    // === Generic batch guard on a DynamoDB stream handler ===
    let audit = expect_dynamodb_event_records(config.expected_records, |batch: DynamoDbEvent| {
        for record in &batch.records {
            tracing::info!(event_id = %record.event_id, event_name = %record.event_name, "Observed table change");
        }
        Ok::<_, anyhow::Error>(())
    });
    let change = DynamoDbEventRecord {
        event_id: Uuid::new_v4().to_string(),
        event_name: "INSERT".to_string(),
        ..Default::default()
    };
    if let Err(e) = audit(DynamoDbEvent::new(vec![change; config.expected_records])) {
        tracing::error!(error = %e, "Audit handler failed");
    }
    // Empty batch: passes only when the configured count is 0
    match audit(DynamoDbEvent::default()) {
        Ok(()) => tracing::info!("Empty audit batch accepted"),
        Err(e) => tracing::error!(error = %e, "Audit handler failed"),
    }

    tracing::info!(orders = projection.len(), "🎉 Demo complete!");
    Ok(())
}

async fn consume_shard(shard: &'static str, mut rx: mpsc::Receiver<KinesisEvent>, dispatcher: Dispatcher) {
    while let Some(batch) = rx.recv().await {
        let dispatcher = dispatcher.clone();
        match tokio::task::spawn_blocking(move || dispatcher.dispatch(&batch)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(shard, error = %e, "Batch failed, transport would redeliver");
            }
            Err(e) => tracing::error!(shard, error = %e, "Dispatch task panicked"),
        }
    }
}

async fn produce_order_batches(order_id: String, tx: mpsc::Sender<KinesisEvent>) {
    let created = OrderCreated {
        customer_id: Uuid::new_v4(),
        items: vec![OrderItem { product_id: Uuid::new_v4(), quantity: 2 }],
    };
    let confirmed = OrderConfirmed { confirmed_at: Utc::now() };
    let shipped = OrderShipped {
        tracking_number: format!("TRACK-{}", &order_id[6..14]),
        carrier: "DHL".to_string(),
        shipped_at: Utc::now(),
    };

    let envelopes = [
        order_envelope(&order_id, 1, &created),
        order_envelope(&order_id, 2, &confirmed),
        Ok(EventEnvelope::new(Uuid::new_v4().to_string(), "CustomerRegistered", "c-1", "Customer", 1)),
        order_envelope(&order_id, 3, &shipped),
    ];

    let mut batches = Vec::new();
    for envelope in envelopes {
        match envelope.and_then(|envelope| encode_envelope(&envelope)) {
            Ok(data) => batches.push(KinesisEvent::from_payloads([data])),
            Err(e) => tracing::error!(error = %e, "Failed to encode demo event"),
        }
    }
    // Malformed payload and an oversized batch, both rejected by the dispatcher
    batches.push(KinesisEvent::from_payloads(["not-json"]));
    batches.push(KinesisEvent::from_payloads(["{}", "{}"]));

    for batch in batches {
        if tx.send(batch).await.is_err() {
            break;
        }
    }
}
