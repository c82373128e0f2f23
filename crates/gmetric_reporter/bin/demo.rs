//! # gmetric Reporter Demo
//!
//! Builds a registry holding one metric of every kind, points an exporter at
//! a [`TracingClient`], and lets the background loop run for a few export
//! intervals. Every declaration and value shows up as a log line.
//!
//! ## Running
//!
//! ```bash
//! # Values only
//! cargo run -p gmetric_reporter --bin demo
//!
//! # Include declarations and per-tick summaries
//! RUST_LOG=gmetric_reporter=trace cargo run -p gmetric_reporter --bin demo
//! ```

use gmetric_reporter::{
    Exporter, ExporterConfig, MeterSnapshot, Metric, SampleSnapshot, StaticRegistry,
    TimerSnapshot, TracingClient,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn build_registry() -> StaticRegistry {
    let latencies: Vec<i64> = (1..=50).map(|i| i * 1_000_000).collect();

    StaticRegistry::new()
        .with("http.requests", Metric::Counter(1_284))
        .with("pool.connections", Metric::Gauge(12.0))
        .with(
            "queue.enqueued",
            Metric::Meter(MeterSnapshot {
                count: 9_000,
                rate1: 14.2,
                rate5: 13.8,
                rate15: 12.9,
                rate_mean: 15.0,
            }),
        )
        .with(
            "db.query",
            Metric::Timer(TimerSnapshot {
                sample: SampleSnapshot::new(latencies.clone()),
                meter: MeterSnapshot {
                    count: latencies.len() as i64,
                    rate_mean: 2.5,
                    ..Default::default()
                },
            }),
        )
        .with("payload.bytes", Metric::Histogram(SampleSnapshot::new(vec![512, 1024, 2048, 4096, 8192])))
        .with("db.health", Metric::Unsupported { kind: "healthcheck".into() })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ExporterConfig::new("127.0.0.1:8649".parse()?)
        .with_interval(Duration::from_secs(2))
        .with_ping_interval(Duration::from_secs(1))
        .with_fault_handler(|exporter, fault| {
            tracing::error!(state = %exporter.state(), %fault, "demo exporter faulted");
        });

    let exporter = Exporter::new(config, Arc::new(build_registry()), Arc::new(TracingClient::new())).await?;
    exporter.start();

    tokio::time::sleep(Duration::from_millis(6_500)).await;

    let stats = exporter.stats();
    tracing::info!(
        ticks = stats.ticks(),
        samples = stats.samples_sent(),
        errors = stats.send_errors(),
        pings = stats.pings(),
        "demo finished"
    );
    Ok(())
}
