//! gmetric Reporter
//!
//! Periodically reads counters, gauges, meters, timers and histograms from an
//! in-process metrics registry and pushes them to a gmetric-style collector
//! (announce/value over UDP).
//!
//! Each registry entry is expanded into named scalar sub-metrics
//! (`requests.count`, `latency.p99`, ...), each declared to the collector with
//! a wire type and slope hint and then written. A background loop does this on
//! a fixed interval; failures for one sub-metric are logged and never stop the
//! cycle, and a panic inside the loop is caught, logged with its trace, and
//! handed to user fault handlers instead of taking the process down.
//!
//! The registry and the wire client are collaborators behind the [`Registry`]
//! and [`CollectorClient`] traits.
//!
//! # Example
//!
//! ```ignore
//! use gmetric_reporter::{Exporter, ExporterConfig, Metric, StaticRegistry, TracingClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = StaticRegistry::new().with("requests", Metric::Counter(42));
//!     let config = ExporterConfig::new("127.0.0.1:8649".parse().unwrap())
//!         .with_fault_handler(|exporter, fault| eprintln!("{exporter:?} stopped: {fault}"));
//!
//!     let exporter = Exporter::new(config, Arc::new(registry), Arc::new(TracingClient::new()))
//!         .await
//!         .unwrap();
//!     exporter.start();
//! }
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod expand;
pub mod exporter;
pub mod fault;
pub mod model;
pub mod registry;
pub mod snapshot;

// Re-export main types
pub use client::{CollectorClient, CollectorClientBoxed, CollectorError, TracingClient};
pub use config::{ExporterConfig, FaultHandler, MetricCallback, DEFAULT_INTERVAL, DEFAULT_PING_INTERVAL};
pub use dispatch::{send, DispatchError, DispatchSummary, Dispatcher, SendError, SendStage};
pub use error::{ConfigError, ExporterError};
pub use expand::{expand, Sample, PERCENTILES};
pub use exporter::{ExportStats, Exporter, ExporterState};
pub use fault::{Fault, FaultBoundary};
pub use model::{MetricModel, MetricValue, Slope, ValueType, LIFETIME, TICK_INTERVAL};
pub use registry::{Registry, StaticRegistry};
pub use snapshot::{MeterSnapshot, Metric, SampleSnapshot, TimerSnapshot};
