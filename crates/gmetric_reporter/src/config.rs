//! Exporter configuration.

use crate::error::ConfigError;
use crate::exporter::Exporter;
use crate::fault::Fault;
use crate::snapshot::Metric;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Default time between two export ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Default time between two liveness checks.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5);

/// Called once when the background loop faults, with the exporter that owns it.
pub type FaultHandler = Arc<dyn Fn(&Exporter, &Fault) + Send + Sync>;

/// Called for every registry entry read during a tick, before it is expanded.
pub type MetricCallback = Arc<dyn Fn(&str, &Metric) + Send + Sync>;

/// Configuration for an [`Exporter`].
///
/// Fixed once the exporter is built, apart from zero intervals being
/// replaced with their defaults.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Collector destinations. At least one is required.
    pub collectors: Vec<SocketAddr>,

    /// Time between export ticks.
    ///
    /// Default: 10s
    pub interval: Duration,

    /// Time between liveness checks against the collector.
    ///
    /// Default: 5s
    pub ping_interval: Duration,

    /// Run in registration order when the background loop faults.
    #[serde(skip)]
    pub fault_handlers: Vec<FaultHandler>,

    /// Run in registration order for every metric read.
    #[serde(skip)]
    pub callbacks: Vec<MetricCallback>,
}

impl ExporterConfig {
    /// Creates a configuration pushing to a single collector.
    pub fn new(collector: SocketAddr) -> Self {
        Self {
            collectors: vec![collector],
            ..Default::default()
        }
    }

    /// Adds another collector destination.
    pub fn with_collector(mut self, collector: SocketAddr) -> Self {
        self.collectors.push(collector);
        self
    }

    /// Sets the export interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the liveness-check interval.
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Appends a fault handler.
    pub fn with_fault_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Exporter, &Fault) + Send + Sync + 'static,
    {
        self.fault_handlers.push(Arc::new(handler));
        self
    }

    /// Appends a per-metric callback.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &Metric) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
        self
    }

    /// Checks required fields and fills in defaulted intervals.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.collectors.is_empty() {
            return Err(ConfigError::MissingCollector);
        }
        if self.interval.is_zero() {
            self.interval = DEFAULT_INTERVAL;
        }
        if self.ping_interval.is_zero() {
            self.ping_interval = DEFAULT_PING_INTERVAL;
        }
        Ok(self)
    }
}

impl fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterConfig")
            .field("collectors", &self.collectors)
            .field("interval", &self.interval)
            .field("ping_interval", &self.ping_interval)
            .field("fault_handlers", &self.fault_handlers.len())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:8649".parse().unwrap()
    }

    #[test]
    fn test_missing_collector_is_rejected() {
        let err = ExporterConfig::default().validate().unwrap_err();
        assert_eq!(err, ConfigError::MissingCollector);
    }

    #[test]
    fn test_zero_intervals_get_defaults() {
        let config = ExporterConfig::new(addr()).validate().unwrap();
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.ping_interval, DEFAULT_PING_INTERVAL);
    }

    #[test]
    fn test_explicit_intervals_are_kept() {
        let config = ExporterConfig::new(addr())
            .with_interval(Duration::from_secs(1))
            .with_ping_interval(Duration::from_millis(250))
            .validate()
            .unwrap();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.ping_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{
            "collectors": ["127.0.0.1:8649", "10.0.0.2:8649"],
            "interval": { "secs": 30, "nanos": 0 }
        }"#;
        let config: ExporterConfig = serde_json::from_str(json).unwrap();
        let config = config.validate().unwrap();
        assert_eq!(config.collectors.len(), 2);
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.ping_interval, DEFAULT_PING_INTERVAL);
        assert!(config.fault_handlers.is_empty());
    }

    #[test]
    fn test_debug_hides_callbacks() {
        let config = ExporterConfig::new(addr()).with_callback(|_, _| {});
        let rendered = format!("{config:?}");
        assert!(rendered.contains("callbacks: 1"));
    }
}
