use crate::model::{MetricModel, MetricValue};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Error types for collector client operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CollectorError {
    /// Transport-layer error (socket, resolution, connection reset)
    #[error("transport error: {0}")]
    Transport(String),
    /// The value or declaration could not be encoded for the wire
    #[error("encoding error: {0}")]
    Encoding(String),
    /// The client has not been opened, or has been closed
    #[error("collector client is not open")]
    NotOpen,
}

/// Client for a push-based collector that speaks the announce/value protocol.
///
/// The exporter calls `open` once at construction, then `declare` followed by
/// `write_value` for every sub-metric on every tick. Wire encoding is the
/// client's concern.
pub trait CollectorClient: Send + Sync {
    /// Opens the connection(s) to the given destinations.
    fn open(&self, destinations: &[SocketAddr]) -> impl Future<Output = Result<(), CollectorError>> + Send;

    /// Sends the metadata ("meta") message for a sub-metric.
    fn declare(&self, model: &MetricModel) -> impl Future<Output = Result<(), CollectorError>> + Send;

    /// Sends the current value of a previously declared sub-metric.
    fn write_value(
        &self,
        model: &MetricModel,
        value: MetricValue,
    ) -> impl Future<Output = Result<(), CollectorError>> + Send;

    /// Connectivity check run on the liveness interval.
    fn ping(&self) -> impl Future<Output = Result<(), CollectorError>> + Send {
        async { Ok(()) }
    }

    /// Returns the client name for debugging.
    fn name(&self) -> &str;
}

type BoxFuture<'a> = Pin<Box<dyn Future<Output = Result<(), CollectorError>> + Send + 'a>>;

/// Object-safe version of CollectorClient for dynamic dispatch.
pub trait CollectorClientBoxed: Send + Sync {
    fn open_boxed<'a>(&'a self, destinations: &'a [SocketAddr]) -> BoxFuture<'a>;

    fn declare_boxed<'a>(&'a self, model: &'a MetricModel) -> BoxFuture<'a>;

    fn write_value_boxed<'a>(&'a self, model: &'a MetricModel, value: MetricValue) -> BoxFuture<'a>;

    fn ping_boxed(&self) -> BoxFuture<'_>;

    fn name(&self) -> &str;
}

/// Blanket implementation: any CollectorClient can be used as CollectorClientBoxed
impl<T: CollectorClient> CollectorClientBoxed for T {
    fn open_boxed<'a>(&'a self, destinations: &'a [SocketAddr]) -> BoxFuture<'a> {
        Box::pin(self.open(destinations))
    }

    fn declare_boxed<'a>(&'a self, model: &'a MetricModel) -> BoxFuture<'a> {
        Box::pin(self.declare(model))
    }

    fn write_value_boxed<'a>(&'a self, model: &'a MetricModel, value: MetricValue) -> BoxFuture<'a> {
        Box::pin(self.write_value(model, value))
    }

    fn ping_boxed(&self) -> BoxFuture<'_> {
        Box::pin(self.ping())
    }

    fn name(&self) -> &str {
        CollectorClient::name(self)
    }
}

/// Client that reports declarations and values through `tracing` instead of
/// a socket. Handy for local runs and for checking what an exporter would push.
#[derive(Debug, Default)]
pub struct TracingClient {
    open: AtomicBool,
    destinations: Mutex<Vec<SocketAddr>>,
}

impl TracingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Destinations passed to the last successful `open`.
    pub fn destinations(&self) -> Vec<SocketAddr> {
        match self.destinations.lock() {
            Ok(d) => d.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn ensure_open(&self) -> Result<(), CollectorError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CollectorError::NotOpen)
        }
    }
}

impl CollectorClient for TracingClient {
    async fn open(&self, destinations: &[SocketAddr]) -> Result<(), CollectorError> {
        if destinations.is_empty() {
            return Err(CollectorError::Transport("no destinations".into()));
        }
        {
            let mut current = match self.destinations.lock() {
                Ok(d) => d,
                Err(poisoned) => poisoned.into_inner(),
            };
            *current = destinations.to_vec();
        }
        self.open.store(true, Ordering::Release);
        tracing::info!(destinations = ?destinations, "collector client opened");
        Ok(())
    }

    async fn declare(&self, model: &MetricModel) -> Result<(), CollectorError> {
        self.ensure_open()?;
        tracing::trace!(
            metric = %model.name,
            value_type = model.value_type.as_str(),
            slope = model.slope.as_str(),
            tmax = model.tick_interval.as_secs(),
            dmax = model.lifetime.as_secs(),
            "meta"
        );
        Ok(())
    }

    async fn write_value(&self, model: &MetricModel, value: MetricValue) -> Result<(), CollectorError> {
        self.ensure_open()?;
        tracing::info!(metric = %model.name, %value, "value");
        Ok(())
    }

    async fn ping(&self) -> Result<(), CollectorError> {
        self.ensure_open()
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetricModel;

    fn addr() -> SocketAddr {
        "127.0.0.1:8649".parse().unwrap()
    }

    #[tokio::test]
    async fn test_tracing_client_requires_open() {
        let client = TracingClient::new();
        let model = MetricModel::build("conn", "count", "int32", "positive");

        assert_eq!(client.declare(&model).await, Err(CollectorError::NotOpen));
        assert_eq!(client.ping().await, Err(CollectorError::NotOpen));

        client.open(&[addr()]).await.unwrap();
        assert!(client.is_open());
        assert_eq!(client.destinations(), vec![addr()]);
        client.declare(&model).await.unwrap();
        client.write_value(&model, MetricValue::Int(1)).await.unwrap();
        client.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_rejects_empty_destinations() {
        let client = TracingClient::new();
        assert!(matches!(client.open(&[]).await, Err(CollectorError::Transport(_))));
        assert!(!client.is_open());
    }

    #[tokio::test]
    async fn test_boxed_dispatch() {
        let client: Box<dyn CollectorClientBoxed> = Box::new(TracingClient::new());
        let model = MetricModel::build("conn", "value", "float32", "both");
        client.open_boxed(&[addr()]).await.unwrap();
        client.declare_boxed(&model).await.unwrap();
        client.write_value_boxed(&model, MetricValue::Float(2.0)).await.unwrap();
        assert_eq!(client.name(), "tracing");
    }
}
