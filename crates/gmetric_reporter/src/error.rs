//! Error types for exporter construction.

use crate::client::CollectorError;
use thiserror::Error;

/// Invalid exporter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No collector destination was configured.
    #[error("no collector destination configured")]
    MissingCollector,
}

/// Errors returned while building an exporter. No exporter exists after one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExporterError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The collector client could not be opened.
    #[error("failed to open collector client: {0}")]
    Connection(#[source] CollectorError),
}

impl ExporterError {
    /// Returns `true` if the caller can fix this by changing the configuration.
    #[inline]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
