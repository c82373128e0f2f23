//! Dispatcher and sender.
//!
//! One dispatch reads every registry entry, expands it into samples, and
//! pushes each sample to the collector. Snapshots are taken and expanded
//! inside the registry callback; sending happens afterwards, so a registry
//! that locks during enumeration is never held across collector I/O.
//!
//! A failed sample never stops the cycle: every sample of every entry is
//! attempted, and the first failure is reported alongside the counts. Metric
//! callbacks run once per entry, in registration order, after that entry's
//! samples have been sent.

use crate::client::{CollectorClientBoxed, CollectorError};
use crate::config::MetricCallback;
use crate::expand::{expand, Sample};
use crate::registry::Registry;
use crate::snapshot::Metric;
use std::fmt;
use thiserror::Error;

/// Which half of a send failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStage {
    Declare,
    Write,
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendStage::Declare => f.write_str("declare"),
            SendStage::Write => f.write_str("write"),
        }
    }
}

/// A single sub-metric that could not be pushed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to {stage} {metric}: {source}")]
pub struct SendError {
    pub metric: String,
    pub stage: SendStage,
    #[source]
    pub source: CollectorError,
}

/// Declares the sample's metric, then writes its value.
pub async fn send(client: &dyn CollectorClientBoxed, sample: &Sample) -> Result<(), SendError> {
    let fail = |stage, source| SendError {
        metric: sample.model.name.clone(),
        stage,
        source,
    };

    client
        .declare_boxed(&sample.model)
        .await
        .map_err(|e| fail(SendStage::Declare, e))?;
    client
        .write_value_boxed(&sample.model, sample.value)
        .await
        .map_err(|e| fail(SendStage::Write, e))?;
    Ok(())
}

/// Counts for one dispatch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Registry entries visited.
    pub metrics_read: u64,
    /// Entries skipped because their kind has no expansion.
    pub metrics_skipped: u64,
    /// Samples declared and written successfully.
    pub samples_sent: u64,
    /// Samples where either step failed.
    pub samples_failed: u64,
}

impl DispatchSummary {
    /// Samples for which a send was attempted.
    pub fn attempted(&self) -> u64 {
        self.samples_sent + self.samples_failed
    }
}

/// At least one sample failed during a dispatch cycle.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} of {} samples failed, first: {first}", .summary.samples_failed, .summary.attempted())]
pub struct DispatchError {
    pub first: SendError,
    pub summary: DispatchSummary,
}

/// One registry entry read during a cycle, with its expansion.
struct Entry {
    name: String,
    metric: Option<Metric>,
    samples: Vec<Sample>,
}

/// Reads a registry and pushes its expansion to a collector client.
pub struct Dispatcher<'a> {
    registry: &'a dyn Registry,
    client: &'a dyn CollectorClientBoxed,
    callbacks: &'a [MetricCallback],
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a dyn Registry, client: &'a dyn CollectorClientBoxed) -> Self {
        Self {
            registry,
            client,
            callbacks: &[],
        }
    }

    /// Callbacks to run for every entry read, after its samples are sent.
    pub fn with_callbacks(mut self, callbacks: &'a [MetricCallback]) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Runs one full cycle.
    pub async fn dispatch(&self) -> Result<DispatchSummary, DispatchError> {
        let mut summary = DispatchSummary::default();
        let entries = self.collect(&mut summary);

        let mut first = None;
        for entry in &entries {
            for sample in &entry.samples {
                match send(self.client, sample).await {
                    Ok(()) => summary.samples_sent += 1,
                    Err(e) => {
                        tracing::warn!(
                            metric = %e.metric,
                            stage = %e.stage,
                            error = %e.source,
                            client = self.client.name(),
                            "failed to send sample"
                        );
                        summary.samples_failed += 1;
                        first.get_or_insert(e);
                    }
                }
            }
            if let Some(metric) = &entry.metric {
                for callback in self.callbacks {
                    callback(&entry.name, metric);
                }
            }
        }

        tracing::debug!(
            read = summary.metrics_read,
            skipped = summary.metrics_skipped,
            sent = summary.samples_sent,
            failed = summary.samples_failed,
            "dispatch complete"
        );

        match first {
            Some(first) => Err(DispatchError { first, summary }),
            None => Ok(summary),
        }
    }

    fn collect(&self, summary: &mut DispatchSummary) -> Vec<Entry> {
        let mut entries = Vec::new();
        self.registry.each(&mut |name, metric| {
            summary.metrics_read += 1;
            let samples = expand(name, metric).unwrap_or_else(|| {
                tracing::trace!(metric = %name, kind = metric.kind(), "skipping unsupported metric kind");
                summary.metrics_skipped += 1;
                Vec::new()
            });
            // Callbacks need the snapshot only when there are any to run.
            let metric = if self.callbacks.is_empty() {
                None
            } else {
                Some(metric.clone())
            };
            entries.push(Entry {
                name: name.to_string(),
                metric,
                samples,
            });
        });
        entries
    }
}
