//! The exporter and its background loop.
//!
//! An [`Exporter`] is cheap to clone; all clones share one collector client,
//! one start guard and one set of [`ExportStats`]. [`Exporter::start`] moves
//! the shared state from `Idle` to `Running` with a single compare-and-swap and
//! spawns the loop only on success, so at most one loop ever runs per
//! exporter.
//!
//! The loop runs inside a [`FaultBoundary`]. A panic anywhere in a tick ends
//! the loop, moves the state to `Faulted`, logs the fault with its trace and
//! runs the configured fault handlers. The loop is not restarted.

use crate::client::CollectorClientBoxed;
use crate::config::ExporterConfig;
use crate::dispatch::{DispatchError, DispatchSummary, Dispatcher};
use crate::error::ExporterError;
use crate::fault::{Fault, FaultBoundary};
use crate::registry::Registry;
use std::convert::Infallible;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const FAULTED: u8 = 2;

/// Lifecycle of an exporter's background loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterState {
    /// Built, not started.
    Idle,
    /// Background loop launched.
    Running,
    /// Background loop ended after a recovered fault.
    Faulted,
}

impl ExporterState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            IDLE => Self::Idle,
            RUNNING => Self::Running,
            _ => Self::Faulted,
        }
    }
}

impl fmt::Display for ExporterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running => f.write_str("running"),
            Self::Faulted => f.write_str("faulted"),
        }
    }
}

/// Thread-safe counters for the background loop.
#[derive(Debug, Default)]
pub struct ExportStats {
    /// Export ticks handled (scheduled ticks plus manual flushes)
    pub ticks: AtomicU64,
    /// Samples declared and written
    pub samples_sent: AtomicU64,
    /// Samples that failed to send
    pub send_errors: AtomicU64,
    /// Liveness checks run
    pub pings: AtomicU64,
    /// Successful reopens after a failed liveness check
    pub reconnects: AtomicU64,
    /// Faults caught by the recovery boundary
    pub faults: AtomicU64,
}

impl ExportStats {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn samples_sent(&self) -> u64 {
        self.samples_sent.load(Ordering::Relaxed)
    }

    pub fn send_errors(&self) -> u64 {
        self.send_errors.load(Ordering::Relaxed)
    }

    pub fn pings(&self) -> u64 {
        self.pings.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    fn record_dispatch(&self, summary: &DispatchSummary) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.samples_sent.fetch_add(summary.samples_sent, Ordering::Relaxed);
        self.send_errors.fetch_add(summary.samples_failed, Ordering::Relaxed);
    }
}

struct Inner {
    config: ExporterConfig,
    registry: Arc<dyn Registry>,
    client: Arc<dyn CollectorClientBoxed>,
    state: AtomicU8,
    stats: ExportStats,
}

/// Periodic push exporter from a [`Registry`] to a collector client.
#[derive(Clone)]
pub struct Exporter {
    inner: Arc<Inner>,
}

impl Exporter {
    /// Validates `config` and opens `client` against the configured collectors.
    ///
    /// Fails with [`ExporterError::Config`] when no collector is configured and
    /// with [`ExporterError::Connection`] when the client cannot be opened.
    pub async fn new(
        config: ExporterConfig,
        registry: Arc<dyn Registry>,
        client: Arc<dyn CollectorClientBoxed>,
    ) -> Result<Self, ExporterError> {
        let config = config.validate()?;

        client
            .open_boxed(&config.collectors)
            .await
            .map_err(ExporterError::Connection)?;

        tracing::info!(
            client = client.name(),
            collectors = ?config.collectors,
            interval = ?config.interval,
            ping_interval = ?config.ping_interval,
            "exporter ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                registry,
                client,
                state: AtomicU8::new(IDLE),
                stats: ExportStats::default(),
            }),
        })
    }

    /// Launches the background loop on the current Tokio runtime.
    ///
    /// Only the first call on an exporter (or any of its clones) launches the
    /// loop; later calls return `false` and do nothing. Also returns `false`
    /// without changing state when called outside a runtime.
    pub fn start(&self) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!("exporter start requires a running Tokio runtime");
            return false;
        };

        if self
            .inner
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(state = %self.state(), "exporter already started");
            return false;
        }

        let exporter = self.clone();
        runtime.spawn(async move { exporter.supervise().await });
        true
    }

    /// Runs one export cycle immediately, independent of the background loop.
    pub async fn flush(&self) -> Result<DispatchSummary, DispatchError> {
        let inner = &self.inner;
        let result = Dispatcher::new(inner.registry.as_ref(), inner.client.as_ref())
            .with_callbacks(&inner.config.callbacks)
            .dispatch()
            .await;

        match &result {
            Ok(summary) => inner.stats.record_dispatch(summary),
            Err(e) => inner.stats.record_dispatch(&e.summary),
        }
        result
    }

    pub fn state(&self) -> ExporterState {
        ExporterState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> &ExportStats {
        &self.inner.stats
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.inner.config
    }

    async fn supervise(self) {
        match FaultBoundary::new(self.run()).await {
            Ok(never) => match never {},
            Err(fault) => self.handle_fault(&fault),
        }
    }

    async fn run(&self) -> Infallible {
        let config = &self.inner.config;
        let mut export = ticker(config.interval);
        let mut liveness = ticker(config.ping_interval);

        loop {
            tokio::select! {
                _ = export.tick() => {
                    if let Err(e) = self.flush().await {
                        tracing::warn!(error = %e, "unable to send metrics to collector");
                    }
                }
                _ = liveness.tick() => self.check_liveness().await,
            }
        }
    }

    async fn check_liveness(&self) {
        let inner = &self.inner;
        inner.stats.pings.fetch_add(1, Ordering::Relaxed);

        let Err(e) = inner.client.ping_boxed().await else {
            return;
        };
        tracing::warn!(error = %e, client = inner.client.name(), "collector liveness check failed, reopening");

        match inner.client.open_boxed(&inner.config.collectors).await {
            Ok(()) => {
                inner.stats.reconnects.fetch_add(1, Ordering::Relaxed);
                tracing::info!(collectors = ?inner.config.collectors, "collector client reopened");
            }
            Err(e) => tracing::error!(error = %e, "failed to reopen collector client"),
        }
    }

    fn handle_fault(&self, fault: &Fault) {
        self.inner.state.store(FAULTED, Ordering::Release);
        self.inner.stats.faults.fetch_add(1, Ordering::Relaxed);
        tracing::error!(error = %fault, trace = %fault.trace(), "export loop stopped");

        for (index, handler) in self.inner.config.fault_handlers.iter().enumerate() {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(self, fault))).is_err() {
                tracing::error!(handler = index, "fault handler panicked");
            }
        }
    }
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("client", &self.inner.client.name())
            .field("state", &self.state())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Interval whose first tick is one full period away.
fn ticker(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
