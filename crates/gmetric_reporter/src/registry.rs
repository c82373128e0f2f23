//! Registry collaborator.
//!
//! The exporter only needs to enumerate the registry; storage, locking and
//! metric updates belong to whatever implements [`Registry`].

use crate::snapshot::Metric;

/// Source of metric snapshots.
///
/// `each` must call `visit` exactly once per registered metric with a fresh
/// snapshot. Implementations must not call back into the exporter from
/// `visit`.
pub trait Registry: Send + Sync {
    fn each(&self, visit: &mut dyn FnMut(&str, &Metric));
}

/// A fixed, ordered list of snapshots.
///
/// Useful for tests and demos, and as an adapter target for registries that
/// can produce all their snapshots up front.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: Vec<(String, Metric)>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any existing entry with the same name in place.
    pub fn register(&mut self, name: impl Into<String>, metric: Metric) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = metric,
            None => self.entries.push((name, metric)),
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, metric: Metric) -> Self {
        self.register(name, metric);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Registry for StaticRegistry {
    fn each(&self, visit: &mut dyn FnMut(&str, &Metric)) {
        for (name, metric) in &self.entries {
            visit(name, metric);
        }
    }
}
