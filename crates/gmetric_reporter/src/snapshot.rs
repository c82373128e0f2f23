//! Frozen, read-only views of registry metrics.
//!
//! The registry produces one [`Metric`] per entry on every tick. The exporter
//! reads these views and never holds on to them past the tick.

/// A kind-tagged snapshot of one registry entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Metric {
    Counter(i64),
    Gauge(f64),
    Meter(MeterSnapshot),
    Timer(TimerSnapshot),
    Histogram(SampleSnapshot),
    /// A kind the exporter has no expansion for (health checks, EWMAs, ...).
    /// Skipped during dispatch.
    Unsupported { kind: String },
}

impl Metric {
    /// Short kind name, used in log fields.
    pub fn kind(&self) -> &str {
        match self {
            Self::Counter(_) => "counter",
            Self::Gauge(_) => "gauge",
            Self::Meter(_) => "meter",
            Self::Timer(_) => "timer",
            Self::Histogram(_) => "histogram",
            Self::Unsupported { kind } => kind,
        }
    }
}

/// Event count plus exponentially-weighted rates, in events per second.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

/// A timer is a latency sample paired with a meter of how often it was hit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerSnapshot {
    pub sample: SampleSnapshot,
    pub meter: MeterSnapshot,
}

/// The values currently held by a histogram's reservoir.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSnapshot {
    values: Vec<i64>,
}

impl SampleSnapshot {
    pub fn new(values: Vec<i64>) -> Self {
        Self { values }
    }

    pub fn count(&self) -> i64 {
        self.values.len() as i64
    }

    pub fn max(&self) -> i64 {
        self.values.iter().copied().max().unwrap_or(0)
    }

    pub fn min(&self) -> i64 {
        self.values.iter().copied().min().unwrap_or(0)
    }

    pub fn sum(&self) -> i64 {
        self.values.iter().fold(0i64, |acc, v| acc.saturating_add(*v))
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|v| *v as f64).sum::<f64>() / self.values.len() as f64
    }

    /// Population variance.
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq: f64 = self
            .values
            .iter()
            .map(|v| {
                let d = *v as f64 - mean;
                d * d
            })
            .sum();
        sum_sq / self.values.len() as f64
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Value at fraction `p` (0.0..=1.0) of the sorted sample.
    ///
    /// Interpolates linearly at position `p * (n + 1)`; positions below 1 (or
    /// NaN) clamp to the minimum and positions at or past `n` clamp to the
    /// maximum.
    pub fn percentile(&self, p: f64) -> f64 {
        self.percentiles(&[p])[0]
    }

    /// Evaluates several fractions against one sorted copy of the sample.
    pub fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        if self.values.is_empty() {
            return vec![0.0; ps.len()];
        }
        let mut sorted = self.values.clone();
        sorted.sort_unstable();
        let n = sorted.len() as f64;

        ps.iter()
            .map(|p| {
                let pos = p * (n + 1.0);
                if pos.is_nan() || pos < 1.0 {
                    sorted[0] as f64
                } else if pos >= n {
                    sorted[sorted.len() - 1] as f64
                } else {
                    let lower = sorted[pos as usize - 1] as f64;
                    let upper = sorted[pos as usize] as f64;
                    lower + (pos - pos.floor()) * (upper - lower)
                }
            })
            .collect()
    }
}

impl From<Vec<i64>> for SampleSnapshot {
    fn from(values: Vec<i64>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_basic_statistics() {
        let s = SampleSnapshot::new(vec![2, 4, 6, 8, 10]);
        assert_eq!(s.count(), 5);
        assert_eq!(s.max(), 10);
        assert_eq!(s.min(), 2);
        assert_eq!(s.sum(), 30);
        assert_eq!(s.mean(), 6.0);
        assert_eq!(s.variance(), 8.0);
        assert!((s.stddev() - 8.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_interpolation() {
        let s = SampleSnapshot::new(vec![10, 2, 8, 4, 6]);
        // pos = 0.5 * 6 = 3 -> third value exactly
        assert_eq!(s.percentile(0.5), 6.0);
        // pos = 0.75 * 6 = 4.5 -> halfway between 8 and 10
        assert_eq!(s.percentile(0.75), 9.0);
        // pos = 0.1 * 6 = 0.6 -> clamps to min
        assert_eq!(s.percentile(0.1), 2.0);
        // pos = 0.99 * 6 >= 5 -> clamps to max
        assert_eq!(s.percentile(0.99), 10.0);
    }

    #[test]
    fn test_non_finite_fraction_clamps() {
        let s = SampleSnapshot::new(vec![3, 1, 2]);
        assert_eq!(s.percentile(f64::NAN), 1.0);
        assert_eq!(s.percentile(f64::NEG_INFINITY), 1.0);
        assert_eq!(s.percentile(f64::INFINITY), 3.0);
        assert_eq!(s.percentile(-0.5), 1.0);
    }

    #[test]
    fn test_sum_saturates_instead_of_wrapping() {
        assert_eq!(SampleSnapshot::new(vec![i64::MAX, 1, 1]).sum(), i64::MAX);
        assert_eq!(SampleSnapshot::new(vec![i64::MIN, -1]).sum(), i64::MIN);
    }

    #[test]
    fn test_empty_sample_is_all_zero() {
        let s = SampleSnapshot::default();
        assert_eq!(s.max(), 0);
        assert_eq!(s.min(), 0);
        assert_eq!(s.mean(), 0.0);
        assert_eq!(s.variance(), 0.0);
        assert_eq!(s.percentiles(&[0.5, 0.99]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Metric::Counter(1).kind(), "counter");
        assert_eq!(Metric::Histogram(SampleSnapshot::default()).kind(), "histogram");
        let other = Metric::Unsupported { kind: "healthcheck".into() };
        assert_eq!(other.kind(), "healthcheck");
    }
}
