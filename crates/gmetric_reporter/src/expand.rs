//! Kind expanders.
//!
//! Each expander turns one registry snapshot into an ordered list of
//! [`Sample`]s, one per statistic. Suffixes are fixed per kind, so the
//! sub-metric names for a given registry name never change between ticks.

use crate::model::{MetricModel, MetricValue, Slope, ValueType};
use crate::snapshot::{MeterSnapshot, Metric, SampleSnapshot, TimerSnapshot};

/// Percentile suffixes and the fractions they are evaluated at.
pub const PERCENTILES: [(&str, f64); 6] = [
    ("p50", 0.50),
    ("p75", 0.75),
    ("p95", 0.95),
    ("p98", 0.98),
    ("p99", 0.99),
    ("p999", 0.999),
];

/// One declaration plus the value to send after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub model: MetricModel,
    pub value: MetricValue,
}

struct Expansion<'a> {
    prefix: &'a str,
    samples: Vec<Sample>,
}

impl<'a> Expansion<'a> {
    fn new(prefix: &'a str, capacity: usize) -> Self {
        Self {
            prefix,
            samples: Vec::with_capacity(capacity),
        }
    }

    fn int(&mut self, suffix: &str, slope: Slope, value: i64) -> &mut Self {
        self.push(suffix, ValueType::Int32, slope, MetricValue::Int(value))
    }

    fn float(&mut self, suffix: &str, value: f64) -> &mut Self {
        self.push(suffix, ValueType::Float32, Slope::Both, MetricValue::Float(value))
    }

    fn push(&mut self, suffix: &str, vt: ValueType, slope: Slope, value: MetricValue) -> &mut Self {
        self.samples.push(Sample {
            model: MetricModel::typed(self.prefix, suffix, vt, slope),
            value,
        });
        self
    }

    fn percentiles(&mut self, sample: &SampleSnapshot) -> &mut Self {
        let fractions: Vec<f64> = PERCENTILES.iter().map(|(_, p)| *p).collect();
        for ((suffix, _), value) in PERCENTILES.iter().zip(sample.percentiles(&fractions)) {
            self.float(suffix, value);
        }
        self
    }

    fn rates(&mut self, meter: &MeterSnapshot) -> &mut Self {
        self.float("mean_rate", meter.rate_mean)
            .float("m1_rate", meter.rate1)
            .float("m5_rate", meter.rate5)
            .float("m15_rate", meter.rate15)
    }

    fn finish(self) -> Vec<Sample> {
        self.samples
    }
}

/// Routes a snapshot to its expander. Returns `None` for unsupported kinds.
pub fn expand(name: &str, metric: &Metric) -> Option<Vec<Sample>> {
    let samples = match metric {
        Metric::Counter(count) => expand_counter(name, *count),
        Metric::Gauge(value) => expand_gauge(name, *value),
        Metric::Meter(meter) => expand_meter(name, meter),
        Metric::Timer(timer) => expand_timer(name, timer),
        Metric::Histogram(sample) => expand_histogram(name, sample),
        Metric::Unsupported { .. } => return None,
    };
    Some(samples)
}

pub fn expand_counter(name: &str, count: i64) -> Vec<Sample> {
    let mut e = Expansion::new(name, 1);
    e.int("count", Slope::Positive, count);
    e.finish()
}

pub fn expand_gauge(name: &str, value: f64) -> Vec<Sample> {
    let mut e = Expansion::new(name, 1);
    e.float("value", value);
    e.finish()
}

pub fn expand_meter(name: &str, meter: &MeterSnapshot) -> Vec<Sample> {
    let mut e = Expansion::new(name, 5);
    e.int("count", Slope::Positive, meter.count).rates(meter);
    e.finish()
}

pub fn expand_timer(name: &str, timer: &TimerSnapshot) -> Vec<Sample> {
    let sample = &timer.sample;
    let mut e = Expansion::new(name, 17);
    e.int("count", Slope::Positive, timer.meter.count)
        .int("max", Slope::Positive, sample.max())
        .int("min", Slope::Both, sample.min())
        .float("mean", sample.mean())
        .rates(&timer.meter)
        .float("variance", sample.variance())
        .float("stddev", sample.stddev())
        .int("sum", Slope::Positive, sample.sum())
        .percentiles(sample);
    e.finish()
}

pub fn expand_histogram(name: &str, sample: &SampleSnapshot) -> Vec<Sample> {
    let mut e = Expansion::new(name, 10);
    e.int("max", Slope::Positive, sample.max())
        .int("min", Slope::Both, sample.min())
        .float("stddev", sample.stddev())
        .float("variance", sample.variance())
        .percentiles(sample);
    e.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn suffixes(name: &str, samples: &[Sample]) -> Vec<String> {
        samples
            .iter()
            .map(|s| {
                s.model
                    .name
                    .strip_prefix(&format!("{name}."))
                    .expect("sub-metric keeps its prefix")
                    .to_string()
            })
            .collect()
    }

    fn timer() -> TimerSnapshot {
        TimerSnapshot {
            sample: SampleSnapshot::new(vec![100, 200, 300, 400, 500]),
            meter: MeterSnapshot {
                count: 5,
                rate1: 0.2,
                rate5: 0.1,
                rate15: 0.05,
                rate_mean: 1.5,
            },
        }
    }

    #[test]
    fn test_counter_expansion() {
        let samples = expand_counter("conn1", 7);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].model.name, "conn1.count");
        assert_eq!(samples[0].model.slope, Slope::Positive);
        assert_eq!(samples[0].value, MetricValue::Int(7));
    }

    #[test]
    fn test_gauge_expansion() {
        let samples = expand_gauge("conn3", 2.0);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].model.name, "conn3.value");
        assert_eq!(samples[0].model.value_type, ValueType::Float32);
        assert_eq!(samples[0].model.slope, Slope::Both);
        assert_eq!(samples[0].value, MetricValue::Float(2.0));
    }

    #[test]
    fn test_meter_suffixes_in_order() {
        let meter = MeterSnapshot {
            count: 15,
            ..Default::default()
        };
        let samples = expand_meter("conn5", &meter);
        assert_eq!(
            suffixes("conn5", &samples),
            ["count", "mean_rate", "m1_rate", "m5_rate", "m15_rate"]
        );
        assert_eq!(samples[0].value, MetricValue::Int(15));
        assert_eq!(samples[0].model.value_type, ValueType::Int32);
    }

    #[test]
    fn test_timer_suffixes_and_hints() {
        let samples = expand_timer("conn6", &timer());
        assert_eq!(
            suffixes("conn6", &samples),
            [
                "count", "max", "min", "mean", "mean_rate", "m1_rate", "m5_rate", "m15_rate",
                "variance", "stddev", "sum", "p50", "p75", "p95", "p98", "p99", "p999"
            ]
        );

        let by_suffix = |suffix: &str| {
            samples
                .iter()
                .find(|s| s.model.name == format!("conn6.{suffix}"))
                .unwrap()
                .clone()
        };
        assert_eq!(by_suffix("max").value, MetricValue::Int(500));
        assert_eq!(by_suffix("max").model.slope, Slope::Positive);
        assert_eq!(by_suffix("min").model.slope, Slope::Both);
        assert_eq!(by_suffix("sum").value, MetricValue::Int(1500));
        assert_eq!(by_suffix("mean_rate").value, MetricValue::Float(1.5));
        assert_eq!(by_suffix("p50").value, MetricValue::Float(300.0));
    }

    #[test]
    fn test_histogram_expansion() {
        let samples = expand_histogram("conn7", &SampleSnapshot::new(vec![2, 4, 6, 8, 10]));
        assert_eq!(
            suffixes("conn7", &samples),
            ["max", "min", "stddev", "variance", "p50", "p75", "p95", "p98", "p99", "p999"]
        );
        assert_eq!(samples[0].value, MetricValue::Int(10));
        assert_eq!(samples[1].value, MetricValue::Int(2));
        for s in &samples[4..] {
            assert!(matches!(s.value, MetricValue::Float(_)));
            assert_eq!(s.model.value_type, ValueType::Float32);
        }
    }

    #[test]
    fn test_unsupported_kind_is_skipped() {
        let metric = Metric::Unsupported {
            kind: "healthcheck".into(),
        };
        assert!(expand("db", &metric).is_none());
    }

    #[test]
    fn test_suffixes_unique_per_kind() {
        let metrics = [
            Metric::Counter(1),
            Metric::Gauge(1.0),
            Metric::Meter(MeterSnapshot::default()),
            Metric::Timer(timer()),
            Metric::Histogram(SampleSnapshot::new(vec![1, 2, 3])),
        ];
        for metric in &metrics {
            let samples = expand("m", metric).unwrap();
            let unique: HashSet<_> = samples.iter().map(|s| &s.model.name).collect();
            assert_eq!(unique.len(), samples.len(), "duplicate suffix for {}", metric.kind());
        }
    }

    proptest! {
        #[test]
        fn prop_histogram_expansion_is_deterministic(values in prop::collection::vec(-1_000i64..1_000, 0..64)) {
            let sample = SampleSnapshot::new(values);
            let a = expand_histogram("h", &sample);
            let b = expand_histogram("h", &sample);
            prop_assert_eq!(a, b);
        }
    }
}
