//! Sub-metric declarations.
//!
//! A [`MetricModel`] tells the collector how to interpret and retain one
//! scalar time series. Models are rebuilt for every send; they carry no state
//! beyond their fields and cost a single `String` allocation.

use std::fmt;
use std::time::Duration;

/// How often the collector expects a fresh value for a sub-metric.
pub const TICK_INTERVAL: Duration = Duration::from_secs(20);

/// How long the collector retains a sub-metric after its last value.
pub const LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Wire type of a sub-metric's value.
///
/// `Unknown` is the zero value left behind when [`MetricModel::build`] is
/// handed a type name it does not recognise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ValueType {
    #[default]
    Unknown,
    Int32,
    UInt32,
    Float32,
}

impl ValueType {
    /// Maps a type literal (`"int32"`, `"uint32"`, `"float32"`) to its variant.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int32" => Some(Self::Int32),
            "uint32" => Some(Self::UInt32),
            "float32" => Some(Self::Float32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Float32 => "float32",
        }
    }
}

/// Monotonicity hint for a time series.
///
/// `Zero` is the zero value left behind by an unrecognised slope name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Slope {
    #[default]
    Zero,
    Positive,
    Negative,
    Both,
}

impl Slope {
    /// Maps a slope literal (`"positive"`, `"negative"`, `"both"`) to its variant.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Both => "both",
        }
    }
}

/// Declaration record for one sub-metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricModel {
    /// Full sub-metric name, `"<metric>.<suffix>"`.
    pub name: String,
    pub value_type: ValueType,
    pub slope: Slope,
    pub tick_interval: Duration,
    pub lifetime: Duration,
}

impl MetricModel {
    /// Builds a model for `prefix.suffix` from string literals.
    ///
    /// Unknown `value_type` or `slope` names are accepted and leave the field at
    /// its zero value ([`ValueType::Unknown`], [`Slope::Zero`]). Callers are
    /// expected to pass only the documented literals.
    pub fn build(prefix: &str, suffix: &str, value_type: &str, slope: &str) -> Self {
        Self::typed(
            prefix,
            suffix,
            ValueType::from_name(value_type).unwrap_or_default(),
            Slope::from_name(slope).unwrap_or_default(),
        )
    }

    /// Builds a model for `prefix.suffix` from already-typed hints.
    pub fn typed(prefix: &str, suffix: &str, value_type: ValueType, slope: Slope) -> Self {
        Self {
            name: format!("{prefix}.{suffix}"),
            value_type,
            slope,
            tick_interval: TICK_INTERVAL,
            lifetime: LIFETIME,
        }
    }
}

/// A numeric value handed to the collector client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Int(value)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::UInt(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Float(value)
    }
}
