use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// One observation of a metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Metric values produced by one collection pass, keyed by metric name.
pub type CollectedMetrics = BTreeMap<String, f64>;

/// Rule name -> active flag. Only active rules are ever written as `true`.
pub type ActiveAlerts = BTreeMap<String, bool>;

/// Comparison applied between a rule's representative value and its threshold.
///
/// `Equal` and `NotEqual` use exact floating point equality.
///
/// # Examples
///
/// ```
/// use monres_common::types::CompareOp;
///
/// let op: CompareOp = ">=".parse().unwrap();
/// assert_eq!(op, CompareOp::GreaterEqual);
/// assert_eq!(op.to_string(), ">=");
/// assert!(op.check(90.0, 90.0));
/// assert!("=>".parse::<CompareOp>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    Equal,
    NotEqual,
}

impl std::str::FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Self::GreaterThan),
            "<" => Ok(Self::LessThan),
            ">=" => Ok(Self::GreaterEqual),
            "<=" => Ok(Self::LessEqual),
            "=" => Ok(Self::Equal),
            "!=" => Ok(Self::NotEqual),
            _ => Err(format!("unknown condition: {s}")),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterEqual => ">=",
            Self::LessEqual => "<=",
            Self::Equal => "=",
            Self::NotEqual => "!=",
        };
        f.write_str(s)
    }
}

impl CompareOp {
    #[allow(clippy::float_cmp)]
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessEqual => value <= threshold,
            Self::Equal => value == threshold,
            Self::NotEqual => value != threshold,
        }
    }
}

/// Reduction applied to a window of samples for duration-based rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Average,
    Max,
}

impl std::str::FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "average" => Ok(Self::Average),
            "max" => Ok(Self::Max),
            _ => Err(format!("unknown aggregation: {s}")),
        }
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Average => write!(f, "average"),
            Self::Max => write!(f, "max"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Fired,
    Resolved,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Fired => write!(f, "FIRED"),
            EventKind::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// A fire/resolve transition of one rule, handed to the notification layer.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub rule_name: String,
    pub metric_name: String,
    pub kind: EventKind,
    pub hostname: String,
    pub timestamp: DateTime<Utc>,
    /// Representative value that caused the transition (latest sample or aggregate)
    pub value: f64,
    pub threshold: f64,
    pub condition: CompareOp,
    /// Duration as written in the configuration (e.g. "5m"), empty for instantaneous rules
    pub duration: String,
    pub aggregation: Option<Aggregation>,
    pub channels: Vec<String>,
}
