use crate::rule::RuleDefinition;
use chrono::{DateTime, Duration, Utc};
use monres_common::types::Sample;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};

/// Capacity used when the retention horizon or interval is not positive.
pub const DEFAULT_CAPACITY: usize = 60;

/// Smallest capacity a series may have.
pub const MIN_CAPACITY: usize = 2;

/// Slack added in front of every window so a sample collected a hair
/// outside the nominal window is still included.
const WINDOW_SLACK_SECS: i64 = 1;

/// Upper bound on the per-series allocation made up front.
const MAX_PREALLOC: usize = 4096;

/// Per-metric rolling history shared between the tick driver and readers.
///
/// Every series holds at most `capacity` samples; appends past that evict
/// from the front in insertion order, regardless of timestamps. The lock is
/// taken for a single append or read and never held across calls.
pub struct MetricHistory {
    capacity: usize,
    series: RwLock<HashMap<String, VecDeque<Sample>>>,
}

impl MetricHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(MIN_CAPACITY),
            series: RwLock::new(HashMap::new()),
        }
    }

    /// Sizes the buffer to cover `horizon_secs` of history sampled every
    /// `interval_secs`.
    pub fn with_retention(horizon_secs: u64, interval_secs: u64) -> Self {
        Self::new(capacity_for(horizon_secs, interval_secs))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&self, metric: &str, value: f64, timestamp: DateTime<Utc>) {
        let mut series = self.series.write();
        let points = series
            .entry(metric.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity.min(MAX_PREALLOC)));

        points.push_back(Sample::new(timestamp, value));
        while points.len() > self.capacity {
            points.pop_front();
        }
    }

    pub fn latest(&self, metric: &str) -> Option<Sample> {
        self.series.read().get(metric).and_then(|p| p.back().copied())
    }

    /// Samples within `duration_secs` (plus one second of slack) before
    /// `as_of`, oldest first. A zero duration yields only the latest sample.
    pub fn window(&self, metric: &str, duration_secs: u64, as_of: DateTime<Utc>) -> Vec<Sample> {
        let series = self.series.read();
        let Some(points) = series.get(metric) else {
            return Vec::new();
        };

        if duration_secs == 0 {
            return points.back().copied().into_iter().collect();
        }

        let reach = i64::try_from(duration_secs)
            .unwrap_or(i64::MAX)
            .saturating_add(WINDOW_SLACK_SECS);
        let cutoff = Duration::try_seconds(reach)
            .and_then(|span| as_of.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut window: Vec<Sample> = points
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .copied()
            .collect();
        drop(series);

        // Stable, so equal timestamps keep insertion order; a no-op when the
        // caller appended in time order.
        window.sort_by_key(|s| s.timestamp);
        window
    }

    /// Number of samples currently held for `metric`.
    pub fn len(&self, metric: &str) -> usize {
        self.series.read().get(metric).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.series.read().values().all(VecDeque::is_empty)
    }

    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.series.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// `ceil(horizon / interval) + 1`, floored at [`MIN_CAPACITY`].
///
/// # Examples
///
/// ```
/// use monres_alert::history::capacity_for;
///
/// assert_eq!(capacity_for(600, 30), 21);
/// assert_eq!(capacity_for(90, 60), 3);
/// assert_eq!(capacity_for(10, 30), 2);
/// assert_eq!(capacity_for(0, 30), 60);
/// ```
pub fn capacity_for(horizon_secs: u64, interval_secs: u64) -> usize {
    if horizon_secs == 0 || interval_secs == 0 {
        return DEFAULT_CAPACITY;
    }
    let slots = horizon_secs.div_ceil(interval_secs).saturating_add(1);
    usize::try_from(slots).unwrap_or(usize::MAX).max(MIN_CAPACITY)
}

/// Retention horizon for the whole buffer: the longest rule duration, but
/// never less than two collection intervals.
pub fn max_configured_duration_secs(rules: &[RuleDefinition], interval_secs: u64) -> u64 {
    let floor = interval_secs.saturating_mul(2);
    rules
        .iter()
        .map(|r| r.duration_secs)
        .max()
        .unwrap_or(0)
        .max(floor)
}
