use std::time::Instant;

/// Intervals shorter than this are treated as "no usable previous sample".
pub const MIN_RATE_INTERVAL_SECS: f64 = 0.1;

/// Difference between two readings of a monotonically increasing `u64`
/// counter, assuming at most one wraparound in between.
///
/// When `curr < prev` this is `(u64::MAX - prev) + curr + 1`.
pub fn counter_delta(prev: u64, curr: u64) -> u64 {
    curr.wrapping_sub(prev)
}

/// Per-second rate between two counter readings taken `elapsed_secs` apart.
///
/// A non-positive `elapsed_secs` yields 0. The result is never negative and
/// never clamped from above.
///
/// # Examples
///
/// ```
/// use monres_collector::rate::counter_rate;
///
/// assert_eq!(counter_rate(1000, 3000, 2.0), 1000.0);
/// assert_eq!(counter_rate(u64::MAX - 1000, 2000, 1.0), 3001.0);
/// assert_eq!(counter_rate(5, 10, 0.0), 0.0);
/// ```
pub fn counter_rate(prev: u64, curr: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs.is_nan() || elapsed_secs <= 0.0 {
        return 0.0;
    }
    counter_delta(prev, curr) as f64 / elapsed_secs
}

/// Seconds between the previous reading and `now`, or 0 when there is no
/// previous reading or it is too recent to give a meaningful rate.
pub fn elapsed_since(previous: Option<Instant>, now: Instant) -> f64 {
    let Some(previous) = previous else {
        return 0.0;
    };
    let elapsed = now.saturating_duration_since(previous).as_secs_f64();
    if elapsed < MIN_RATE_INTERVAL_SECS {
        0.0
    } else {
        elapsed
    }
}

/// A pair of directional counters read together, such as bytes
/// read/written or received/sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub inbound: u64,
    pub outbound: u64,
}

impl CounterSnapshot {
    pub fn new(inbound: u64, outbound: u64) -> Self {
        Self { inbound, outbound }
    }

    /// `(inbound, outbound)` per-second rates since `prev`. Each direction is
    /// computed from its own counter only.
    pub fn rates(&self, prev: &CounterSnapshot, elapsed_secs: f64) -> (f64, f64) {
        (
            counter_rate(prev.inbound, self.inbound, elapsed_secs),
            counter_rate(prev.outbound, self.outbound, elapsed_secs),
        )
    }
}

/// Cumulative CPU jiffies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    /// user + nice + system + idle + iowait + irq + softirq + steal
    pub total: u64,
    pub idle: u64,
}

/// Busy percentage between two CPU readings, clamped to `[0, 100]`.
///
/// # Examples
///
/// ```
/// use monres_collector::rate::{cpu_busy_percent, CpuTimes};
///
/// let prev = CpuTimes { total: 1000, idle: 800 };
/// let curr = CpuTimes { total: 1100, idle: 870 };
/// assert!((cpu_busy_percent(prev, curr) - 30.0).abs() < 1e-9);
/// assert_eq!(cpu_busy_percent(curr, curr), 0.0);
/// ```
pub fn cpu_busy_percent(prev: CpuTimes, curr: CpuTimes) -> f64 {
    let total = counter_delta(prev.total, curr.total);
    if total == 0 {
        return 0.0;
    }
    let idle = counter_delta(prev.idle, curr.idle);
    let busy = (1.0 - idle as f64 / total as f64) * 100.0;
    busy.clamp(0.0, 100.0)
}
