use crate::rate::{cpu_busy_percent, CpuTimes};
use crate::Collector;
use anyhow::{bail, Context, Result};
use monres_common::types::CollectedMetrics;
use std::path::PathBuf;

const PROC_STAT: &str = "/proc/stat";

/// Reports `cpu_percent_total` from the aggregate line of `/proc/stat`.
/// The first collection has no baseline and reports 0.
pub struct CpuCollector {
    stat_path: PathBuf,
    previous: Option<CpuTimes>,
}

impl CpuCollector {
    pub fn new() -> Self {
        Self::with_path(PROC_STAT)
    }

    pub fn with_path(stat_path: impl Into<PathBuf>) -> Self {
        Self {
            stat_path: stat_path.into(),
            previous: None,
        }
    }
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for CpuCollector {
    fn name(&self) -> &str {
        "cpu"
    }

    fn collect(&mut self) -> Result<CollectedMetrics> {
        let content = std::fs::read_to_string(&self.stat_path)
            .with_context(|| format!("failed to read {}", self.stat_path.display()))?;
        let current = parse_proc_stat(&content)?;

        let busy = match self.previous.replace(current) {
            Some(previous) => cpu_busy_percent(previous, current),
            None => 0.0,
        };

        let mut metrics = CollectedMetrics::new();
        metrics.insert("cpu_percent_total".to_string(), busy);
        Ok(metrics)
    }
}

/// Extracts total and idle jiffies from the aggregate `cpu` line.
///
/// user, nice, system and idle are required; iowait, irq, softirq and steal
/// count towards the total when present. guest time is already part of user.
pub fn parse_proc_stat(content: &str) -> Result<CpuTimes> {
    let Some(line) = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
    else {
        bail!("cpu line not found in /proc/stat");
    };

    let fields: Vec<&str> = line.split_whitespace().skip(1).collect();
    if fields.len() < 4 {
        bail!("invalid cpu stat line: {line}");
    }

    let mut values = [0u64; 8];
    for (i, slot) in values.iter_mut().enumerate() {
        match fields.get(i) {
            Some(raw) => {
                *slot = raw
                    .parse()
                    .with_context(|| format!("invalid cpu counter '{raw}'"))?;
            }
            None => break,
        }
    }

    let total = values.iter().fold(0u64, |acc, v| acc.wrapping_add(*v));
    Ok(CpuTimes {
        total,
        idle: values[3],
    })
}
