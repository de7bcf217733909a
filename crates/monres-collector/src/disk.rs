use crate::rate::{elapsed_since, CounterSnapshot};
use crate::Collector;
use anyhow::{Context, Result};
use monres_common::types::CollectedMetrics;
use std::path::PathBuf;
use std::time::Instant;

const PROC_DISKSTATS: &str = "/proc/diskstats";
const SECTOR_SIZE: u64 = 512;
const IGNORED_DEVICE_PREFIXES: [&str; 4] = ["loop", "ram", "sr", "fd"];

/// Reports `disk_read_bytes_ps` and `disk_write_bytes_ps` summed over all
/// block devices except loop, ram, optical and floppy devices.
pub struct DiskCollector {
    diskstats_path: PathBuf,
    previous: Option<(CounterSnapshot, Instant)>,
}

impl DiskCollector {
    pub fn new() -> Self {
        Self::with_path(PROC_DISKSTATS)
    }

    pub fn with_path(diskstats_path: impl Into<PathBuf>) -> Self {
        Self {
            diskstats_path: diskstats_path.into(),
            previous: None,
        }
    }
}

impl Default for DiskCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for DiskCollector {
    fn name(&self) -> &str {
        "disk"
    }

    fn collect(&mut self) -> Result<CollectedMetrics> {
        let content = std::fs::read_to_string(&self.diskstats_path)
            .with_context(|| format!("failed to read {}", self.diskstats_path.display()))?;
        let now = Instant::now();
        let current = parse_diskstats(&content);

        let (read, write) = match self.previous.replace((current, now)) {
            Some((previous, at)) => current.rates(&previous, elapsed_since(Some(at), now)),
            None => (0.0, 0.0),
        };

        let mut metrics = CollectedMetrics::new();
        metrics.insert("disk_read_bytes_ps".to_string(), read);
        metrics.insert("disk_write_bytes_ps".to_string(), write);
        Ok(metrics)
    }
}

pub fn is_relevant_device(name: &str) -> bool {
    !IGNORED_DEVICE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Sums bytes read (inbound) and written (outbound) over relevant devices.
/// Short or malformed lines are skipped.
pub fn parse_diskstats(content: &str) -> CounterSnapshot {
    let mut sectors = CounterSnapshot::default();

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 || !is_relevant_device(fields[2]) {
            continue;
        }
        let (Ok(read), Ok(written)) = (fields[5].parse::<u64>(), fields[9].parse::<u64>()) else {
            continue;
        };
        sectors.inbound = sectors.inbound.wrapping_add(read);
        sectors.outbound = sectors.outbound.wrapping_add(written);
    }

    CounterSnapshot::new(
        sectors.inbound.wrapping_mul(SECTOR_SIZE),
        sectors.outbound.wrapping_mul(SECTOR_SIZE),
    )
}
