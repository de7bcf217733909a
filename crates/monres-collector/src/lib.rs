//! Host metric collection for monres.
//!
//! Each [`Collector`] reads one category of host counters (CPU, memory, disk,
//! network) and returns a flat `metric name -> value` map. Counter-based
//! metrics are converted to per-second rates with [`rate`], using state kept
//! inside the collector instance.

pub mod cpu;
pub mod disk;
pub mod memory;
pub mod network;
pub mod rate;


use anyhow::Result;
use monres_common::types::CollectedMetrics;

pub use cpu::CpuCollector;
pub use disk::DiskCollector;
pub use memory::MemoryCollector;
pub use network::{NetworkCollector, NetworkInterfaceFilter};

/// A source of host metrics, called once per collection interval.
pub trait Collector: Send + Sync {
    /// Collector name (e.g. `"cpu"`), used in logs.
    fn name(&self) -> &str;

    /// Collects current metric values.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system source cannot be read.
    fn collect(&mut self) -> Result<CollectedMetrics>;
}

/// Outcome of one pass over every collector.
#[derive(Debug, Default)]
pub struct CollectionReport {
    pub metrics: CollectedMetrics,
    pub failed: usize,
}

/// Runs a fixed list of collectors and merges their output.
pub struct CollectorSet {
    collectors: Vec<Box<dyn Collector>>,
}

impl CollectorSet {
    pub fn new(collectors: Vec<Box<dyn Collector>>) -> Self {
        Self { collectors }
    }

    /// CPU, memory, disk and network collectors for the local host.
    pub fn host(network_filter: NetworkInterfaceFilter) -> Self {
        Self::new(vec![
            Box::new(CpuCollector::new()),
            Box::new(MemoryCollector::new()),
            Box::new(DiskCollector::new()),
            Box::new(NetworkCollector::new(network_filter)),
        ])
    }

    pub fn names(&self) -> Vec<&str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Runs every collector. A failing collector is logged and counted; the
    /// others still contribute.
    pub fn collect_all(&mut self) -> CollectionReport {
        let mut report = CollectionReport::default();
        for collector in &mut self.collectors {
            match collector.collect() {
                Ok(metrics) => report.metrics.extend(metrics),
                Err(e) => {
                    tracing::error!(collector = collector.name(), error = %e, "Collection failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}
