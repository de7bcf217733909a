use crate::Collector;
use anyhow::Result;
use monres_common::types::CollectedMetrics;
use sysinfo::System;

/// Raw memory figures in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub total: u64,
    pub available: u64,
    pub free: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

pub struct MemoryCollector {
    system: System,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for MemoryCollector {
    fn name(&self) -> &str {
        "memory"
    }

    fn collect(&mut self) -> Result<CollectedMetrics> {
        self.system.refresh_memory();
        let snapshot = MemorySnapshot {
            total: self.system.total_memory(),
            available: self.system.available_memory(),
            free: self.system.free_memory(),
            swap_total: self.system.total_swap(),
            swap_free: self.system.free_swap(),
        };
        Ok(memory_metrics(&snapshot))
    }
}

/// Percentages for memory and swap. Used memory is based on available memory
/// when the kernel reports it, on free memory otherwise. Zero totals report 0.
pub fn memory_metrics(snapshot: &MemorySnapshot) -> CollectedMetrics {
    let mut metrics = CollectedMetrics::new();

    let (mem_used, mem_free) = if snapshot.total > 0 {
        let unused = if snapshot.available > 0 {
            snapshot.available
        } else {
            snapshot.free
        };
        let free = percent(unused, snapshot.total);
        (100.0 - free, free)
    } else {
        (0.0, 0.0)
    };
    metrics.insert("mem_percent_used".to_string(), mem_used);
    metrics.insert("mem_percent_free".to_string(), mem_free);

    let (swap_used, swap_free) = if snapshot.swap_total > 0 {
        let free = percent(snapshot.swap_free, snapshot.swap_total);
        (100.0 - free, free)
    } else {
        (0.0, 0.0)
    };
    metrics.insert("swap_percent_used".to_string(), swap_used);
    metrics.insert("swap_percent_free".to_string(), swap_free);

    metrics
}

fn percent(part: u64, total: u64) -> f64 {
    (part.min(total) as f64 / total as f64) * 100.0
}
