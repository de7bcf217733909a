use crate::rate::{elapsed_since, CounterSnapshot};
use crate::Collector;
use anyhow::Result;
use monres_common::types::CollectedMetrics;
use serde::Deserialize;
use std::time::Instant;
use sysinfo::Networks;

/// Interfaces left out of the network totals.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkInterfaceFilter {
    /// Names excluded exactly.
    #[serde(default = "default_exclude_interfaces")]
    pub exclude_interfaces: Vec<String>,
    /// Names excluded by prefix.
    #[serde(default = "default_exclude_prefixes")]
    pub exclude_prefixes: Vec<String>,
}

fn default_exclude_interfaces() -> Vec<String> {
    vec!["lo".to_string(), "docker0".to_string()]
}

fn default_exclude_prefixes() -> Vec<String> {
    vec!["veth".to_string(), "br-".to_string(), "docker".to_string()]
}

impl Default for NetworkInterfaceFilter {
    fn default() -> Self {
        Self {
            exclude_interfaces: default_exclude_interfaces(),
            exclude_prefixes: default_exclude_prefixes(),
        }
    }
}

impl NetworkInterfaceFilter {
    pub fn is_relevant(&self, interface: &str) -> bool {
        !self.exclude_interfaces.iter().any(|name| name == interface)
            && !self
                .exclude_prefixes
                .iter()
                .any(|prefix| interface.starts_with(prefix.as_str()))
    }

    /// Sums `(name, received, transmitted)` byte counters over relevant
    /// interfaces.
    pub fn totals<'a, I>(&self, interfaces: I) -> CounterSnapshot
    where
        I: IntoIterator<Item = (&'a str, u64, u64)>,
    {
        interfaces
            .into_iter()
            .filter(|(name, _, _)| self.is_relevant(name))
            .fold(CounterSnapshot::default(), |acc, (_, rx, tx)| {
                CounterSnapshot::new(acc.inbound.wrapping_add(rx), acc.outbound.wrapping_add(tx))
            })
    }
}

/// Reports `net_recv_bytes_ps` and `net_sent_bytes_ps` over the interfaces
/// accepted by the filter.
pub struct NetworkCollector {
    networks: Networks,
    filter: NetworkInterfaceFilter,
    previous: Option<(CounterSnapshot, Instant)>,
}

impl NetworkCollector {
    pub fn new(filter: NetworkInterfaceFilter) -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            filter,
            previous: None,
        }
    }
}

impl Collector for NetworkCollector {
    fn name(&self) -> &str {
        "network"
    }

    fn collect(&mut self) -> Result<CollectedMetrics> {
        self.networks.refresh_list();
        let now = Instant::now();
        let current = self.filter.totals(
            self.networks
                .iter()
                .map(|(name, data)| (name.as_str(), data.total_received(), data.total_transmitted())),
        );

        let (recv, sent) = match self.previous.replace((current, now)) {
            Some((previous, at)) => current.rates(&previous, elapsed_since(Some(at), now)),
            None => (0.0, 0.0),
        };

        let mut metrics = CollectedMetrics::new();
        metrics.insert("net_recv_bytes_ps".to_string(), recv);
        metrics.insert("net_sent_bytes_ps".to_string(), sent);
        Ok(metrics)
    }
}
