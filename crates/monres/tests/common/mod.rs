#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use monres::config::MonitorConfig;
use monres_collector::Collector;
use monres_common::types::{AlertEvent, CollectedMetrics, EventKind};
use monres_notify::{NotificationDispatcher, Notifier, Templates};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

pub fn no_env(_: &str) -> Option<String> {
    None
}

pub fn parse_config(yaml: &str) -> MonitorConfig {
    MonitorConfig::from_yaml(yaml, no_env).expect("config should parse")
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(secs)
}

/// Returns one scripted batch of metrics per call, then fails.
pub struct ScriptedCollector {
    batches: VecDeque<CollectedMetrics>,
}

impl ScriptedCollector {
    pub fn new(metric: &str, values: &[f64]) -> Self {
        Self {
            batches: values
                .iter()
                .map(|v| BTreeMap::from([(metric.to_string(), *v)]))
                .collect(),
        }
    }
}

impl Collector for ScriptedCollector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn collect(&mut self) -> Result<CollectedMetrics> {
        self.batches
            .pop_front()
            .ok_or_else(|| anyhow!("script exhausted"))
    }
}

pub struct BrokenCollector;

impl Collector for BrokenCollector {
    fn name(&self) -> &str {
        "broken"
    }

    fn collect(&mut self) -> Result<CollectedMetrics> {
        Err(anyhow!("device unavailable"))
    }
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub channel: String,
    pub rule: String,
    pub kind: EventKind,
    pub message: String,
}

pub type Deliveries = Arc<Mutex<Vec<Delivery>>>;

pub struct RecordingNotifier {
    name: String,
    fail: bool,
    log: Deliveries,
}

impl RecordingNotifier {
    pub fn boxed(name: &str, log: &Deliveries) -> Box<dyn Notifier> {
        Box::new(Self {
            name: name.to_string(),
            fail: false,
            log: Arc::clone(log),
        })
    }

    pub fn failing(name: &str, log: &Deliveries) -> Box<dyn Notifier> {
        Box::new(Self {
            name: name.to_string(),
            fail: true,
            log: Arc::clone(log),
        })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, event: &AlertEvent, message: &str) -> Result<()> {
        if self.fail {
            return Err(anyhow!("{} is down", self.name));
        }
        self.log.lock().unwrap().push(Delivery {
            channel: self.name.clone(),
            rule: event.rule_name.clone(),
            kind: event.kind,
            message: message.to_string(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn channel_type(&self) -> &str {
        "recording"
    }
}

pub fn dispatcher(notifiers: Vec<Box<dyn Notifier>>) -> NotificationDispatcher {
    let map = notifiers
        .into_iter()
        .map(|n| (n.name().to_string(), n))
        .collect();
    NotificationDispatcher::new(map, Templates::default())
}
