use crate::config::MonitorConfig;
use crate::state::StateStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use monres_alert::{AlertEngine, MetricHistory};
use monres_collector::CollectorSet;
use monres_common::types::{ActiveAlerts, AlertEvent};
use monres_notify::{ChannelRegistry, DispatchSummary, NotificationDispatcher};
use std::sync::Arc;

/// Instantiates the configured channels with the built-in plugins. Channels
/// that fail to initialize are skipped.
pub fn build_dispatcher(config: &MonitorConfig) -> Result<NotificationDispatcher> {
    let notifiers = ChannelRegistry::default().build_notifiers(&config.notification_channels)?;
    Ok(NotificationDispatcher::new(notifiers, config.templates.clone()))
}

/// What a single tick did.
#[derive(Debug, Default)]
pub struct TickReport {
    pub collected: usize,
    pub failed_collectors: usize,
    pub events: Vec<AlertEvent>,
    pub dispatch: DispatchSummary,
    pub state_saved: bool,
}

/// Collect, evaluate and notify, once per interval.
pub struct Monitor {
    collectors: CollectorSet,
    engine: AlertEngine,
    dispatcher: NotificationDispatcher,
    state: Option<StateStore>,
    last_saved: ActiveAlerts,
}

impl Monitor {
    /// Seeds the engine from `state` when given, so alerts already active
    /// before a restart do not fire again.
    pub fn new(
        collectors: CollectorSet,
        engine: AlertEngine,
        dispatcher: NotificationDispatcher,
        state: Option<StateStore>,
    ) -> Self {
        let (engine, last_saved) = match &state {
            Some(store) => {
                let persisted = store.load();
                let engine = engine.with_active_alerts(&persisted);
                let seeded = engine.active_alerts();
                (engine, seeded)
            }
            None => (engine, ActiveAlerts::new()),
        };

        Self {
            collectors,
            engine,
            dispatcher,
            state,
            last_saved,
        }
    }

    /// Wires host collectors, a history sized for the configured rules and
    /// the notification channels from `config`.
    pub fn from_config(
        config: &MonitorConfig,
        hostname: &str,
        dispatcher: NotificationDispatcher,
    ) -> Result<Self> {
        let rules = config.rule_definitions()?;
        let interval = config.interval_secs();
        let horizon = config.retention_horizon_secs()?;
        let history = Arc::new(MetricHistory::with_retention(horizon, interval));
        tracing::info!(
            horizon_secs = horizon,
            capacity = history.capacity(),
            rules = rules.len(),
            "Metric history initialized"
        );

        let engine = AlertEngine::new(rules, history, hostname);
        let collectors = CollectorSet::host(config.network.clone());
        let state = config.state_file.clone().map(StateStore::new);
        Ok(Self::new(collectors, engine, dispatcher, state))
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let collection = self.collectors.collect_all();
        let history = self.engine.history();
        for (metric, value) in &collection.metrics {
            history.append(metric, *value, now);
        }
        tracing::debug!(
            metrics = collection.metrics.len(),
            failed = collection.failed,
            "Collected metrics"
        );

        let events = self.engine.evaluate(now);
        let dispatch = self.dispatcher.dispatch_all(&events).await;

        let state_saved = if events.is_empty() {
            false
        } else {
            self.persist_if_changed()
        };

        TickReport {
            collected: collection.metrics.len(),
            failed_collectors: collection.failed,
            events,
            dispatch,
            state_saved,
        }
    }

    /// Writes the active set unconditionally, for shutdown.
    pub fn save_state(&mut self) -> Result<()> {
        let Some(store) = &self.state else {
            return Ok(());
        };
        let active = self.engine.active_alerts();
        store.save(&active)?;
        self.last_saved = active;
        Ok(())
    }

    fn persist_if_changed(&mut self) -> bool {
        let Some(store) = &self.state else {
            return false;
        };
        let active = self.engine.active_alerts();
        if active == self.last_saved {
            return false;
        }
        match store.save(&active) {
            Ok(()) => {
                self.last_saved = active;
                true
            }
            Err(e) => {
                tracing::error!(path = %store.path().display(), error = %e, "Failed to save alert state");
                false
            }
        }
    }
}
