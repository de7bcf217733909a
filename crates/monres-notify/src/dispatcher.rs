use crate::template::Templates;
use crate::Notifier;
use monres_common::types::AlertEvent;
use std::collections::BTreeMap;

/// Counts from delivering one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
    /// Channels named by the rule that are not configured.
    pub missing: usize,
}

impl DispatchSummary {
    fn merge(&mut self, other: DispatchSummary) {
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.missing += other.missing;
    }
}

/// Renders alert events and hands them to the channels named by their rule.
/// Delivery problems are logged, never returned.
pub struct NotificationDispatcher {
    notifiers: BTreeMap<String, Box<dyn Notifier>>,
    templates: Templates,
}

impl NotificationDispatcher {
    pub fn new(notifiers: BTreeMap<String, Box<dyn Notifier>>, templates: Templates) -> Self {
        Self {
            notifiers,
            templates: templates.with_defaults(),
        }
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.notifiers.keys().map(String::as_str).collect()
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.notifiers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Delivers `event` to each channel listed in `event.channels`.
    pub async fn dispatch(&self, event: &AlertEvent) -> DispatchSummary {
        self.dispatch_to(&event.channels, event).await
    }

    /// Delivers `event` to the given channels, one after another.
    pub async fn dispatch_to(&self, channels: &[String], event: &AlertEvent) -> DispatchSummary {
        let message = self.templates.render_event(event);
        let mut summary = DispatchSummary::default();

        for channel_name in channels {
            let Some(notifier) = self.notifiers.get(channel_name) else {
                tracing::warn!(
                    rule = %event.rule_name,
                    channel = %channel_name,
                    "Notification channel not configured or failed to initialize"
                );
                summary.missing += 1;
                continue;
            };

            match notifier.deliver(event, &message).await {
                Ok(()) => {
                    tracing::info!(
                        rule = %event.rule_name,
                        state = %event.kind,
                        channel = %channel_name,
                        channel_type = notifier.channel_type(),
                        "Notification sent"
                    );
                    summary.delivered += 1;
                }
                Err(e) => {
                    tracing::error!(
                        rule = %event.rule_name,
                        channel = %channel_name,
                        channel_type = notifier.channel_type(),
                        error = %e,
                        "Failed to send notification"
                    );
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Dispatches a batch of events in order and returns the combined counts.
    pub async fn dispatch_all(&self, events: &[AlertEvent]) -> DispatchSummary {
        let mut total = DispatchSummary::default();
        for event in events {
            total.merge(self.dispatch(event).await);
        }
        total
    }
}
