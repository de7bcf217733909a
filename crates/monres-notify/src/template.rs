use crate::format::format_value;
use monres_common::types::{AlertEvent, EventKind};
use serde::Deserialize;

pub const DEFAULT_FIRED_TEMPLATE: &str = "ALERT FIRED: {{alert_name}} on {{hostname}}. Metric: {{metric_name}} {{condition}} {{threshold}} (Current: {{value}}). Time: {{time}}";
pub const DEFAULT_RESOLVED_TEMPLATE: &str = "ALERT RESOLVED: {{alert_name}} on {{hostname}}. Time: {{time}}";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Values available to message templates, derived from an [`AlertEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationData {
    pub alert_name: String,
    pub metric_name: String,
    /// `%.2f` of the event value.
    pub value: String,
    pub formatted_value: String,
    pub threshold: String,
    pub formatted_threshold: String,
    pub condition: String,
    /// `FIRED` or `RESOLVED`.
    pub state: String,
    pub hostname: String,
    pub time: String,
    pub duration: String,
    pub aggregation: String,
}

impl NotificationData {
    pub fn from_event(event: &AlertEvent) -> Self {
        Self {
            alert_name: event.rule_name.clone(),
            metric_name: event.metric_name.clone(),
            value: format!("{:.2}", event.value),
            formatted_value: format_value(&event.metric_name, event.value),
            threshold: event.threshold.to_string(),
            formatted_threshold: format_value(&event.metric_name, event.threshold),
            condition: event.condition.to_string(),
            state: event.kind.to_string(),
            hostname: event.hostname.clone(),
            time: event.timestamp.format(TIME_FORMAT).to_string(),
            duration: event.duration.clone(),
            aggregation: event
                .aggregation
                .map(|a| a.to_string())
                .unwrap_or_default(),
        }
    }

    /// Looks up a template placeholder by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "alert_name" => &self.alert_name,
            "metric_name" => &self.metric_name,
            "value" => &self.value,
            "formatted_value" => &self.formatted_value,
            "threshold" => &self.threshold,
            "formatted_threshold" => &self.formatted_threshold,
            "condition" => &self.condition,
            "state" => &self.state,
            "hostname" => &self.hostname,
            "time" => &self.time,
            "duration" => &self.duration,
            "aggregation" => &self.aggregation,
            _ => return None,
        };
        Some(value.as_str())
    }
}

/// Message templates for fired and resolved alerts. Placeholders are written
/// as `{{name}}`, one per [`NotificationData`] field; anything else is left
/// as is.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Templates {
    #[serde(default = "default_fired", rename = "alert_fired")]
    pub fired: String,
    #[serde(default = "default_resolved", rename = "alert_resolved")]
    pub resolved: String,
}

fn default_fired() -> String {
    DEFAULT_FIRED_TEMPLATE.to_string()
}

fn default_resolved() -> String {
    DEFAULT_RESOLVED_TEMPLATE.to_string()
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            fired: default_fired(),
            resolved: default_resolved(),
        }
    }
}

impl Templates {
    /// Fills blank templates with the defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.fired.trim().is_empty() {
            self.fired = default_fired();
        }
        if self.resolved.trim().is_empty() {
            self.resolved = default_resolved();
        }
        self
    }

    pub fn for_kind(&self, kind: EventKind) -> &str {
        match kind {
            EventKind::Fired => &self.fired,
            EventKind::Resolved => &self.resolved,
        }
    }

    /// Renders the template matching the event kind.
    pub fn render_event(&self, event: &AlertEvent) -> String {
        render(self.for_kind(event.kind), &NotificationData::from_event(event))
    }

    /// Placeholders written as `{{.Name}}`, which [`render`] does not
    /// recognize and leaves in the output.
    pub fn dotted_placeholders(&self) -> Vec<String> {
        let mut found = Vec::new();
        for template in [&self.fired, &self.resolved] {
            let mut rest = template.as_str();
            while let Some(start) = rest.find("{{") {
                let after = &rest[start + 2..];
                let Some(end) = after.find("}}") else {
                    break;
                };
                let name = after[..end].trim();
                if name.starts_with('.') && !found.iter().any(|f| f == name) {
                    found.push(name.to_string());
                }
                rest = &after[end + 2..];
            }
        }
        found
    }
}

/// Substitutes `{{name}}` placeholders in a single pass; substituted values
/// are not scanned again. Unknown names and unterminated placeholders are
/// copied through.
pub fn render(template: &str, data: &NotificationData) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match data.field(after[..end].trim()) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}
