use crate::error::{AlertError, Result};
use crate::history::MetricHistory;
use crate::rule::{Evaluation, RuleDefinition};
use chrono::{DateTime, Duration, Utc};
use monres_common::types::{ActiveAlerts, AlertEvent, EventKind, Sample};
use std::sync::Arc;

/// How far short of its nominal duration a window may fall and still count
/// as covering it.
const COVERAGE_TOLERANCE_MS: i64 = 100;

/// Mutable per-rule alert state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleRuntimeState {
    pub is_active: bool,
    pub last_active_time: Option<DateTime<Utc>>,
    pub last_resolved_time: Option<DateTime<Utc>>,
    pub last_value: Option<f64>,
}

impl RuleRuntimeState {
    /// Applies one evaluation result. Returns the event kind only when the
    /// active flag flips.
    pub fn transition(&mut self, evaluation: Evaluation, now: DateTime<Utc>) -> Option<EventKind> {
        match (self.is_active, evaluation.condition_met) {
            (false, true) => {
                self.is_active = true;
                self.last_active_time = Some(now);
                self.last_value = Some(evaluation.value);
                Some(EventKind::Fired)
            }
            (true, false) => {
                self.is_active = false;
                self.last_resolved_time = Some(now);
                self.last_value = Some(evaluation.value);
                Some(EventKind::Resolved)
            }
            _ => None,
        }
    }
}

struct RuleSlot {
    rule: RuleDefinition,
    state: RuleRuntimeState,
}

/// Evaluates every rule against the shared history once per cycle and tracks
/// fire/resolve hysteresis per rule.
pub struct AlertEngine {
    slots: Vec<RuleSlot>,
    history: Arc<MetricHistory>,
    hostname: String,
}

impl AlertEngine {
    pub fn new(rules: Vec<RuleDefinition>, history: Arc<MetricHistory>, hostname: &str) -> Self {
        Self {
            slots: rules
                .into_iter()
                .map(|rule| RuleSlot {
                    rule,
                    state: RuleRuntimeState::default(),
                })
                .collect(),
            history,
            hostname: hostname.to_string(),
        }
    }

    /// Marks rules listed as active in a persisted snapshot, so a restart does
    /// not fire them again. Unknown names are ignored.
    pub fn with_active_alerts(mut self, seed: &ActiveAlerts) -> Self {
        for (name, active) in seed {
            if !*active {
                continue;
            }
            match self.slots.iter_mut().find(|s| &s.rule.name == name) {
                Some(slot) => slot.state.is_active = true,
                None => tracing::debug!(rule = %name, "Ignoring persisted state for unknown rule"),
            }
        }
        self
    }

    pub fn history(&self) -> &Arc<MetricHistory> {
        &self.history
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.slots.iter().map(|s| &s.rule)
    }

    pub fn state(&self, rule_name: &str) -> Option<&RuleRuntimeState> {
        self.slots
            .iter()
            .find(|s| s.rule.name == rule_name)
            .map(|s| &s.state)
    }

    /// Names of all currently active rules, the snapshot that is persisted
    /// across restarts.
    pub fn active_alerts(&self) -> ActiveAlerts {
        self.slots
            .iter()
            .filter(|s| s.state.is_active)
            .map(|s| (s.rule.name.clone(), true))
            .collect()
    }

    /// Evaluates all rules in declaration order as of `now` and returns the
    /// transitions. A failing rule is logged and skipped.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        for slot in &mut self.slots {
            let rule = &slot.rule;
            let evaluation = match points_for(&self.history, rule, now)
                .and_then(|points| rule.evaluate(&points))
            {
                Ok(evaluation) => evaluation,
                Err(e) if e.is_insufficient_data() => {
                    tracing::debug!(rule = %rule.name, metric = %rule.metric, error = %e, "Skipping rule");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(rule = %rule.name, metric = %rule.metric, error = %e, "Rule evaluation failed");
                    continue;
                }
            };

            let Some(kind) = slot.state.transition(evaluation, now) else {
                continue;
            };

            match kind {
                EventKind::Fired => tracing::info!(
                    rule = %rule.name,
                    metric = %rule.metric,
                    condition = %rule.condition,
                    threshold = rule.threshold,
                    value = evaluation.value,
                    "Alert fired"
                ),
                EventKind::Resolved => tracing::info!(
                    rule = %rule.name,
                    metric = %rule.metric,
                    value = evaluation.value,
                    "Alert resolved"
                ),
            }

            events.push(AlertEvent {
                rule_name: rule.name.clone(),
                metric_name: rule.metric.clone(),
                kind,
                hostname: self.hostname.clone(),
                timestamp: now,
                value: evaluation.value,
                threshold: rule.threshold,
                condition: rule.condition,
                duration: rule.duration.clone(),
                aggregation: rule.aggregation,
                channels: rule.channels.clone(),
            });
        }

        events
    }
}

/// Pulls the samples `rule` should be evaluated on. Duration rules also
/// require the window to reach back (almost) the full duration, so a freshly
/// started process does not fire on a handful of samples.
pub fn points_for(
    history: &MetricHistory,
    rule: &RuleDefinition,
    now: DateTime<Utc>,
) -> Result<Vec<Sample>> {
    let points = history.window(&rule.metric, rule.duration_secs, now);

    if rule.is_instantaneous() {
        if points.is_empty() {
            return Err(AlertError::InsufficientData {
                rule: rule.name.clone(),
                reason: format!("no sample collected for '{}'", rule.metric),
            });
        }
        return Ok(points);
    }

    let Some(first) = points.first() else {
        return Err(AlertError::InsufficientData {
            rule: rule.name.clone(),
            reason: format!("no samples for '{}' within {}", rule.metric, rule.duration),
        });
    };

    let required = i64::try_from(rule.duration_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .map(|d| d - Duration::milliseconds(COVERAGE_TOLERANCE_MS))
        .unwrap_or(Duration::MAX);
    let covered = now - first.timestamp;
    if covered < required {
        return Err(AlertError::InsufficientData {
            rule: rule.name.clone(),
            reason: format!(
                "history spans {}s, rule needs {}s",
                covered.num_seconds(),
                rule.duration_secs
            ),
        });
    }

    Ok(points)
}
