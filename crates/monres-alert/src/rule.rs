use crate::error::{AlertError, Result};
use monres_common::duration::parse_duration_secs;
use monres_common::types::{Aggregation, CompareOp, Sample};

/// A configured alert rule.
///
/// A `duration_secs` of zero makes the rule instantaneous: only the latest
/// sample is compared and `aggregation` is ignored. Otherwise the whole
/// window is reduced with `aggregation` first.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
    /// Unique rule name, also the key of the persisted active set.
    pub name: String,
    pub metric: String,
    pub condition: CompareOp,
    pub threshold: f64,
    pub duration_secs: u64,
    /// Duration as written in the configuration, kept for notifications.
    pub duration: String,
    pub aggregation: Option<Aggregation>,
    pub channels: Vec<String>,
}

/// Outcome of evaluating one rule against a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub condition_met: bool,
    /// Latest sample for instantaneous rules, the aggregate otherwise.
    pub value: f64,
}

impl RuleDefinition {
    pub fn is_instantaneous(&self) -> bool {
        self.duration_secs == 0
    }

    /// Reduces `points` to a representative value and compares it with the
    /// threshold. `points` must be in chronological order.
    ///
    /// Note that `=` and `!=` compare floats exactly, so they rarely match
    /// derived values such as averages or rates.
    pub fn evaluate(&self, points: &[Sample]) -> Result<Evaluation> {
        let Some(latest) = points.last() else {
            let reason = if self.is_instantaneous() {
                "no sample available"
            } else {
                "no samples within the rule duration"
            };
            return Err(AlertError::InsufficientData {
                rule: self.name.clone(),
                reason: reason.to_string(),
            });
        };

        let value = if self.is_instantaneous() {
            latest.value
        } else {
            match self.aggregation {
                Some(Aggregation::Average) => {
                    let sum: f64 = points.iter().map(|s| s.value).sum();
                    sum / points.len() as f64
                }
                Some(Aggregation::Max) => points
                    .iter()
                    .map(|s| s.value)
                    .fold(f64::NEG_INFINITY, f64::max),
                None => {
                    return Err(AlertError::UnknownAggregation {
                        rule: self.name.clone(),
                        aggregation: String::new(),
                    })
                }
            }
        };

        Ok(Evaluation {
            condition_met: self.condition.check(value, self.threshold),
            value,
        })
    }
}

/// Parses a comparison operator for `rule`.
pub fn parse_condition(rule: &str, condition: &str) -> Result<CompareOp> {
    condition
        .parse()
        .map_err(|_| AlertError::UnknownCondition {
            rule: rule.to_string(),
            condition: condition.to_string(),
        })
}

/// Parses a duration string such as `"5m"` for `rule`.
pub fn parse_duration(rule: &str, duration: &str) -> Result<u64> {
    parse_duration_secs(duration).map_err(|source| AlertError::InvalidDuration {
        rule: rule.to_string(),
        source,
    })
}

/// Parses an aggregation for `rule`. An empty string is accepted only for
/// instantaneous rules, where aggregation plays no part.
pub fn parse_aggregation(
    rule: &str,
    aggregation: &str,
    duration_secs: u64,
) -> Result<Option<Aggregation>> {
    if aggregation.trim().is_empty() {
        if duration_secs == 0 {
            return Ok(None);
        }
        return Err(AlertError::UnknownAggregation {
            rule: rule.to_string(),
            aggregation: aggregation.to_string(),
        });
    }
    aggregation
        .parse()
        .map(Some)
        .map_err(|_| AlertError::UnknownAggregation {
            rule: rule.to_string(),
            aggregation: aggregation.to_string(),
        })
}
