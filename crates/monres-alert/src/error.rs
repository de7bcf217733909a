/// Errors produced while building or evaluating alert rules.
///
/// None of these are fatal to the evaluation cycle: the engine logs them and
/// moves on to the next rule.
///
/// # Examples
///
/// ```rust
/// use monres_alert::error::AlertError;
///
/// let err = AlertError::InsufficientData {
///     rule: "High CPU".to_string(),
///     reason: "no samples collected yet".to_string(),
/// };
/// assert!(err.to_string().contains("High CPU"));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlertError {
    /// Not enough history to evaluate the rule this cycle.
    #[error("Alert: insufficient data for rule '{rule}': {reason}")]
    InsufficientData { rule: String, reason: String },

    /// The rule names an aggregation other than `average` or `max`, or none
    /// at all while requiring one.
    #[error("Alert: unknown aggregation '{aggregation}' for rule '{rule}'")]
    UnknownAggregation { rule: String, aggregation: String },

    /// The rule names a comparison operator that is not supported.
    #[error("Alert: unknown condition '{condition}' for rule '{rule}'")]
    UnknownCondition { rule: String, condition: String },

    /// The rule's duration string could not be parsed.
    #[error("Alert: invalid duration for rule '{rule}': {source}")]
    InvalidDuration {
        rule: String,
        source: monres_common::duration::DurationParseError,
    },
}

impl AlertError {
    /// Returns true for the "skip this cycle" case, which callers log at a
    /// lower level than configuration defects.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, AlertError::InsufficientData { .. })
    }
}

/// Convenience `Result` alias for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
