//! Time-series alerting for the monres host monitor.
//!
//! [`history::MetricHistory`] keeps a short, capacity-bounded history per
//! metric. [`rule::RuleDefinition`] reduces a window of that history to a
//! representative value and compares it with a threshold, and
//! [`engine::AlertEngine`] turns those comparisons into FIRED/RESOLVED events
//! with per-rule hysteresis.

pub mod engine;
pub mod error;
pub mod history;
pub mod rule;

#[cfg(test)]
mod tests;

pub use engine::{AlertEngine, RuleRuntimeState};
pub use error::AlertError;
pub use history::MetricHistory;
pub use rule::{Evaluation, RuleDefinition};
