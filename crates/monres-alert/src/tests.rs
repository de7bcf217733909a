use crate::engine::{points_for, AlertEngine, RuleRuntimeState};
use crate::error::AlertError;
use crate::history::{capacity_for, max_configured_duration_secs, MetricHistory};
use crate::rule::{parse_aggregation, parse_condition, parse_duration, Evaluation, RuleDefinition};
use chrono::{DateTime, Duration, TimeZone, Utc};
use monres_common::types::{ActiveAlerts, Aggregation, CompareOp, EventKind, Sample};
use proptest::prelude::*;
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

fn samples(values: &[f64]) -> Vec<Sample> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| Sample::new(at(i as i64 * 10), *v))
        .collect()
}

fn instant_rule(name: &str, metric: &str, op: CompareOp, threshold: f64) -> RuleDefinition {
    RuleDefinition {
        name: name.into(),
        metric: metric.into(),
        condition: op,
        threshold,
        duration_secs: 0,
        duration: String::new(),
        aggregation: None,
        channels: vec!["stdout".into()],
    }
}

fn duration_rule(
    name: &str,
    metric: &str,
    op: CompareOp,
    threshold: f64,
    secs: u64,
    aggregation: Aggregation,
) -> RuleDefinition {
    RuleDefinition {
        duration_secs: secs,
        duration: format!("{secs}s"),
        aggregation: Some(aggregation),
        ..instant_rule(name, metric, op, threshold)
    }
}

// ── History buffer ──

#[test]
fn history_keeps_last_capacity_values() {
    let history = MetricHistory::new(3);
    for i in 0..5 {
        history.append("cpu_percent_total", i as f64, at(i));
    }

    let values: Vec<f64> = history
        .window("cpu_percent_total", 3600, at(5))
        .iter()
        .map(|s| s.value)
        .collect();
    assert_eq!(values, vec![2.0, 3.0, 4.0]);
    assert_eq!(history.len("cpu_percent_total"), 3);
}

#[test]
fn history_evicts_by_insertion_order_not_timestamp() {
    let history = MetricHistory::new(2);
    history.append("m", 1.0, at(30));
    history.append("m", 2.0, at(10));
    history.append("m", 3.0, at(20));

    // 1.0 was inserted first, so it goes even though it is the newest
    let mut values: Vec<f64> = history.window("m", 3600, at(40)).iter().map(|s| s.value).collect();
    values.sort_by(f64::total_cmp);
    assert_eq!(values, vec![2.0, 3.0]);
    assert_eq!(history.latest("m").unwrap().value, 3.0);
}

#[test]
fn history_zero_duration_window_is_latest() {
    let history = MetricHistory::new(10);
    assert!(history.window("mem_percent_used", 0, at(0)).is_empty());

    history.append("mem_percent_used", 41.0, at(0));
    history.append("mem_percent_used", 42.5, at(10));

    let window = history.window("mem_percent_used", 0, at(10));
    assert_eq!(window.len(), 1);
    assert_eq!(Some(window[0]), history.latest("mem_percent_used"));
}

#[test]
fn history_window_applies_one_second_slack() {
    let history = MetricHistory::new(100);
    for secs in [0, 29, 30, 31, 45, 60] {
        history.append("m", secs as f64, at(secs));
    }

    // as_of 60, duration 30 -> cutoff at 29
    let timestamps: Vec<DateTime<Utc>> =
        history.window("m", 30, at(60)).iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![at(29), at(30), at(31), at(45), at(60)]);
}

#[test]
fn history_window_is_chronological_with_out_of_order_appends() {
    let history = MetricHistory::new(10);
    history.append("m", 3.0, at(30));
    history.append("m", 1.0, at(10));
    history.append("m", 2.0, at(20));
    history.append("m", 0.0, at(-100));

    let window = history.window("m", 60, at(30));
    let values: Vec<f64> = window.iter().map(|s| s.value).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0]);
}

#[test]
fn history_unknown_metric_is_empty() {
    let history = MetricHistory::new(5);
    assert!(history.window("nope", 60, at(0)).is_empty());
    assert!(history.latest("nope").is_none());
    assert_eq!(history.len("nope"), 0);
    assert!(history.is_empty());
}

#[test]
fn history_tracks_metrics_independently() {
    let history = MetricHistory::new(2);
    history.append("net_recv_bytes_ps", 1.0, at(0));
    history.append("net_sent_bytes_ps", 2.0, at(0));
    history.append("net_recv_bytes_ps", 3.0, at(1));
    history.append("net_recv_bytes_ps", 4.0, at(2));

    assert_eq!(history.len("net_recv_bytes_ps"), 2);
    assert_eq!(history.len("net_sent_bytes_ps"), 1);
    assert_eq!(
        history.metric_names(),
        vec!["net_recv_bytes_ps".to_string(), "net_sent_bytes_ps".to_string()]
    );
}

#[test]
fn history_capacity_is_floored() {
    assert_eq!(MetricHistory::new(0).capacity(), 2);
    assert_eq!(MetricHistory::with_retention(600, 30).capacity(), 21);
    assert_eq!(capacity_for(60, 30), 3);
    assert_eq!(capacity_for(61, 30), 4);
    assert_eq!(capacity_for(10, 30), 2);
    assert_eq!(capacity_for(100, 0), 60);
}

#[test]
fn retention_horizon_uses_longest_rule_or_two_intervals() {
    let rules = vec![
        instant_rule("a", "m", CompareOp::GreaterThan, 1.0),
        duration_rule("b", "m", CompareOp::GreaterThan, 1.0, 300, Aggregation::Max),
        duration_rule("c", "m", CompareOp::GreaterThan, 1.0, 60, Aggregation::Average),
    ];
    assert_eq!(max_configured_duration_secs(&rules, 30), 300);
    assert_eq!(max_configured_duration_secs(&rules[..1], 30), 60);
    assert_eq!(max_configured_duration_secs(&[], 10), 20);
}

#[test]
fn history_concurrent_appends_and_reads() {
    let history = Arc::new(MetricHistory::new(50));

    std::thread::scope(|scope| {
        for writer in 0..4 {
            let history = Arc::clone(&history);
            scope.spawn(move || {
                for i in 0..200 {
                    history.append(&format!("metric_{writer}"), i as f64, at(i));
                }
            });
        }
        for _ in 0..4 {
            let history = Arc::clone(&history);
            scope.spawn(move || {
                for i in 0..200 {
                    let window = history.window("metric_0", 3600, at(i));
                    assert!(window.len() <= 50);
                    assert!(window.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
                }
            });
        }
    });

    for writer in 0..4 {
        let name = format!("metric_{writer}");
        assert_eq!(history.len(&name), 50);
        assert_eq!(history.latest(&name).unwrap().value, 199.0);
    }
}

proptest! {
    #[test]
    fn history_never_exceeds_capacity(capacity in 2usize..20, values in prop::collection::vec(-1e6f64..1e6, 0..100)) {
        let history = MetricHistory::new(capacity);
        for (i, v) in values.iter().enumerate() {
            history.append("m", *v, at(i as i64));
            prop_assert!(history.len("m") <= capacity);
        }

        let kept: Vec<f64> = history.window("m", 1_000_000, at(values.len() as i64)).iter().map(|s| s.value).collect();
        let start = values.len().saturating_sub(capacity);
        prop_assert_eq!(kept, values[start..].to_vec());
    }

    #[test]
    fn window_respects_cutoff(offsets in prop::collection::vec(0i64..600, 1..40), duration in 1u64..300) {
        let history = MetricHistory::new(64);
        for (i, offset) in offsets.iter().enumerate() {
            history.append("m", i as f64, at(*offset));
        }

        let as_of = at(600);
        let cutoff = as_of - Duration::seconds(duration as i64 + 1);
        let window = history.window("m", duration, as_of);
        prop_assert!(window.iter().all(|s| s.timestamp >= cutoff));
        prop_assert!(window.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}

// ── Rule evaluation ──

#[test]
fn instantaneous_rule_uses_latest_sample() {
    let rule = instant_rule("High CPU", "cpu_percent_total", CompareOp::GreaterThan, 90.0);
    let points = vec![Sample::new(at(0), 95.5)];

    let result = rule.evaluate(&points).unwrap();
    assert_eq!(
        result,
        Evaluation {
            condition_met: true,
            value: 95.5
        }
    );
}

#[test]
fn instantaneous_rule_ignores_older_points() {
    let rule = instant_rule("High CPU", "cpu_percent_total", CompareOp::GreaterThan, 90.0);
    let result = rule.evaluate(&samples(&[99.0, 99.0, 10.0])).unwrap();
    assert!(!result.condition_met);
    assert_eq!(result.value, 10.0);
}

#[test]
fn average_rule_fires_on_mean() {
    let rule = duration_rule("Mem", "mem_percent_used", CompareOp::GreaterThan, 45.0, 60, Aggregation::Average);
    let result = rule.evaluate(&samples(&[40.0, 50.0, 60.0])).unwrap();
    assert_eq!(result.value, 50.0);
    assert!(result.condition_met);
}

#[test]
fn max_rule_uses_largest_value() {
    let rule = duration_rule("Disk", "disk_write_bytes_ps", CompareOp::GreaterEqual, 80.0, 60, Aggregation::Max);
    let result = rule.evaluate(&samples(&[10.0, 80.0, 20.0])).unwrap();
    assert_eq!(result.value, 80.0);
    assert!(result.condition_met);

    let negative = rule.evaluate(&samples(&[-5.0, -1.0])).unwrap();
    assert_eq!(negative.value, -1.0);
}

#[test]
fn comparison_operators() {
    let cases = [
        (CompareOp::GreaterThan, 5.0, 5.0, false),
        (CompareOp::GreaterEqual, 5.0, 5.0, true),
        (CompareOp::LessThan, 4.0, 5.0, true),
        (CompareOp::LessEqual, 6.0, 5.0, false),
        (CompareOp::Equal, 5.0, 5.0, true),
        (CompareOp::NotEqual, 5.0, 5.0, false),
    ];
    for (op, value, threshold, expected) in cases {
        let rule = instant_rule("r", "m", op, threshold);
        let result = rule.evaluate(&[Sample::new(at(0), value)]).unwrap();
        assert_eq!(result.condition_met, expected, "{value} {op} {threshold}");
    }
}

#[test]
fn equality_is_exact_without_epsilon() {
    // Known sharp edge: an average that is 0.3 "on paper" does not equal 0.3.
    let rule = duration_rule("eq", "m", CompareOp::Equal, 0.3, 60, Aggregation::Average);
    let result = rule.evaluate(&samples(&[0.1 + 0.2])).unwrap();
    assert!(!result.condition_met);

    let rule = RuleDefinition {
        condition: CompareOp::NotEqual,
        ..rule
    };
    assert!(rule.evaluate(&samples(&[0.1 + 0.2])).unwrap().condition_met);
}

#[test]
fn empty_points_are_insufficient_data() {
    let rule = duration_rule("r", "m", CompareOp::GreaterThan, 1.0, 60, Aggregation::Average);
    let err = rule.evaluate(&[]).unwrap_err();
    assert!(err.is_insufficient_data());

    let rule = instant_rule("r", "m", CompareOp::GreaterThan, 1.0);
    assert!(rule.evaluate(&[]).unwrap_err().is_insufficient_data());
}

#[test]
fn duration_rule_without_aggregation_is_rejected() {
    let rule = RuleDefinition {
        aggregation: None,
        ..duration_rule("r", "m", CompareOp::GreaterThan, 1.0, 60, Aggregation::Max)
    };
    let err = rule.evaluate(&samples(&[5.0])).unwrap_err();
    assert!(matches!(err, AlertError::UnknownAggregation { .. }));
}

#[test]
fn parsing_helpers_report_rule_context() {
    assert_eq!(parse_condition("r", ">=").unwrap(), CompareOp::GreaterEqual);
    assert_eq!(
        parse_condition("r", "=>").unwrap_err(),
        AlertError::UnknownCondition {
            rule: "r".into(),
            condition: "=>".into()
        }
    );

    assert_eq!(parse_aggregation("r", "AVERAGE", 60).unwrap(), Some(Aggregation::Average));
    assert_eq!(parse_aggregation("r", "", 0).unwrap(), None);
    assert!(matches!(
        parse_aggregation("r", "", 60),
        Err(AlertError::UnknownAggregation { .. })
    ));
    assert!(matches!(
        parse_aggregation("r", "median", 0),
        Err(AlertError::UnknownAggregation { .. })
    ));

    assert_eq!(parse_duration("r", "5m").unwrap(), 300);
    let err = parse_duration("r", "5 minutes").unwrap_err();
    assert!(err.to_string().contains("'r'"));
}

// ── State machine ──

#[test]
fn runtime_state_transitions() {
    let mut state = RuleRuntimeState::default();
    let met = Evaluation {
        condition_met: true,
        value: 95.0,
    };
    let clear = Evaluation {
        condition_met: false,
        value: 10.0,
    };

    assert_eq!(state.transition(clear, at(0)), None);
    assert_eq!(state.transition(met, at(10)), Some(EventKind::Fired));
    assert_eq!(state.last_active_time, Some(at(10)));
    assert_eq!(state.transition(met, at(20)), None);
    assert_eq!(state.last_value, Some(95.0));
    assert_eq!(state.transition(clear, at(30)), Some(EventKind::Resolved));
    assert_eq!(state.last_resolved_time, Some(at(30)));
    assert_eq!(state.last_value, Some(10.0));
    assert!(!state.is_active);
}

proptest! {
    #[test]
    fn events_alternate_between_fired_and_resolved(conditions in prop::collection::vec(any::<bool>(), 0..200)) {
        let mut state = RuleRuntimeState::default();
        let mut last: Option<EventKind> = None;
        for (i, met) in conditions.iter().enumerate() {
            let evaluation = Evaluation { condition_met: *met, value: i as f64 };
            if let Some(kind) = state.transition(evaluation, at(i as i64)) {
                prop_assert_ne!(Some(kind), last);
                if last.is_none() {
                    prop_assert_eq!(kind, EventKind::Fired);
                }
                last = Some(kind);
            }
            prop_assert_eq!(state.is_active, *met);
        }
    }
}

// ── Engine ──

fn engine_with(rules: Vec<RuleDefinition>, capacity: usize) -> AlertEngine {
    AlertEngine::new(rules, Arc::new(MetricHistory::new(capacity)), "test-host")
}

#[test]
fn first_tick_without_data_emits_nothing() {
    let mut engine = engine_with(
        vec![duration_rule("Load", "cpu_percent_total", CompareOp::GreaterThan, 90.0, 60, Aggregation::Average)],
        10,
    );

    let err = points_for(engine.history(), engine.rules().next().unwrap(), at(0)).unwrap_err();
    assert!(err.is_insufficient_data());

    assert!(engine.evaluate(at(0)).is_empty());
    assert!(!engine.state("Load").unwrap().is_active);
}

#[test]
fn duration_rule_waits_for_full_history() {
    let rule = duration_rule("Load", "cpu_percent_total", CompareOp::GreaterThan, 90.0, 60, Aggregation::Average);
    let mut engine = engine_with(vec![rule], 20);
    let history = Arc::clone(engine.history());

    for secs in (0..=50).step_by(10) {
        history.append("cpu_percent_total", 99.0, at(secs));
        assert!(engine.evaluate(at(secs)).is_empty(), "fired early at {secs}s");
    }

    history.append("cpu_percent_total", 99.0, at(60));
    let events = engine.evaluate(at(60));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Fired);
    assert_eq!(events[0].value, 99.0);
}

#[test]
fn coverage_tolerance_accepts_slightly_short_history() {
    let rule = duration_rule("Load", "m", CompareOp::GreaterThan, 1.0, 60, Aggregation::Max);
    let history = MetricHistory::new(10);
    history.append("m", 5.0, at(0));
    history.append("m", 5.0, at(30));

    let now = at(60) - Duration::milliseconds(50);
    assert!(points_for(&history, &rule, now).is_ok());

    let now = at(60) - Duration::milliseconds(150);
    assert!(points_for(&history, &rule, now).unwrap_err().is_insufficient_data());
}

#[test]
fn engine_fires_once_and_resolves() {
    let mut engine = engine_with(
        vec![instant_rule("High CPU", "cpu_percent_total", CompareOp::GreaterThan, 90.0)],
        5,
    );
    let history = Arc::clone(engine.history());

    history.append("cpu_percent_total", 95.5, at(0));
    let events = engine.evaluate(at(0));
    assert_eq!(events.len(), 1);
    let fired = &events[0];
    assert_eq!(fired.kind, EventKind::Fired);
    assert_eq!(fired.rule_name, "High CPU");
    assert_eq!(fired.hostname, "test-host");
    assert_eq!(fired.value, 95.5);
    assert_eq!(fired.threshold, 90.0);
    assert_eq!(fired.channels, vec!["stdout".to_string()]);

    history.append("cpu_percent_total", 97.0, at(10));
    assert!(engine.evaluate(at(10)).is_empty());

    history.append("cpu_percent_total", 12.0, at(20));
    let events = engine.evaluate(at(20));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Resolved);
    assert_eq!(events[0].value, 12.0);

    let state = engine.state("High CPU").unwrap();
    assert!(!state.is_active);
    assert_eq!(state.last_active_time, Some(at(0)));
    assert_eq!(state.last_resolved_time, Some(at(20)));
}

#[test]
fn engine_evaluates_rules_in_declaration_order() {
    let mut engine = engine_with(
        vec![
            instant_rule("second", "b", CompareOp::GreaterThan, 0.0),
            instant_rule("first", "a", CompareOp::GreaterThan, 0.0),
        ],
        5,
    );
    engine.history().append("a", 1.0, at(0));
    engine.history().append("b", 1.0, at(0));

    let names: Vec<String> = engine.evaluate(at(0)).into_iter().map(|e| e.rule_name).collect();
    assert_eq!(names, vec!["second".to_string(), "first".to_string()]);
}

#[test]
fn failing_rule_does_not_block_others() {
    let broken = RuleDefinition {
        aggregation: None,
        ..duration_rule("broken", "m", CompareOp::GreaterThan, 0.0, 10, Aggregation::Max)
    };
    let missing = instant_rule("missing", "never_collected", CompareOp::GreaterThan, 0.0);
    let healthy = instant_rule("healthy", "m", CompareOp::GreaterThan, 0.0);
    let mut engine = engine_with(vec![broken, missing, healthy], 5);

    engine.history().append("m", 1.0, at(0));
    engine.history().append("m", 1.0, at(20));
    let events = engine.evaluate(at(20));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].rule_name, "healthy");
}

#[test]
fn seeded_active_rule_does_not_refire() {
    let rules = vec![
        instant_rule("High CPU", "cpu_percent_total", CompareOp::GreaterThan, 90.0),
        instant_rule("Low Mem", "mem_percent_free", CompareOp::LessThan, 10.0),
    ];
    let mut seed = ActiveAlerts::new();
    seed.insert("High CPU".into(), true);
    seed.insert("Low Mem".into(), false);
    seed.insert("Removed Rule".into(), true);

    let mut engine = engine_with(rules, 5).with_active_alerts(&seed);
    assert!(engine.state("High CPU").unwrap().is_active);
    assert!(!engine.state("Low Mem").unwrap().is_active);

    engine.history().append("cpu_percent_total", 99.0, at(0));
    engine.history().append("mem_percent_free", 50.0, at(0));
    assert!(engine.evaluate(at(0)).is_empty());

    engine.history().append("cpu_percent_total", 20.0, at(10));
    let events = engine.evaluate(at(10));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Resolved);
}

#[test]
fn active_alerts_projection() {
    let mut engine = engine_with(
        vec![
            instant_rule("a", "m", CompareOp::GreaterThan, 10.0),
            instant_rule("b", "m", CompareOp::LessThan, 10.0),
        ],
        5,
    );
    assert!(engine.active_alerts().is_empty());

    engine.history().append("m", 50.0, at(0));
    engine.evaluate(at(0));

    let active = engine.active_alerts();
    assert_eq!(active.len(), 1);
    assert_eq!(active.get("a"), Some(&true));
    assert!(!active.contains_key("b"));
}
