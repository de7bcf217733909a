use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use monres_common::types::{AlertEvent, Aggregation, CompareOp, EventKind};
use monres_notify::NotificationDispatcher;

pub const TEST_RULE_NAME: &str = "Test Alert";

/// Synthetic FIRED event used to check channel delivery end to end.
pub fn test_event(hostname: &str, channels: Vec<String>, now: DateTime<Utc>) -> AlertEvent {
    AlertEvent {
        rule_name: TEST_RULE_NAME.to_string(),
        metric_name: "test_metric".to_string(),
        kind: EventKind::Fired,
        hostname: hostname.to_string(),
        timestamp: now,
        value: 42.5,
        threshold: 40.0,
        condition: CompareOp::GreaterThan,
        duration: "1m".to_string(),
        aggregation: Some(Aggregation::Average),
        channels,
    }
}

/// Sends the test event to `channel`, or to every initialized channel when
/// `None`. Fails if the named channel does not exist or nothing was
/// delivered.
pub async fn send_test_notification(
    dispatcher: &NotificationDispatcher,
    hostname: &str,
    channel: Option<&str>,
) -> Result<usize> {
    if dispatcher.is_empty() {
        bail!("no notification channels initialized");
    }

    let targets: Vec<String> = match channel {
        Some(name) if !dispatcher.has_channel(name) => {
            bail!(
                "notification channel '{name}' not found or failed to initialize; available: {}",
                dispatcher.channel_names().join(", ")
            );
        }
        Some(name) => vec![name.to_string()],
        None => dispatcher.channel_names().into_iter().map(String::from).collect(),
    };

    let event = test_event(hostname, targets.clone(), Utc::now());
    let summary = dispatcher.dispatch_to(&targets, &event).await;
    tracing::info!(
        delivered = summary.delivered,
        total = targets.len(),
        "Test completed: {}/{} channels successful",
        summary.delivered,
        targets.len()
    );

    if summary.delivered == 0 {
        bail!("test notification failed on every channel");
    }
    Ok(summary.delivered)
}
