//! Alert notification delivery with pluggable channel support.
//!
//! Alert events are rendered through [`template::Templates`] and delivered by
//! [`dispatcher::NotificationDispatcher`] to the [`Notifier`]s named in the
//! rule. Built-in channels are stdout, email (SMTP) and Telegram.

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod plugin;
pub mod template;
pub mod utils;


use anyhow::Result;
use async_trait::async_trait;
use monres_common::types::AlertEvent;
use serde::Deserialize;
use serde_json::Value;

pub use dispatcher::{DispatchSummary, NotificationDispatcher};
pub use plugin::{ChannelPlugin, ChannelRegistry};
pub use template::{NotificationData, Templates};

/// A configured notification channel.
///
/// Implementations are created by the matching [`plugin::ChannelPlugin`] and
/// looked up by name when an alert names the channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one alert event. `message` is the already rendered template
    /// text for the event's kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the external service rejects or cannot be reached.
    async fn deliver(&self, event: &AlertEvent, message: &str) -> Result<()>;

    /// Configured channel name.
    fn name(&self) -> &str;

    /// Channel type (e.g. `"email"`).
    fn channel_type(&self) -> &str;
}

/// One `notification_channels` entry from the configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    /// Type-specific settings, validated by the channel plugin.
    #[serde(default)]
    pub config: Value,
}
