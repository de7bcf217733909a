use crate::plugin::ChannelPlugin;
use crate::Notifier;
use anyhow::Result;
use async_trait::async_trait;
use monres_common::types::AlertEvent;
use serde_json::Value;

/// Prints the rendered message on standard output.
pub struct StdoutChannel {
    name: String,
}

impl StdoutChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for StdoutChannel {
    async fn deliver(&self, _event: &AlertEvent, message: &str) -> Result<()> {
        println!("{message}");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn channel_type(&self) -> &str {
        "stdout"
    }
}

pub struct StdoutPlugin;

impl ChannelPlugin for StdoutPlugin {
    fn name(&self) -> &str {
        "stdout"
    }

    fn validate_config(&self, _config: &Value) -> Result<()> {
        Ok(())
    }

    fn create_channel(&self, channel_name: &str, _config: &Value) -> Result<Box<dyn Notifier>> {
        Ok(Box::new(StdoutChannel::new(channel_name)))
    }
}
