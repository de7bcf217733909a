use crate::error::NotifyError;
use crate::plugin::ChannelPlugin;
use crate::utils::{truncate_string, MAX_BODY_LENGTH};
use crate::Notifier;
use anyhow::Result;
use async_trait::async_trait;
use monres_common::types::AlertEvent;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Characters that must be backslash-escaped in MarkdownV2 text.
const MARKDOWN_V2_SPECIAL: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

pub struct TelegramChannel {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(name: &str, cfg: &TelegramConfig) -> Result<Self> {
        cfg.check()?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(NotifyError::from)?;
        let api_base = cfg.api_base.as_deref().unwrap_or(API_BASE).trim_end_matches('/');
        Ok(Self {
            name: name.to_string(),
            client,
            endpoint: format!("{api_base}/bot{}/sendMessage", cfg.bot_token),
            chat_id: cfg.chat_id.clone(),
        })
    }
}

/// Escapes every MarkdownV2 special character so the message renders
/// literally.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl Notifier for TelegramChannel {
    async fn deliver(&self, _event: &AlertEvent, message: &str) -> Result<()> {
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": escape_markdown_v2(message),
            "parse_mode": "MarkdownV2",
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            // The request URL carries the bot token.
            .map_err(|e| NotifyError::from(e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = match resp.text().await {
                Ok(text) => truncate_string(&text, MAX_BODY_LENGTH),
                Err(e) => format!("[Failed to read response body: {}]", e.without_url()),
            };
            return Err(NotifyError::ApiError {
                service: "telegram".to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        tracing::debug!(channel = %self.name, "Telegram message sent");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn channel_type(&self) -> &str {
        "telegram"
    }
}

// Plugin

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Normally injected from the environment rather than written in the file.
    #[serde(default)]
    pub bot_token: String,
    /// Numeric ids are accepted unquoted.
    #[serde(deserialize_with = "string_or_number")]
    pub chat_id: String,
    /// Bot API base URL, for self-hosted API servers.
    #[serde(default)]
    pub api_base: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ChatId {
        Text(String),
        Number(i64),
    }

    Ok(match ChatId::deserialize(deserializer)? {
        ChatId::Text(s) => s,
        ChatId::Number(n) => n.to_string(),
    })
}

impl TelegramConfig {
    fn check(&self) -> crate::error::Result<()> {
        if self.bot_token.trim().is_empty() || self.chat_id.trim().is_empty() {
            return Err(NotifyError::InvalidConfig(
                "telegram channel requires bot_token and chat_id".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct TelegramPlugin;

impl ChannelPlugin for TelegramPlugin {
    fn name(&self) -> &str {
        "telegram"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        let cfg: TelegramConfig = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("telegram: {e}")))?;
        cfg.check()?;
        Ok(())
    }

    fn create_channel(&self, channel_name: &str, config: &Value) -> Result<Box<dyn Notifier>> {
        let cfg: TelegramConfig = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("telegram: {e}")))?;
        Ok(Box::new(TelegramChannel::new(channel_name, &cfg)?))
    }
}
