use crate::error::NotifyError;
use crate::plugin::ChannelPlugin;
use crate::Notifier;
use anyhow::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use monres_common::types::{AlertEvent, EventKind};
use serde::Deserialize;
use serde_json::Value;

pub struct EmailChannel {
    name: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailChannel {
    pub fn new(name: &str, cfg: &EmailConfig) -> Result<Self> {
        cfg.check()?;

        let from: Mailbox = cfg
            .smtp_from
            .parse()
            .map_err(|e| NotifyError::InvalidConfig(format!("smtp_from '{}': {e}", cfg.smtp_from)))?;
        let to = cfg
            .smtp_to
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .map_err(|e| NotifyError::InvalidConfig(format!("smtp_to '{addr}': {e}")))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let builder = if cfg.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.smtp_host)
        };
        let mut builder = builder.port(cfg.smtp_port);

        if let Some(user) = cfg.smtp_username.as_deref().filter(|u| !u.is_empty()) {
            let password = cfg.smtp_password.clone().unwrap_or_default();
            if password.is_empty() {
                tracing::warn!(channel = %name, "SMTP username set without a password");
            }
            builder = builder.credentials(Credentials::new(user.to_string(), password));
        }

        Ok(Self {
            name: name.to_string(),
            transport: builder.build(),
            from,
            to,
        })
    }
}

/// `ALERT FIRED: <rule> on <host>` or `ALERT RESOLVED: ...`.
pub fn subject_for(event: &AlertEvent) -> String {
    let prefix = match event.kind {
        EventKind::Fired => "ALERT FIRED",
        EventKind::Resolved => "ALERT RESOLVED",
    };
    format!("{prefix}: {} on {}", event.rule_name, event.hostname)
}

#[async_trait]
impl Notifier for EmailChannel {
    async fn deliver(&self, event: &AlertEvent, message: &str) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject_for(event))
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        let email = builder.body(message.to_string())?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::SmtpError(e.to_string()))?;

        tracing::debug!(channel = %self.name, recipients = self.to.len(), "Email sent");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn channel_type(&self) -> &str {
        "email"
    }
}

// Plugin

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// Normally injected from the environment rather than written in the file.
    #[serde(default)]
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub smtp_to: Vec<String>,
    #[serde(default)]
    pub smtp_use_tls: bool,
}

impl EmailConfig {
    fn check(&self) -> crate::error::Result<()> {
        if self.smtp_host.trim().is_empty()
            || self.smtp_port == 0
            || self.smtp_from.trim().is_empty()
            || self.smtp_to.is_empty()
        {
            return Err(NotifyError::InvalidConfig(
                "email channel requires smtp_host, smtp_port, smtp_from and smtp_to".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct EmailPlugin;

impl ChannelPlugin for EmailPlugin {
    fn name(&self) -> &str {
        "email"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        let cfg: EmailConfig = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("email: {e}")))?;
        cfg.check()?;
        Ok(())
    }

    fn create_channel(&self, channel_name: &str, config: &Value) -> Result<Box<dyn Notifier>> {
        let cfg: EmailConfig = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("email: {e}")))?;
        Ok(Box::new(EmailChannel::new(channel_name, &cfg)?))
    }
}
