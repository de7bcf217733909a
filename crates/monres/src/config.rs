use anyhow::{bail, Context};
use monres_alert::history::max_configured_duration_secs;
use monres_alert::rule::{parse_aggregation, parse_condition, parse_duration};
use monres_alert::RuleDefinition;
use monres_collector::NetworkInterfaceFilter;
use monres_notify::plugin::ChannelRegistry;
use monres_notify::{ChannelConfig, Templates};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_PREFIX: &str = "RESMON_";

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Collection interval; zero or negative means the default.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: i64,
    /// Overrides the OS hostname in notifications.
    #[serde(default)]
    pub hostname: String,
    /// Where the set of active alerts is kept across restarts. Nothing is
    /// persisted when unset.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default)]
    pub network: NetworkInterfaceFilter,
    #[serde(default)]
    pub alerts: Vec<AlertRuleConfig>,
    #[serde(default)]
    pub notification_channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub templates: Templates,
}

/// One `alerts` entry as written in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertRuleConfig {
    pub name: String,
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub aggregation: String,
    #[serde(default)]
    pub channels: Vec<String>,
}

fn default_interval_seconds() -> i64 {
    30
}

impl MonitorConfig {
    /// Reads, validates and completes the configuration at `path`, taking
    /// channel secrets from the process environment.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&content, |key| std::env::var(key).ok())
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// Parses YAML text. `env` resolves environment variable names; it is a
    /// parameter so secrets can be supplied without touching the process
    /// environment.
    pub fn from_yaml<F>(content: &str, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = serde_yaml_ng::from_str(content).context("failed to parse YAML")?;
        if config.interval_seconds <= 0 {
            config.interval_seconds = default_interval_seconds();
        }
        config.templates = config.templates.with_defaults();
        for placeholder in config.templates.dotted_placeholders() {
            tracing::warn!(
                placeholder = %placeholder,
                "Template placeholder is not recognized and will be sent as is; use {{{{name}}}} form, e.g. {{{{alert_name}}}}"
            );
        }
        config.validate(&ChannelRegistry::default())?;
        config.inject_secrets(env);
        Ok(config)
    }

    pub fn interval_secs(&self) -> u64 {
        u64::try_from(self.interval_seconds)
            .ok()
            .filter(|s| *s > 0)
            .unwrap_or(30)
    }

    /// The configured hostname, or the OS hostname when none is set.
    pub fn effective_hostname(&self) -> anyhow::Result<String> {
        let configured = self.hostname.trim();
        if !configured.is_empty() {
            return Ok(configured.to_string());
        }
        sysinfo::System::host_name()
            .filter(|h| !h.is_empty())
            .context("failed to determine OS hostname; set `hostname` in the config")
    }

    fn validate(&self, registry: &ChannelRegistry) -> anyhow::Result<()> {
        let mut rule_names = HashSet::new();
        for (i, rule) in self.alerts.iter().enumerate() {
            if rule.name.trim().is_empty() {
                bail!("alert rule at index {i} missing name");
            }
            if !rule_names.insert(rule.name.as_str()) {
                bail!("duplicate alert rule name '{}'", rule.name);
            }
            if rule.metric.trim().is_empty() {
                bail!("alert rule '{}' missing metric", rule.name);
            }
            if rule.channels.is_empty() {
                bail!("alert rule '{}' has no notification channels defined", rule.name);
            }
            rule.to_definition()?;
        }

        let mut channel_names = HashSet::new();
        for (i, channel) in self.notification_channels.iter().enumerate() {
            if channel.name.trim().is_empty() {
                bail!("notification channel at index {i} missing name");
            }
            if !channel_names.insert(channel.name.as_str()) {
                bail!("duplicate notification channel name '{}'", channel.name);
            }
            if !registry.has_plugin(&channel.channel_type) {
                bail!(
                    "notification channel '{}' has unknown type '{}'",
                    channel.name,
                    channel.channel_type
                );
            }
        }

        for rule in &self.alerts {
            for channel in rule.channels.iter().filter(|c| !channel_names.contains(c.as_str())) {
                tracing::warn!(rule = %rule.name, channel = %channel, "Alert rule references an undefined channel");
            }
        }
        Ok(())
    }

    fn inject_secrets<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for channel in &mut self.notification_channels {
            let field = match channel.channel_type.as_str() {
                "email" => "smtp_password",
                "telegram" => "bot_token",
                _ => continue,
            };
            let key = secret_env_key(&channel.channel_type, &channel.name);

            match env(&key).filter(|v| !v.is_empty()) {
                Some(secret) => {
                    if !channel.config.is_object() {
                        channel.config = Value::Object(serde_json::Map::new());
                    }
                    if let Some(obj) = channel.config.as_object_mut() {
                        obj.insert(field.to_string(), Value::String(secret));
                    }
                }
                None => {
                    let in_file = channel
                        .config
                        .get(field)
                        .and_then(Value::as_str)
                        .is_some_and(|v| !v.is_empty());
                    if in_file {
                        tracing::warn!(
                            channel = %channel.name,
                            env = %key,
                            "Secret found in config file; set it through the environment instead"
                        );
                    }
                }
            }
        }
    }

    /// Rules in declaration order, parsed into their typed form.
    pub fn rule_definitions(&self) -> anyhow::Result<Vec<RuleDefinition>> {
        self.alerts.iter().map(AlertRuleConfig::to_definition).collect()
    }

    /// History retention needed by the configured rules.
    pub fn retention_horizon_secs(&self) -> anyhow::Result<u64> {
        Ok(max_configured_duration_secs(
            &self.rule_definitions()?,
            self.interval_secs(),
        ))
    }
}

impl AlertRuleConfig {
    pub fn to_definition(&self) -> anyhow::Result<RuleDefinition> {
        let condition = parse_condition(&self.name, &self.condition)?;
        let duration_secs = parse_duration(&self.name, &self.duration)?;
        let aggregation = parse_aggregation(&self.name, &self.aggregation, duration_secs)?;
        Ok(RuleDefinition {
            name: self.name.clone(),
            metric: self.metric.clone(),
            condition,
            threshold: self.threshold,
            duration_secs,
            duration: self.duration.trim().to_string(),
            aggregation,
            channels: self.channels.clone(),
        })
    }
}

/// `RESMON_SMTP_PASSWORD_<NAME>` for email channels and
/// `RESMON_TELEGRAM_TOKEN_<NAME>` for Telegram, where `<NAME>` is the channel
/// name upper-cased with `-` replaced by `_`.
///
/// # Examples
///
/// ```
/// use monres::config::secret_env_key;
///
/// assert_eq!(secret_env_key("email", "ops-email"), "RESMON_SMTP_PASSWORD_OPS_EMAIL");
/// assert_eq!(secret_env_key("telegram", "tg"), "RESMON_TELEGRAM_TOKEN_TG");
/// ```
pub fn secret_env_key(channel_type: &str, channel_name: &str) -> String {
    let secret = match channel_type {
        "telegram" => "TELEGRAM_TOKEN",
        _ => "SMTP_PASSWORD",
    };
    let name = channel_name.replace('-', "_").to_uppercase();
    format!("{ENV_PREFIX}{secret}_{name}")
}
