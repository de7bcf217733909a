use crate::error::NotifyError;
use crate::utils::redact_sensitive_json;
use crate::{ChannelConfig, Notifier};
use anyhow::Result;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Factory for creating [`Notifier`] instances from JSON configuration.
///
/// Each plugin is registered in the [`ChannelRegistry`] by its `name()`,
/// which is the `type` written in the configuration file.
pub trait ChannelPlugin: Send + Sync {
    /// Returns the plugin type name (e.g., `"email"`, `"telegram"`).
    fn name(&self) -> &str;

    /// Validates a JSON config blob against this plugin's expected schema.
    fn validate_config(&self, config: &Value) -> Result<()>;

    /// Creates a configured channel named `channel_name` from a validated
    /// JSON config.
    fn create_channel(&self, channel_name: &str, config: &Value) -> Result<Box<dyn Notifier>>;

    /// Returns a copy of `config` with secrets replaced by `"***"`, for logs.
    fn redact_config(&self, config: &Value) -> Value {
        redact_sensitive_json(config)
    }
}

/// Registry of available [`ChannelPlugin`]s, used to instantiate
/// notification channels from configuration.
///
/// # Examples
///
/// ```
/// use monres_notify::plugin::ChannelRegistry;
///
/// let registry = ChannelRegistry::default();
/// assert!(registry.has_plugin("email"));
/// assert!(registry.has_plugin("telegram"));
/// assert!(registry.has_plugin("stdout"));
/// assert!(!registry.has_plugin("nonexistent"));
/// ```
pub struct ChannelRegistry {
    plugins: HashMap<String, Box<dyn ChannelPlugin>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) {
        let name = plugin.name().to_string();
        self.plugins.insert(name, plugin);
    }

    pub fn create_channel(
        &self,
        type_name: &str,
        channel_name: &str,
        config: &Value,
    ) -> Result<Box<dyn Notifier>> {
        let plugin = self
            .plugins
            .get(type_name)
            .ok_or_else(|| NotifyError::UnknownChannelType(type_name.to_string()))?;
        plugin.validate_config(config)?;
        plugin.create_channel(channel_name, config)
    }

    pub fn get_plugin(&self, type_name: &str) -> Option<&dyn ChannelPlugin> {
        self.plugins.get(type_name).map(|p| p.as_ref())
    }

    pub fn has_plugin(&self, type_name: &str) -> bool {
        self.plugins.contains_key(type_name)
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Instantiates every configured channel, keyed by name.
    ///
    /// A channel whose type is unknown or whose config does not validate is
    /// logged and skipped, so one bad channel does not disable the others.
    /// Duplicate names are a configuration error.
    pub fn build_notifiers(
        &self,
        channels: &[ChannelConfig],
    ) -> crate::error::Result<BTreeMap<String, Box<dyn Notifier>>> {
        let mut seen = HashSet::new();
        for channel in channels {
            if !seen.insert(channel.name.as_str()) {
                return Err(NotifyError::DuplicateChannel(channel.name.clone()));
            }
        }

        let mut notifiers = BTreeMap::new();
        for channel in channels {
            match self.create_channel(&channel.channel_type, &channel.name, &channel.config) {
                Ok(notifier) => {
                    tracing::info!(
                        channel = %channel.name,
                        channel_type = %channel.channel_type,
                        "Notification channel initialized"
                    );
                    notifiers.insert(channel.name.clone(), notifier);
                }
                Err(e) => {
                    let config = match self.get_plugin(&channel.channel_type) {
                        Some(plugin) => plugin.redact_config(&channel.config),
                        None => redact_sensitive_json(&channel.config),
                    };
                    tracing::warn!(
                        channel = %channel.name,
                        channel_type = %channel.channel_type,
                        config = %config,
                        error = %e,
                        "Skipping notification channel"
                    );
                }
            }
        }
        Ok(notifiers)
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::channels::stdout::StdoutPlugin));
        registry.register(Box::new(crate::channels::email::EmailPlugin));
        registry.register(Box::new(crate::channels::telegram::TelegramPlugin));
        registry
    }
}
