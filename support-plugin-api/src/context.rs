//! Context handed to command actions

use std::collections::BTreeMap;

use crate::error::PluginError;
use crate::settings::SettingValue;

/// Persisted key/value space scoped per plugin name.
///
/// The host implements this over its registry document; every successful
/// `put_setting` is durable by the time it returns.
pub trait SettingsStore {
    /// Look up `key` for `plugin`. `None` means the key was never set.
    fn get_setting(&self, plugin: &str, key: &str) -> Option<SettingValue>;

    /// Store `value` under `key` for `plugin`.
    fn put_setting(
        &mut self,
        plugin: &str,
        key: &str,
        value: SettingValue,
    ) -> Result<(), PluginError>;
}

/// In-memory settings store, for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    values: BTreeMap<String, BTreeMap<String, SettingValue>>,
}

impl MemorySettings {
    /// Keys set for a plugin, if any
    pub fn plugin(&self, plugin: &str) -> Option<&BTreeMap<String, SettingValue>> {
        self.values.get(plugin)
    }
}

impl SettingsStore for MemorySettings {
    fn get_setting(&self, plugin: &str, key: &str) -> Option<SettingValue> {
        self.values.get(plugin)?.get(key).cloned()
    }

    fn put_setting(
        &mut self,
        plugin: &str,
        key: &str,
        value: SettingValue,
    ) -> Result<(), PluginError> {
        self.values
            .entry(plugin.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }
}

/// Context passed to every command action.
///
/// Settings access is scoped to the plugin that owns the running command,
/// so a plugin only sees its own keys.
pub struct CommandContext<'a> {
    plugin_name: String,
    settings: &'a mut dyn SettingsStore,
}

impl<'a> CommandContext<'a> {
    pub fn new(plugin_name: impl Into<String>, settings: &'a mut dyn SettingsStore) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            settings,
        }
    }

    /// Name of the plugin that owns the running command
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    // ─── Settings ────────────────────────────────────────────────────

    /// Read a setting for this plugin
    ///
    /// # Example
    /// ```ignore
    /// let server = ctx.setting("server").and_then(|v| v.as_str().map(String::from));
    /// ```
    pub fn setting(&self, key: &str) -> Option<SettingValue> {
        self.settings.get_setting(&self.plugin_name, key)
    }

    /// String setting, or `default` when unset or not a string
    pub fn setting_str_or(&self, key: &str, default: &str) -> String {
        self.setting(key)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    /// Write a setting for this plugin. Persisted before returning.
    pub fn put_setting(
        &mut self,
        key: &str,
        value: impl Into<SettingValue>,
    ) -> Result<(), PluginError> {
        self.settings
            .put_setting(&self.plugin_name, key, value.into())
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message
    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(plugin = %self.plugin_name, "{}", message);
    }
}
