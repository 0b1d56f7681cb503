//! Plugin registry - directories, enablement and per-plugin settings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use support_plugin_api::SettingValue;
use tempfile::NamedTempFile;

use super::error::PluginHostError;

/// Registry document
///
/// Stored as TOML in `~/.config/support/registry.toml`:
///
/// ```toml
/// plugin_dirs = ["/opt/support/plugins"]
///
/// [enabled]
/// docker = true
///
/// [settings.ntfy]
/// server = "https://ntfy.sh"
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    /// Directories searched for plugin modules, in registration order
    #[serde(default)]
    pub plugin_dirs: Vec<PathBuf>,
    /// Enablement flag per plugin name. Absent means never seen.
    #[serde(default)]
    pub enabled: BTreeMap<String, bool>,
    /// Settings per plugin name, created on first write
    #[serde(default)]
    pub settings: BTreeMap<String, BTreeMap<String, SettingValue>>,
}

impl Registry {
    /// Load registry from a TOML file
    ///
    /// Returns an empty registry if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, PluginHostError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let registry: Self =
            toml::from_str(&content).map_err(|e| PluginHostError::Registry(e.to_string()))?;
        Ok(registry)
    }

    /// Save registry to a TOML file
    ///
    /// The document is written to a temporary file next to `path` and renamed
    /// over it, so readers never observe a partially written file.
    pub fn save(&self, path: &Path) -> Result<(), PluginHostError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PluginHostError::Registry(e.to_string()))?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        file.persist(path).map_err(|e| PluginHostError::Io(e.error))?;
        Ok(())
    }

    /// Registered plugin directories in search order
    pub fn plugin_dirs(&self) -> &[PathBuf] {
        &self.plugin_dirs
    }

    /// Append a directory unless the exact path is already registered.
    ///
    /// Returns `false` for a duplicate.
    pub fn add_plugin_dir(&mut self, path: &Path) -> bool {
        if self.plugin_dirs.iter().any(|p| p == path) {
            return false;
        }
        self.plugin_dirs.push(path.to_path_buf());
        true
    }

    /// Check if a plugin is enabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.get(name).copied().unwrap_or(false)
    }

    /// Explicit enablement state; `None` for a name never registered
    pub fn enablement(&self, name: &str) -> Option<bool> {
        self.enabled.get(name).copied()
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        self.enabled.insert(name.to_string(), enabled);
    }

    /// Get iterator over enabled plugins
    pub fn enabled_plugins(&self) -> impl Iterator<Item = &str> {
        self.enabled
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
    }

    // ─── Settings ────────────────────────────────────────────────────

    pub fn get_setting(&self, plugin: &str, key: &str) -> Option<&SettingValue> {
        self.settings.get(plugin)?.get(key)
    }

    /// All settings for a plugin; `None` until one has been written
    pub fn settings_for(&self, plugin: &str) -> Option<&BTreeMap<String, SettingValue>> {
        self.settings.get(plugin)
    }

    pub fn put_setting(&mut self, plugin: &str, key: &str, value: SettingValue) {
        self.settings
            .entry(plugin.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Remove a key, dropping the plugin's map once it is empty.
    pub fn remove_setting(&mut self, plugin: &str, key: &str) -> Option<SettingValue> {
        let values = self.settings.get_mut(plugin)?;
        let removed = values.remove(key);
        if values.is_empty() {
            self.settings.remove(plugin);
        }
        removed
    }
}
