//! RegistryStore - the process-wide registry context
//!
//! Constructed once at startup and handed explicitly to every command
//! handler. Every mutation re-persists the whole document before returning;
//! if the write fails the in-memory registry keeps its previous state.
//!
//! A document that exists but cannot be read does not stop the host:
//! [`RegistryStore::open_or_empty`] falls back to an empty registry and
//! refuses every change until the file is repaired or removed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use support_plugin_api::{PluginError, SettingValue, SettingsStore};

use super::error::PluginHostError;
use super::loader::find_module;
use super::registry::Registry;

/// Result of registering a plugin directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Appended to the search path
    Added,
    /// Already present; nothing changed
    AlreadyRegistered,
}

/// Registry plus the location it is persisted to
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
    registry: Registry,
    /// Why the document on disk could not be read, when running on a
    /// fallback registry
    unreadable: Option<String>,
}

impl RegistryStore {
    /// Open the registry at `path`.
    ///
    /// A missing document is not an error: an empty registry is created and
    /// persisted immediately.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PluginHostError> {
        let path = path.into();
        let registry = if path.exists() {
            Registry::load(&path)?
        } else {
            tracing::debug!(path = %path.display(), "Registry not found, creating");
            let registry = Registry::default();
            registry.save(&path)?;
            registry
        };
        Ok(Self {
            path,
            registry,
            unreadable: None,
        })
    }

    /// Open the registry at `path`, falling back to an empty registry.
    ///
    /// When the document exists but cannot be read or parsed, the failure is
    /// logged and kept; every later mutation is refused with
    /// [`PluginHostError::RegistryUnreadable`] so the file is never replaced.
    /// When a missing document cannot be created, the store still works in
    /// memory and the next mutation retries the write.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(path.clone()) {
            Ok(store) => store,
            Err(e) => {
                let exists = path.exists();
                if exists {
                    tracing::error!(
                        path = %path.display(),
                        error = %e,
                        "Registry could not be read; continuing with an empty registry"
                    );
                } else {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Registry could not be created; continuing in memory"
                    );
                }
                Self {
                    unreadable: exists.then(|| e.to_string()),
                    path,
                    registry: Registry::default(),
                }
            }
        }
    }

    /// Open the registry at the default location (see `support_paths::registry_path`)
    pub fn open_default() -> Result<Self, PluginHostError> {
        Self::open(support_paths::registry_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Why the document could not be read, if this store runs on a fallback
    pub fn unreadable(&self) -> Option<&str> {
        self.unreadable.as_deref()
    }

    /// Apply `change` to a copy of the registry, persist it, then commit.
    fn mutate<T>(&mut self, change: impl FnOnce(&mut Registry) -> T) -> Result<T, PluginHostError> {
        if let Some(reason) = &self.unreadable {
            return Err(PluginHostError::RegistryUnreadable {
                path: self.path.clone(),
                reason: reason.clone(),
            });
        }
        let mut next = self.registry.clone();
        let out = change(&mut next);
        next.save(&self.path)?;
        self.registry = next;
        Ok(out)
    }

    // ─── Directories ─────────────────────────────────────────────────

    /// Ensure `dir` exists and add it to the search path.
    ///
    /// Registering the same path twice is a no-op that reports
    /// [`Registration::AlreadyRegistered`].
    pub fn register_directory(&mut self, dir: &Path) -> Result<Registration, PluginHostError> {
        std::fs::create_dir_all(dir).map_err(|source| PluginHostError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        if self.registry.plugin_dirs().iter().any(|p| p == dir) {
            tracing::debug!(dir = %dir.display(), "Plugin directory already registered");
            return Ok(Registration::AlreadyRegistered);
        }

        self.mutate(|r| r.add_plugin_dir(dir))?;
        tracing::info!(dir = %dir.display(), "Plugin directory registered");
        Ok(Registration::Added)
    }

    // ─── Enablement ──────────────────────────────────────────────────

    /// Enable or disable a plugin.
    ///
    /// Enabling searches the registered directories as they are right now and
    /// fails with [`PluginHostError::PluginNotFound`] when no module matches;
    /// the registry is left untouched in that case. Disabling never checks.
    /// Returns the module path that satisfied the check when enabling.
    pub fn set_enabled(
        &mut self,
        name: &str,
        enabled: bool,
    ) -> Result<Option<PathBuf>, PluginHostError> {
        let found = if enabled {
            let path = find_module(self.registry.plugin_dirs(), name).ok_or_else(|| {
                PluginHostError::PluginNotFound {
                    name: name.to_string(),
                }
            })?;
            Some(path)
        } else {
            None
        };

        self.mutate(|r| r.set_enabled(name, enabled))?;
        tracing::info!(plugin = %name, enabled, "Plugin enablement changed");
        Ok(found)
    }

    pub fn enable(&mut self, name: &str) -> Result<PathBuf, PluginHostError> {
        self.set_enabled(name, true)?
            .ok_or_else(|| PluginHostError::PluginNotFound {
                name: name.to_string(),
            })
    }

    pub fn disable(&mut self, name: &str) -> Result<(), PluginHostError> {
        self.set_enabled(name, false).map(|_| ())
    }

    /// Full enablement map, unfiltered
    pub fn list(&self) -> &BTreeMap<String, bool> {
        &self.registry.enabled
    }

    // ─── Settings ────────────────────────────────────────────────────

    pub fn get_setting(&self, plugin: &str, key: &str) -> Option<&SettingValue> {
        self.registry.get_setting(plugin, key)
    }

    pub fn put_setting(
        &mut self,
        plugin: &str,
        key: &str,
        value: SettingValue,
    ) -> Result<(), PluginHostError> {
        self.mutate(|r| r.put_setting(plugin, key, value))?;
        tracing::debug!(plugin = %plugin, key = %key, "Plugin setting updated");
        Ok(())
    }

    pub fn remove_setting(
        &mut self,
        plugin: &str,
        key: &str,
    ) -> Result<Option<SettingValue>, PluginHostError> {
        if self.registry.get_setting(plugin, key).is_none() {
            return Ok(None);
        }
        self.mutate(|r| r.remove_setting(plugin, key))
    }
}

impl SettingsStore for RegistryStore {
    fn get_setting(&self, plugin: &str, key: &str) -> Option<SettingValue> {
        self.registry.get_setting(plugin, key).cloned()
    }

    fn put_setting(
        &mut self,
        plugin: &str,
        key: &str,
        value: SettingValue,
    ) -> Result<(), PluginError> {
        RegistryStore::put_setting(self, plugin, key, value)
            .map_err(|e| PluginError::Settings(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn module_file(dir: &Path, name: &str) -> PathBuf {
        let ext = if cfg!(target_os = "macos") {
            "dylib"
        } else if cfg!(target_os = "windows") {
            "dll"
        } else {
            "so"
        };
        let path = dir.join(format!("{}.{}", name, ext));
        std::fs::write(&path, b"").unwrap();
        path
    }

    fn open(dir: &TempDir) -> RegistryStore {
        RegistryStore::open(dir.path().join("config/registry.toml")).unwrap()
    }

    #[test]
    fn test_open_creates_and_persists_empty_document() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        assert!(store.path().exists());
        assert_eq!(store.registry(), &Registry::default());
    }

    #[test]
    fn test_register_directory_twice_keeps_one_entry() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let plugins = dir.path().join("plugins");

        assert_eq!(
            store.register_directory(&plugins).unwrap(),
            Registration::Added
        );
        assert_eq!(
            store.register_directory(&plugins).unwrap(),
            Registration::AlreadyRegistered
        );

        assert_eq!(store.registry().plugin_dirs(), &[plugins.clone()]);
        let reloaded = Registry::load(store.path()).unwrap();
        assert_eq!(reloaded.plugin_dirs(), &[plugins]);
    }

    #[test]
    fn test_register_directory_creates_missing_ancestors() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let nested = dir.path().join("a/b/c");

        store.register_directory(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_enable_unknown_plugin_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.register_directory(&dir.path().join("plugins")).unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let err = store.enable("ghost").unwrap_err();
        assert!(matches!(err, PluginHostError::PluginNotFound { name } if name == "ghost"));
        assert!(store.list().is_empty());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_enable_then_disable() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let plugins = dir.path().join("plugins");
        store.register_directory(&plugins).unwrap();
        let module = module_file(&plugins, "libfoo_plugin");

        assert_eq!(store.enable("foo").unwrap(), module);
        assert_eq!(store.list().get("foo"), Some(&true));

        store.disable("foo").unwrap();
        assert_eq!(store.list().get("foo"), Some(&false));

        let reloaded = Registry::load(store.path()).unwrap();
        assert_eq!(reloaded.enablement("foo"), Some(false));
    }

    #[test]
    fn test_enable_checks_current_filesystem() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let plugins = dir.path().join("plugins");
        store.register_directory(&plugins).unwrap();
        let module = module_file(&plugins, "foo");

        store.enable("foo").unwrap();
        std::fs::remove_file(module).unwrap();

        // the earlier successful enable does not count once the file is gone
        assert!(store.enable("foo").is_err());
        assert_eq!(store.list().get("foo"), Some(&true));
    }

    #[test]
    fn test_disable_unknown_creates_disabled_entry() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);

        store.disable("never-seen").unwrap();
        assert_eq!(store.list().get("never-seen"), Some(&false));
    }

    #[test]
    fn test_settings_roundtrip_and_not_found() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);

        store.put_setting("x", "k", SettingValue::from("v")).unwrap();
        assert_eq!(store.get_setting("x", "k"), Some(&SettingValue::from("v")));
        assert_eq!(store.get_setting("y", "k"), None);

        let reopened = RegistryStore::open(store.path()).unwrap();
        assert_eq!(
            reopened.get_setting("x", "k"),
            Some(&SettingValue::from("v"))
        );
    }

    #[test]
    fn test_remove_setting_persists() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        store.put_setting("x", "k", SettingValue::from(1)).unwrap();

        assert_eq!(
            store.remove_setting("x", "k").unwrap(),
            Some(SettingValue::from(1))
        );
        assert_eq!(store.remove_setting("x", "k").unwrap(), None);

        let reloaded = Registry::load(store.path()).unwrap();
        assert!(reloaded.settings_for("x").is_none());
    }

    #[test]
    fn test_settings_store_trait_scopes_by_plugin() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);

        SettingsStore::put_setting(&mut store, "ntfy", "server", SettingValue::from("a")).unwrap();
        assert_eq!(
            SettingsStore::get_setting(&store, "ntfy", "server"),
            Some(SettingValue::from("a"))
        );
        assert_eq!(SettingsStore::get_setting(&store, "docker", "server"), None);
    }

    #[test]
    fn test_unreadable_document_falls_back_and_refuses_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "plugin_dirs = [").unwrap();

        assert!(RegistryStore::open(&path).is_err());

        let mut store = RegistryStore::open_or_empty(&path);
        assert_eq!(store.registry(), &Registry::default());
        assert!(store.list().is_empty());
        assert!(store.unreadable().is_some());

        let err = store.disable("docker").unwrap_err();
        assert!(matches!(err, PluginHostError::RegistryUnreadable { .. }));
        let err = store
            .register_directory(&dir.path().join("plugins"))
            .unwrap_err();
        assert!(matches!(err, PluginHostError::RegistryUnreadable { .. }));
        assert!(SettingsStore::put_setting(&mut store, "x", "k", SettingValue::from(1)).is_err());

        assert!(store.list().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "plugin_dirs = [");
    }

    #[test]
    fn test_open_or_empty_on_healthy_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");
        RegistryStore::open(&path).unwrap().disable("docker").unwrap();

        let mut store = RegistryStore::open_or_empty(&path);
        assert!(store.unreadable().is_none());
        assert_eq!(store.list().get("docker"), Some(&false));
        store.disable("ntfy").unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_persist_keeps_previous_state() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config");
        let mut store = open(&dir);
        store.put_setting("x", "k", SettingValue::from("old")).unwrap();

        std::fs::set_permissions(&config, std::fs::Permissions::from_mode(0o555)).unwrap();
        let result = store.put_setting("x", "k", SettingValue::from("new"));
        std::fs::set_permissions(&config, std::fs::Permissions::from_mode(0o755)).unwrap();

        // root can write through read-only directories; only assert when the write failed
        if result.is_err() {
            assert_eq!(store.get_setting("x", "k"), Some(&SettingValue::from("old")));
        }
    }
}
