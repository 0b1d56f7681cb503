//! XDG Base Directory paths for support.
//!
//! CLI tools should use XDG paths for cross-platform consistency,
//! not platform-native paths. This matches tools like gh, docker, kubectl.

use std::path::PathBuf;

/// Environment variable that points the host at a specific registry document.
pub const REGISTRY_ENV: &str = "SUPPORT_REGISTRY";

/// File name of the persisted plugin registry.
pub const REGISTRY_FILE: &str = "registry.toml";

/// Get the support config directory.
///
/// Returns `$XDG_CONFIG_HOME/support` if set, otherwise `~/.config/support`.
///
/// # Examples
///
/// ```
/// use support_paths::config_dir;
///
/// let config = config_dir();
/// let plugin_dir = config.join("plugins");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("support")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/support")
    } else {
        PathBuf::from(".config/support")
    }
}

/// Get the path of the plugin registry document.
///
/// `$SUPPORT_REGISTRY` wins when set and non-empty, otherwise the document
/// lives at `<config_dir>/registry.toml`.
pub fn registry_path() -> PathBuf {
    match std::env::var(REGISTRY_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => config_dir().join(REGISTRY_FILE),
    }
}

/// Default directory offered for user-installed plugin modules.
pub fn default_plugin_dir() -> PathBuf {
    config_dir().join("plugins")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_dir_ends_with_support() {
        let path = config_dir();
        assert!(
            path.ends_with("support"),
            "config_dir should end with 'support'"
        );
    }

    #[test]
    #[serial]
    fn test_config_dir_respects_xdg_env() {
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-config");
        }
        let path = config_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-config/support"));
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
        }
    }

    #[test]
    #[serial]
    fn test_registry_path_defaults_to_config_dir() {
        unsafe {
            std::env::remove_var(REGISTRY_ENV);
        }
        let path = registry_path();
        assert!(path.ends_with("support/registry.toml"));
    }

    #[test]
    #[serial]
    fn test_registry_path_respects_override() {
        unsafe {
            std::env::set_var(REGISTRY_ENV, "/tmp/custom/registry.toml");
        }
        let path = registry_path();
        assert_eq!(path, PathBuf::from("/tmp/custom/registry.toml"));
        unsafe {
            std::env::remove_var(REGISTRY_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_default_plugin_dir_is_under_config() {
        assert!(default_plugin_dir().starts_with(config_dir()));
        assert!(default_plugin_dir().ends_with("plugins"));
    }
}
