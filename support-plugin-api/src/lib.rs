//! support-plugin-api - Plugin API for the support CLI host
//!
//! This crate provides the traits and types needed to write plugins for
//! support. Plugins are native Rust dynamic libraries that contribute CLI
//! commands to the host's command tree.
//!
//! # Example
//!
//! ```ignore
//! use support_plugin_api::{Command, CommandOutput, Plugin, export_plugin};
//!
//! #[derive(Default)]
//! pub struct HelloPlugin;
//!
//! impl Plugin for HelloPlugin {
//!     fn name(&self) -> &str {
//!         "hello"
//!     }
//!
//!     fn commands(&self) -> Vec<Command> {
//!         vec![Command::new("hello", "Say hello")
//!             .action(|_, _| Ok(CommandOutput::Text("hello".into())))]
//!     }
//! }
//!
//! export_plugin!(HelloPlugin);
//! ```
//!
//! # Capability contract
//!
//! A loadable module exports exactly two symbols:
//!
//! - [`NAME_SYMBOL`]: `extern "C" fn() -> *const c_char`, the identity query
//! - [`COMMANDS_SYMBOL`]: a [`CommandSupplier`] static, the command supplier
//!
//! [`export_plugin!`] generates both from a [`Plugin`] implementation.

pub mod command;
pub mod context;
pub mod error;
pub mod settings;

pub use command::{Action, ArgKind, ArgSpec, Command, CommandArgs, CommandOutput, CommandResult};
pub use context::{CommandContext, MemorySettings, SettingsStore};
pub use error::PluginError;
pub use settings::SettingValue;

/// Export name of the identity query.
pub const NAME_SYMBOL: &[u8] = b"_support_plugin_name";

/// Export name of the command supplier descriptor.
pub const COMMANDS_SYMBOL: &[u8] = b"_support_plugin_commands";

/// Signature of the identity query export.
pub type NameFn = extern "C" fn() -> *const std::ffi::c_char;

/// Shape tag for `fn() -> Vec<Command>` suppliers.
///
/// Stored as the first word of every [`CommandSupplier`]; the host refuses a
/// descriptor whose tag differs, which catches exports of the right name but
/// the wrong kind (a bare function, a different struct).
pub const SUPPLIER_SHAPE: u64 = shape_tag(b"fn() -> Vec<support_plugin_api::Command>");

/// FNV-1a over the shape description.
const fn shape_tag(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
        i += 1;
    }
    hash
}

/// Command supplier descriptor exported by every plugin module.
#[repr(C)]
pub struct CommandSupplier {
    /// Must equal [`SUPPLIER_SHAPE`]
    pub shape: u64,
    /// Produces the commands this plugin contributes
    pub supply: fn() -> Vec<Command>,
}

impl CommandSupplier {
    pub const fn new(supply: fn() -> Vec<Command>) -> Self {
        Self {
            shape: SUPPLIER_SHAPE,
            supply,
        }
    }

    /// Whether the descriptor carries the expected shape tag
    pub fn is_well_formed(&self) -> bool {
        self.shape == SUPPLIER_SHAPE
    }
}

/// The capability interface every plugin satisfies.
///
/// Dynamically loaded modules are wrapped by the host in a type implementing
/// this trait, so built-in and loaded plugins are dispatched the same way.
pub trait Plugin: Send + Sync {
    /// Identity of the plugin
    fn name(&self) -> &str;

    /// Commands this plugin contributes to the host's command tree
    fn commands(&self) -> Vec<Command>;
}

/// Export a plugin type for dynamic loading.
///
/// The type must implement [`Plugin`] and [`Default`].
///
/// # Usage
///
/// ```ignore
/// support_plugin_api::export_plugin!(MyPlugin);
/// ```
///
/// # Generated Symbols
///
/// - `_support_plugin_name()`: returns the plugin's name as a C string
/// - `_support_plugin_commands`: [`CommandSupplier`] producing the plugin's commands
#[macro_export]
macro_rules! export_plugin {
    ($plugin_type:ty) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _support_plugin_name() -> *const ::std::ffi::c_char {
            static NAME: ::std::sync::OnceLock<::std::ffi::CString> =
                ::std::sync::OnceLock::new();
            NAME.get_or_init(|| {
                let plugin = <$plugin_type>::default();
                ::std::ffi::CString::new($crate::Plugin::name(&plugin)).unwrap_or_default()
            })
            .as_ptr()
        }

        fn __support_plugin_supply() -> ::std::vec::Vec<$crate::Command> {
            let plugin = <$plugin_type>::default();
            $crate::Plugin::commands(&plugin)
        }

        #[unsafe(no_mangle)]
        #[allow(non_upper_case_globals)]
        pub static _support_plugin_commands: $crate::CommandSupplier =
            $crate::CommandSupplier::new(__support_plugin_supply);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Echo;

    impl Plugin for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn commands(&self) -> Vec<Command> {
            vec![Command::new("echo", "Echo arguments back")]
        }
    }

    export_plugin!(Echo);

    #[test]
    fn test_plugin_trait_is_object_safe() {
        fn _takes_boxed_plugin(_: Box<dyn Plugin>) {}
    }

    #[test]
    fn test_exported_name_is_c_string() {
        let ptr = _support_plugin_name();
        let name = unsafe { std::ffi::CStr::from_ptr(ptr) };
        assert_eq!(name.to_str().unwrap(), "echo");
    }

    #[test]
    fn test_exported_supplier_is_well_formed() {
        assert!(_support_plugin_commands.is_well_formed());
        let commands = (_support_plugin_commands.supply)();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].name, "echo");
    }

    #[test]
    fn test_shape_tag_is_stable_and_distinct() {
        assert_eq!(SUPPLIER_SHAPE, shape_tag(b"fn() -> Vec<support_plugin_api::Command>"));
        assert_ne!(SUPPLIER_SHAPE, shape_tag(b"fn() -> Vec<Command>"));
        assert_ne!(SUPPLIER_SHAPE, 0);
    }

    #[test]
    fn test_malformed_descriptor_is_detected() {
        let supplier = CommandSupplier {
            shape: 42,
            supply: Vec::new,
        };
        assert!(!supplier.is_well_formed());
    }
}
