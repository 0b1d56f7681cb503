//! Module openers - turn a discovered module file into a `Plugin`

use libloading::Library;
use std::collections::HashMap;
use std::ffi::CStr;
use std::path::Path;

use support_plugin_api::{
    COMMANDS_SYMBOL, Command, CommandSupplier, NAME_SYMBOL, NameFn, Plugin,
};

use super::error::ModuleErrorKind;
use super::loader::module_name;

const NAME_EXPORT: &str = "_support_plugin_name";
const COMMANDS_EXPORT: &str = "_support_plugin_commands";

/// Opens a module file and validates its capability contract.
pub trait ModuleOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Plugin>, ModuleErrorKind>;
}

/// A plugin backed by a loaded dynamic library
pub struct DynamicModule {
    name: String,
    supply: fn() -> Vec<Command>,
    /// Keep the library loaded
    _library: Library,
}

impl Plugin for DynamicModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn commands(&self) -> Vec<Command> {
        (self.supply)()
    }
}

/// Opens modules with `libloading`
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryOpener;

impl ModuleOpener for LibraryOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Plugin>, ModuleErrorKind> {
        // SAFETY: the user explicitly registered the directory and enabled
        // this plugin; the module is expected to follow the plugin contract.
        let library =
            unsafe { Library::new(path) }.map_err(|e| ModuleErrorKind::Load(e.to_string()))?;

        // SAFETY: the symbol is read with the signature the contract defines.
        let name_fn: NameFn = *unsafe { library.get::<NameFn>(NAME_SYMBOL) }.map_err(|e| {
            ModuleErrorKind::MissingCapability {
                symbol: NAME_EXPORT,
                reason: e.to_string(),
            }
        })?;

        // SAFETY: the symbol address is the address of the exported static.
        let supplier: *const CommandSupplier =
            *unsafe { library.get::<*const CommandSupplier>(COMMANDS_SYMBOL) }.map_err(|e| {
                ModuleErrorKind::MissingCapability {
                    symbol: COMMANDS_EXPORT,
                    reason: e.to_string(),
                }
            })?;

        if supplier.is_null() {
            return Err(ModuleErrorKind::MisshapenCapability {
                symbol: COMMANDS_EXPORT,
                reason: "null descriptor".to_string(),
            });
        }

        // SAFETY: non-null and points into the still-loaded library. The
        // shape word is checked before the function pointer is trusted.
        let supplier = unsafe { &*supplier };
        if !supplier.is_well_formed() {
            return Err(ModuleErrorKind::MisshapenCapability {
                symbol: COMMANDS_EXPORT,
                reason: format!(
                    "expected a fn() -> Vec<Command> supplier, found shape tag {:#018x}",
                    supplier.shape
                ),
            });
        }
        let supply = supplier.supply;

        let name = read_identity(name_fn)?;

        Ok(Box::new(DynamicModule {
            name,
            supply,
            _library: library,
        }))
    }
}

fn read_identity(name_fn: NameFn) -> Result<String, ModuleErrorKind> {
    let ptr = name_fn();
    if ptr.is_null() {
        return Err(ModuleErrorKind::MisshapenCapability {
            symbol: NAME_EXPORT,
            reason: "returned a null name".to_string(),
        });
    }
    // SAFETY: the contract requires a NUL-terminated string with static lifetime.
    let name = unsafe { CStr::from_ptr(ptr) };
    match name.to_str() {
        Ok("") => Err(ModuleErrorKind::MisshapenCapability {
            symbol: NAME_EXPORT,
            reason: "returned an empty name".to_string(),
        }),
        Ok(name) => Ok(name.to_string()),
        Err(e) => Err(ModuleErrorKind::MisshapenCapability {
            symbol: NAME_EXPORT,
            reason: e.to_string(),
        }),
    }
}

type Factory = Box<dyn Fn() -> Result<Box<dyn Plugin>, ModuleErrorKind> + Send + Sync>;

/// Registered-name lookup table of plugins compiled into the host.
///
/// Resolves a module file to the plugin registered under the name derived
/// from that file, so statically linked plugins go through the same
/// discovery, enablement and validation path as dynamic ones.
#[derive(Default)]
pub struct StaticOpener {
    factories: HashMap<String, Factory>,
}

impl StaticOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin constructor under a module name
    pub fn with_plugin<P, F>(mut self, name: &str, factory: F) -> Self
    where
        P: Plugin + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.factories.insert(
            name.to_string(),
            Box::new(move || -> Result<Box<dyn Plugin>, ModuleErrorKind> {
                Ok(Box::new(factory()))
            }),
        );
        self
    }

    /// Register a module name that fails validation with the given error
    pub fn with_failure<F>(mut self, name: &str, failure: F) -> Self
    where
        F: Fn() -> ModuleErrorKind + Send + Sync + 'static,
    {
        self.factories.insert(
            name.to_string(),
            Box::new(move || -> Result<Box<dyn Plugin>, ModuleErrorKind> { Err(failure()) }),
        );
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl ModuleOpener for StaticOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Plugin>, ModuleErrorKind> {
        let name = module_name(path).ok_or_else(|| {
            ModuleErrorKind::Load(format!("{} is not a module file", path.display()))
        })?;
        let factory = self.factories.get(&name).ok_or_else(|| {
            ModuleErrorKind::Load(format!("no built-in module registered as '{}'", name))
        })?;
        factory()
    }
}
