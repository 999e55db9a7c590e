//! Resolution of symbolic plugin references.
//!
//! A [`Resolver`] maps a dotted identifier such as `pack.decorate` to a
//! plugin handle. The pipeline resolves `Named` specs through it right
//! before the deduplication check, so two names that resolve to the same
//! handle count as the same plugin.
//!
//! [`Registry`] is the in-memory implementation: a namespace of modules,
//! each holding named plugins and optionally a *default export* that a bare
//! module path resolves to.

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::PluginRef;

/// Maps a dotted identifier to a plugin.
///
/// Resolvers are pure lookups: they never touch pipeline state, and the
/// whitelist (when the pipeline has one) is checked before delegation.
pub trait Resolver<C> {
    /// Looks up `name` and returns a handle to the plugin it designates.
    fn resolve(&self, name: &str) -> anyhow::Result<PluginRef<C>>;
}

/// Failed lookup in a [`Registry`].
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unknown module '{0}'")]
    UnknownModule(String),
    #[error("module '{module}' has no plugin named '{symbol}'")]
    UnknownSymbol { module: String, symbol: String },
    #[error("module '{0}' has no default plugin")]
    NoDefault(String),
}

/// Rejection of a symbolic reference that is not in the pipeline's whitelist.
#[derive(Debug, Error)]
#[error("'{0}' is not in the plugin whitelist")]
pub struct NotWhitelisted(pub String);

/// An in-memory namespace of plugin modules.
///
/// Identifiers are resolved the way the pipeline expects:
/// - if the full identifier names a module, its default export is returned;
/// - otherwise the identifier is split at the **last** `.` into a module
///   path and a symbol, and both are looked up.
///
/// # Example
/// ```
/// use weft::PluginRef;
/// use weft::plugin::resolve::{Registry, Resolver};
///
/// fn decorate(scope: &mut weft::Scope<'_, Vec<String>>) {
///     scope.ctx().push("decorated".to_owned());
/// }
///
/// let mut registry: Registry<Vec<String>> = Registry::new();
/// let plugin = PluginRef::new(decorate);
/// registry.insert("pack.vanity", "decorate", plugin.clone());
/// registry.insert_default("pack.vanity", plugin);
///
/// assert!(registry.resolve("pack.vanity.decorate").is_ok());
/// assert!(registry.resolve("pack.vanity").is_ok());
/// assert!(registry.resolve("pack.vanity.missing").is_err());
/// ```
pub struct Registry<C> {
    modules: FxHashMap<String, Module<C>>,
}

struct Module<C> {
    default: Option<PluginRef<C>>,
    symbols: FxHashMap<String, PluginRef<C>>,
}

impl<C> Module<C> {
    fn new() -> Self {
        Module {
            default: None,
            symbols: FxHashMap::default(),
        }
    }
}

impl<C> Registry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry {
            modules: FxHashMap::default(),
        }
    }

    /// Registers `plugin` under `module.symbol`.
    ///
    /// The module is created on first use. Registering the same symbol twice
    /// replaces the previous plugin.
    pub fn insert(&mut self, module: impl Into<String>, symbol: impl Into<String>, plugin: PluginRef<C>) {
        self.modules
            .entry(module.into())
            .or_insert_with(Module::new)
            .symbols
            .insert(symbol.into(), plugin);
    }

    /// Registers the default export of `module`: the plugin that a bare
    /// module path resolves to.
    pub fn insert_default(&mut self, module: impl Into<String>, plugin: PluginRef<C>) {
        self.modules.entry(module.into()).or_insert_with(Module::new).default = Some(plugin);
    }

    fn lookup(&self, name: &str) -> Result<PluginRef<C>, ResolveError> {
        if let Some(module) = self.modules.get(name) {
            return module
                .default
                .clone()
                .ok_or_else(|| ResolveError::NoDefault(name.to_owned()));
        }
        let Some((module_path, symbol)) = name.rsplit_once('.') else {
            return Err(ResolveError::UnknownModule(name.to_owned()));
        };
        let module = self
            .modules
            .get(module_path)
            .ok_or_else(|| ResolveError::UnknownModule(module_path.to_owned()))?;
        module
            .symbols
            .get(symbol)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownSymbol {
                module: module_path.to_owned(),
                symbol: symbol.to_owned(),
            })
    }
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Registry::new()
    }
}

impl<C> Resolver<C> for Registry<C> {
    fn resolve(&self, name: &str) -> anyhow::Result<PluginRef<C>> {
        Ok(self.lookup(name)?)
    }
}
