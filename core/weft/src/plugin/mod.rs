//! Plugins and plugin references.
//!
//! A plugin is any value implementing [`Plugin`]. It is invoked at most once
//! per pipeline, receives a [`Scope`] over the pipeline, and either runs to
//! completion on the spot or hands back a suspendable [`Task`]. Closures and
//! plain functions are plugins too, through a blanket impl.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::pipeline::Scope;
use crate::pipeline::error::PluginError;
use crate::pipeline::task::Task;

pub mod resolve;

/// A plugin of a pipeline over the context type `C`.
pub trait Plugin<C> {
    /// Invokes the plugin.
    ///
    /// A plain plugin does its work here and returns [`Invocation::Done`].
    /// A suspendable plugin returns [`Invocation::Suspend`] with a fresh
    /// [`Task`]; the pipeline then advances the task to its first suspension
    /// point.
    fn invoke(&self, scope: &mut Scope<'_, C>) -> Result<Invocation<C>, PluginError>;
}

/// What invoking a plugin produced.
pub enum Invocation<C> {
    /// The plugin ran to completion.
    Done,
    /// The plugin is a suspendable activity that has not run yet.
    Suspend(Box<dyn Task<C>>),
}

impl<C> Invocation<C> {
    /// Wraps a task for [`Invocation::Suspend`].
    pub fn suspend(task: impl Task<C> + 'static) -> Self {
        Invocation::Suspend(Box::new(task))
    }
}

/// Conversion of plugin return values into an [`Invocation`].
///
/// This is what lets a plain closure return `()` or a `Result`, and a
/// suspendable one return its task, without ceremony at the call site.
pub trait IntoInvocation<C> {
    fn into_invocation(self) -> Result<Invocation<C>, PluginError>;
}

impl<C> IntoInvocation<C> for () {
    fn into_invocation(self) -> Result<Invocation<C>, PluginError> {
        Ok(Invocation::Done)
    }
}

impl<C> IntoInvocation<C> for Result<(), PluginError> {
    fn into_invocation(self) -> Result<Invocation<C>, PluginError> {
        self.map(|()| Invocation::Done)
    }
}

impl<C> IntoInvocation<C> for anyhow::Result<()> {
    fn into_invocation(self) -> Result<Invocation<C>, PluginError> {
        self.map(|()| Invocation::Done).map_err(PluginError::from)
    }
}

impl<C> IntoInvocation<C> for Invocation<C> {
    fn into_invocation(self) -> Result<Invocation<C>, PluginError> {
        Ok(self)
    }
}

impl<C> IntoInvocation<C> for Result<Invocation<C>, PluginError> {
    fn into_invocation(self) -> Result<Invocation<C>, PluginError> {
        self
    }
}

impl<C, F, R> Plugin<C> for F
where
    F: Fn(&mut Scope<'_, C>) -> R,
    R: IntoInvocation<C>,
{
    fn invoke(&self, scope: &mut Scope<'_, C>) -> Result<Invocation<C>, PluginError> {
        self(scope).into_invocation()
    }
}

/// A shared, clonable handle to a plugin.
///
/// Equality and hashing use **reference identity**: two handles are the same
/// plugin iff they point to the same allocation. The pipeline relies on this
/// to deduplicate `require` calls, so a plugin that should be required from
/// several places must be shared through clones of one handle (or through
/// the resolver, which hands out clones of the registered handle).
pub struct PluginRef<C>(Rc<dyn Plugin<C>>);

impl<C> PluginRef<C> {
    /// Wraps a plugin value into a new shared handle.
    ///
    /// Each call creates a distinct identity, even for identical values.
    pub fn new(plugin: impl Plugin<C> + 'static) -> Self {
        PluginRef(Rc::new(plugin))
    }

    /// Wraps an already-shared plugin, preserving its identity.
    pub fn from_rc(plugin: Rc<dyn Plugin<C>>) -> Self {
        PluginRef(plugin)
    }

    pub(crate) fn get(&self) -> &dyn Plugin<C> {
        &*self.0
    }

    fn addr(&self) -> *const () {
        // Cast away the vtable half of the fat pointer: only the data
        // address is a stable identity.
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl<C> Clone for PluginRef<C> {
    fn clone(&self) -> Self {
        PluginRef(Rc::clone(&self.0))
    }
}

impl<C> PartialEq for PluginRef<C> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.addr(), other.addr())
    }
}

impl<C> Eq for PluginRef<C> {}

impl<C> Hash for PluginRef<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<C> fmt::Debug for PluginRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PluginRef({:p})", self.addr())
    }
}

/// A reference to a plugin: either the plugin value itself, or a dotted name
/// to be resolved through the pipeline's [`Resolver`](resolve::Resolver).
///
/// Named specs are subject to the pipeline's whitelist, inline specs never
/// are.
pub enum PluginSpec<C> {
    /// An inline plugin handle.
    Inline(PluginRef<C>),
    /// A symbolic reference of the form `module.path.symbol`.
    Named(String),
}

impl<C> PluginSpec<C> {
    /// Wraps a plugin value as an inline spec.
    pub fn inline(plugin: impl Plugin<C> + 'static) -> Self {
        PluginSpec::Inline(PluginRef::new(plugin))
    }

    /// Wraps a closure or function as an inline spec.
    pub fn from_fn<F, R>(plugin: F) -> Self
    where
        C: 'static,
        F: Fn(&mut Scope<'_, C>) -> R + 'static,
        R: IntoInvocation<C>,
    {
        PluginSpec::Inline(PluginRef::new(plugin))
    }

    /// A symbolic reference to be resolved when the plugin is required.
    pub fn named(name: impl Into<String>) -> Self {
        PluginSpec::Named(name.into())
    }

    pub(crate) fn label(&self) -> &str {
        match self {
            PluginSpec::Inline(_) => "<inline>",
            PluginSpec::Named(name) => name,
        }
    }

    pub(crate) fn into_name(self) -> Option<String> {
        match self {
            PluginSpec::Inline(_) => None,
            PluginSpec::Named(name) => Some(name),
        }
    }
}

impl<C> Clone for PluginSpec<C> {
    fn clone(&self) -> Self {
        match self {
            PluginSpec::Inline(plugin) => PluginSpec::Inline(plugin.clone()),
            PluginSpec::Named(name) => PluginSpec::Named(name.clone()),
        }
    }
}

impl<C> fmt::Debug for PluginSpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginSpec::Inline(plugin) => f.debug_tuple("Inline").field(plugin).finish(),
            PluginSpec::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

impl<C> From<PluginRef<C>> for PluginSpec<C> {
    fn from(plugin: PluginRef<C>) -> Self {
        PluginSpec::Inline(plugin)
    }
}

impl<C> From<&str> for PluginSpec<C> {
    fn from(name: &str) -> Self {
        PluginSpec::Named(name.to_owned())
    }
}

impl<C> From<String> for PluginSpec<C> {
    fn from(name: String) -> Self {
        PluginSpec::Named(name)
    }
}
