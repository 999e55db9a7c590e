//! The pipeline scheduler.
//!
//! A run drains in two phases. **Phase A** pops the worklist front to back
//! and requires each spec: the plugin is resolved, deduplicated, started,
//! and pushed onto the suspension stack if it suspends. **Phase B** runs
//! only in the outermost `run` frame, once the worklist is empty: it pops
//! the top of the suspension stack and resumes it, re-pushing tasks that
//! yield again, until the stack is empty.
//!
//! This gives the nesting discipline: later-started work executes between
//! an earlier plugin's yields, and suspended plugins finalize in reverse
//! order of their first suspension.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::plugin::resolve::{NotWhitelisted, Registry, Resolver};
use crate::plugin::{Invocation, PluginRef, PluginSpec};
use error::{LoadError, PluginError};
use task::{Step, Task};

pub mod error;
pub mod task;

/// A cooperative plugin pipeline over a context value `C`.
///
/// The pipeline owns the context for its whole lifetime and never inspects
/// it; plugins reach it through [`Scope::ctx`]. A pipeline is created once,
/// used for any number of [`run`](Pipeline::run) calls, then discarded.
/// Plugins that were started by an earlier run are remembered and never
/// started again.
pub struct Pipeline<C> {
    ctx: C,
    state: State<C>,
}

/// The scheduler bookkeeping, split from the context so that both can be
/// borrowed independently while a plugin is active.
pub(crate) struct State<C> {
    resolver: Box<dyn Resolver<C>>,
    whitelist: Option<FxHashSet<String>>,
    /// Specs queued for Phase A of the current run, front to back.
    worklist: VecDeque<PluginSpec<C>>,
    /// Identity of every plugin that has been started, ever.
    enlisted: FxHashSet<PluginRef<C>>,
    /// Suspended tasks; the top of the stack is the most recent suspension.
    suspended: Vec<Suspended<C>>,
    /// Nesting depth of `run` calls. Phase B runs at depth 1 only.
    run_depth: usize,
}

struct Suspended<C> {
    name: Option<String>,
    task: Box<dyn Task<C>>,
}

impl<C> Suspended<C> {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<inline>")
    }
}

/// Scoped view over the pipeline, handed to the active plugin.
///
/// The scope bundles exclusive access to the context with the scheduling
/// operations a plugin may call while it runs: [`require`](Scope::require)
/// to enlist a dependency immediately, and a reentrant
/// [`run`](Scope::run).
pub struct Scope<'a, C> {
    pub(crate) ctx: &'a mut C,
    pub(crate) state: &'a mut State<C>,
}

impl<C> Scope<'_, C> {
    /// The shared context.
    pub fn ctx(&mut self) -> &mut C {
        self.ctx
    }

    /// Enlists a plugin into the current run.
    ///
    /// Control returns once the plugin has completed or reached its first
    /// suspension point; a plugin that is already enlisted (including the
    /// calling plugin itself) is skipped silently. If the plugin suspends,
    /// it finalizes before the caller in Phase B.
    pub fn require(&mut self, spec: impl Into<PluginSpec<C>>) -> Result<(), PluginError> {
        self.state.require(self.ctx, spec.into())
    }

    /// Runs the pipeline reentrantly.
    ///
    /// The specs are queued and started before this call returns, but the
    /// suspension drain is deferred to the outermost `run` frame.
    pub fn run<I>(&mut self, specs: I) -> Result<(), PluginError>
    where
        I: IntoIterator<Item = PluginSpec<C>>,
    {
        self.state.run(self.ctx, specs)
    }
}

impl<C> Pipeline<C> {
    /// Creates a pipeline over `ctx`, with an empty [`Registry`] as resolver
    /// and no whitelist.
    pub fn new(ctx: C) -> Self
    where
        C: 'static,
    {
        Pipeline {
            ctx,
            state: State::new(Box::new(Registry::new())),
        }
    }

    /// Replaces the resolver used for [`PluginSpec::Named`] specs.
    pub fn with_resolver(mut self, resolver: impl Resolver<C> + 'static) -> Self {
        self.state.resolver = Box::new(resolver);
        self
    }

    /// Restricts named specs to the given identifiers.
    ///
    /// Membership is tested against the full identifier string, before
    /// resolution. Inline plugins are never subject to the whitelist.
    pub fn with_whitelist<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.whitelist = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// The shared context.
    pub fn ctx(&self) -> &C {
        &self.ctx
    }

    /// The shared context, mutably.
    pub fn ctx_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    /// Consumes the pipeline and returns the context.
    pub fn into_ctx(self) -> C {
        self.ctx
    }

    /// Number of plugins started since the pipeline was created.
    pub fn enlisted_count(&self) -> usize {
        self.state.enlisted.len()
    }

    /// Number of currently suspended tasks.
    pub fn suspended_count(&self) -> usize {
        self.state.suspended.len()
    }

    /// Appends `specs` to the worklist and drains it.
    ///
    /// Plugins start in the order they are required, and may require more
    /// plugins while they run. Once the worklist is empty, the outermost
    /// `run` frame finalizes suspended tasks in reverse order of their
    /// first suspension.
    ///
    /// A failure that no suspended plugin absorbs escapes here with the
    /// worklist discarded; the set of enlisted plugins is retained either
    /// way.
    pub fn run<I>(&mut self, specs: I) -> Result<(), PluginError>
    where
        I: IntoIterator<Item = PluginSpec<C>>,
    {
        self.state.run(&mut self.ctx, specs)
    }

    /// Enlists a plugin immediately, outside of any run.
    ///
    /// Same semantics as [`Scope::require`]; a task suspended here is
    /// finalized by the next [`run`](Pipeline::run).
    pub fn require(&mut self, spec: impl Into<PluginSpec<C>>) -> Result<(), PluginError> {
        self.state.require(&mut self.ctx, spec.into())
    }

    /// Closes every suspended task without resuming it, most recent first.
    ///
    /// The default drain empties the suspension stack on its own; this is
    /// for hosts that abandon a pipeline midway and still want cleanup to
    /// run. The first close failure propagates; the failing task is
    /// dropped, the tasks below it stay suspended.
    pub fn close(&mut self) -> Result<(), PluginError> {
        self.state.close_all(&mut self.ctx)
    }
}

impl<C> State<C> {
    pub(crate) fn new(resolver: Box<dyn Resolver<C>>) -> Self {
        State {
            resolver,
            whitelist: None,
            worklist: VecDeque::new(),
            enlisted: FxHashSet::default(),
            suspended: Vec::new(),
            run_depth: 0,
        }
    }

    fn run<I>(&mut self, ctx: &mut C, specs: I) -> Result<(), PluginError>
    where
        I: IntoIterator<Item = PluginSpec<C>>,
    {
        self.worklist.extend(specs);
        self.run_depth += 1;
        let outcome = self.drain(ctx);
        self.run_depth -= 1;
        outcome
    }

    fn drain(&mut self, ctx: &mut C) -> Result<(), PluginError> {
        // Phase A: start everything in the worklist, front to back. Specs
        // queued by a nested `run` are drained by that frame before it
        // returns, so the loop below only ever sees its own additions.
        while let Some(spec) = self.worklist.pop_front() {
            if let Err(error) = self.require(ctx, spec) {
                self.unwind(ctx, error)?;
            }
        }

        // Phase B: finalize suspended tasks, outermost frame only.
        if self.run_depth == 1 {
            while let Some(mut entry) = self.suspended.pop() {
                let step = entry.task.resume(&mut Scope {
                    ctx: &mut *ctx,
                    state: &mut *self,
                });
                match step {
                    Ok(Step::Yield) => self.suspended.push(entry),
                    Ok(Step::Done) => log::debug!("plugin {} completed", entry.label()),
                    Err(error) => self.unwind(ctx, error)?,
                }
            }
        }
        Ok(())
    }

    /// Resolves `spec`, starts the plugin unless it is already enlisted.
    fn require(&mut self, ctx: &mut C, spec: PluginSpec<C>) -> Result<(), PluginError> {
        let plugin = self.resolve(&spec)?;
        if self.enlisted.contains(&plugin) {
            log::trace!("plugin {} is already enlisted, skipping", spec.label());
            return Ok(());
        }
        self.enlisted.insert(plugin.clone());
        self.start(ctx, spec.into_name(), plugin)
    }

    fn resolve(&self, spec: &PluginSpec<C>) -> Result<PluginRef<C>, PluginError> {
        match spec {
            PluginSpec::Inline(plugin) => Ok(plugin.clone()),
            PluginSpec::Named(name) => {
                if let Some(whitelist) = &self.whitelist {
                    if !whitelist.contains(name) {
                        log::debug!("plugin '{name}' rejected by the whitelist");
                        return Err(PluginError::Load(LoadError::new(
                            name.as_str(),
                            NotWhitelisted(name.clone()),
                        )));
                    }
                }
                log::trace!("resolving plugin reference '{name}'");
                self.resolver
                    .resolve(name)
                    .map_err(|cause| PluginError::Load(LoadError::new(name.as_str(), cause)))
            }
        }
    }

    /// Starts a plugin: plain plugins complete inside `invoke`, suspendable
    /// ones are advanced to their first suspension point. Tasks that
    /// complete without yielding never reach the suspension stack.
    fn start(&mut self, ctx: &mut C, name: Option<String>, plugin: PluginRef<C>) -> Result<(), PluginError> {
        let invocation = plugin.get().invoke(&mut Scope {
            ctx: &mut *ctx,
            state: &mut *self,
        })?;
        let mut task = match invocation {
            Invocation::Done => return Ok(()),
            Invocation::Suspend(task) => task,
        };
        let step = task.resume(&mut Scope {
            ctx: &mut *ctx,
            state: &mut *self,
        })?;
        if step == Step::Yield {
            log::debug!("plugin {} suspended", name.as_deref().unwrap_or("<inline>"));
            self.suspended.push(Suspended { name, task });
        }
        Ok(())
    }

    /// Propagates `error` through the suspension stack, top to bottom.
    ///
    /// Returns `Ok` when some task absorbed the error (draining resumes
    /// from that state), `Err` when the stack emptied without absorption;
    /// in that case the worklist is discarded and the error escapes.
    fn unwind(&mut self, ctx: &mut C, mut error: PluginError) -> Result<(), PluginError> {
        log::debug!(
            "propagating failure to {} suspended task(s): {error}",
            self.suspended.len()
        );
        while let Some(mut entry) = self.suspended.pop() {
            let outcome = entry.task.throw(
                &mut Scope {
                    ctx: &mut *ctx,
                    state: &mut *self,
                },
                error,
            );
            match outcome {
                Ok(Step::Yield) => {
                    // Absorbed; the task stays suspended.
                    self.suspended.push(entry);
                    return Ok(());
                }
                Ok(Step::Done) => return Ok(()),
                Err(reraised) => error = reraised,
            }
        }
        log::warn!("unhandled plugin failure: {error}");
        self.worklist.clear();
        Err(error)
    }

    fn close_all(&mut self, ctx: &mut C) -> Result<(), PluginError> {
        while let Some(mut entry) = self.suspended.pop() {
            entry.task.close(&mut Scope {
                ctx: &mut *ctx,
                state: &mut *self,
            })?;
        }
        Ok(())
    }
}
