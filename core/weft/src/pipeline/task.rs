//! Suspended plugin activities.
//!
//! A [`Task`] is the started form of a suspendable plugin: an explicit state
//! machine whose [`resume`](Task::resume) runs the code between two
//! suspension points. The pipeline drives tasks through three operations:
//! resuming, throwing a failure into the current suspension point, and
//! closing without resuming.

use crate::pipeline::Scope;
use crate::pipeline::error::PluginError;

/// Outcome of advancing a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The task reached a suspension point and expects to be resumed again.
    Yield,
    /// The task ran to completion.
    Done,
}

/// A started plugin that can suspend itself.
pub trait Task<C> {
    /// Advances the task to its next suspension point, or to completion.
    ///
    /// The pipeline never resumes a task that has reported [`Step::Done`];
    /// an implementation that is resumed anyway should report a
    /// [`PluginError::Protocol`] failure rather than misbehave silently.
    fn resume(&mut self, scope: &mut Scope<'_, C>) -> Result<Step, PluginError>;

    /// Injects `error` at the current suspension point.
    ///
    /// Returning `Ok` absorbs the error: the pipeline stops propagating it,
    /// and the task either completes ([`Step::Done`]) or stays suspended
    /// ([`Step::Yield`]). Returning `Err` hands an error (the same one, or a
    /// replacement) to the next suspended task below.
    ///
    /// The default re-raises the error unchanged.
    fn throw(&mut self, _scope: &mut Scope<'_, C>, error: PluginError) -> Result<Step, PluginError> {
        Err(error)
    }

    /// Unwinds the task without resuming it, running any pending cleanup.
    ///
    /// A closed task must not suspend again. The default does nothing.
    fn close(&mut self, _scope: &mut Scope<'_, C>) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Builds a task from a closure called on every resume.
///
/// The closure returns [`Step::Yield`] to suspend and [`Step::Done`] to
/// finish. Error injection and closing keep the default behavior: implement
/// [`Task`] directly when cleanup or supervision is needed.
///
/// # Example
/// ```
/// use weft::pipeline::task;
/// use weft::{Invocation, Pipeline, PluginSpec, Scope, Step};
///
/// type Log = Vec<&'static str>;
///
/// fn chatty(_scope: &mut Scope<'_, Log>) -> Invocation<Log> {
///     let mut resumed = false;
///     Invocation::suspend(task::from_fn::<Log, _>(move |scope| {
///         if resumed {
///             scope.ctx().push("second");
///             Ok(Step::Done)
///         } else {
///             resumed = true;
///             scope.ctx().push("first");
///             Ok(Step::Yield)
///         }
///     }))
/// }
///
/// fn quiet(scope: &mut Scope<'_, Log>) {
///     scope.ctx().push("quiet");
/// }
///
/// let mut pipeline = Pipeline::new(Log::new());
/// pipeline.run(vec![PluginSpec::from_fn(chatty), PluginSpec::from_fn(quiet)])?;
/// assert_eq!(*pipeline.ctx(), ["first", "quiet", "second"]);
/// # Ok::<(), weft::PluginError>(())
/// ```
pub fn from_fn<C, F>(advance: F) -> FromFn<F>
where
    F: FnMut(&mut Scope<'_, C>) -> Result<Step, PluginError>,
{
    FromFn {
        advance,
        done: false,
    }
}

/// Task returned by [`from_fn`].
pub struct FromFn<F> {
    advance: F,
    done: bool,
}

impl<C, F> Task<C> for FromFn<F>
where
    F: FnMut(&mut Scope<'_, C>) -> Result<Step, PluginError>,
{
    fn resume(&mut self, scope: &mut Scope<'_, C>) -> Result<Step, PluginError> {
        if self.done {
            return Err(PluginError::protocol("task resumed after completion"));
        }
        let step = (self.advance)(scope);
        if !matches!(step, Ok(Step::Yield)) {
            self.done = true;
        }
        step
    }
}
