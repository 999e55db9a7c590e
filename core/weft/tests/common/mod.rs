//! Marker-recording plugins shared by the integration tests.
//!
//! The context is an ordered list of strings; every plugin appends markers
//! so that the tests can assert the exact interleaving.

#![allow(dead_code)]

use weft::pipeline::task;
use weft::{Invocation, PluginError, PluginSpec, Scope, Step, Task};

pub type Ctx = Vec<String>;

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Plugin that appends `label` and completes without suspending.
pub fn mark(label: &'static str) -> PluginSpec<Ctx> {
    PluginSpec::<Ctx>::from_fn(move |scope| scope.ctx().push(label.to_owned()))
}

/// Suspendable plugin that appends one label per resume, yielding between
/// them and completing after the last one.
pub fn marks(labels: &'static [&'static str]) -> PluginSpec<Ctx> {
    PluginSpec::<Ctx>::from_fn(move |_scope| {
        let mut next = 0;
        Invocation::suspend(task::from_fn::<Ctx, _>(move |scope| {
            scope.ctx().push(labels[next].to_owned());
            next += 1;
            Ok(if next == labels.len() { Step::Done } else { Step::Yield })
        }))
    })
}

/// Plugin that fails on start.
pub fn fail(message: &'static str) -> PluginSpec<Ctx> {
    PluginSpec::<Ctx>::from_fn(move |_scope| -> Result<(), PluginError> {
        Err(anyhow::anyhow!(message).into())
    })
}

struct Cleanup {
    entry: &'static str,
    cleanup: &'static str,
    yielded: bool,
}

impl Task<Ctx> for Cleanup {
    fn resume(&mut self, scope: &mut Scope<'_, Ctx>) -> Result<Step, PluginError> {
        if self.yielded {
            scope.ctx().push(self.cleanup.to_owned());
            Ok(Step::Done)
        } else {
            self.yielded = true;
            scope.ctx().push(self.entry.to_owned());
            Ok(Step::Yield)
        }
    }

    fn throw(&mut self, scope: &mut Scope<'_, Ctx>, error: PluginError) -> Result<Step, PluginError> {
        scope.ctx().push(self.cleanup.to_owned());
        Err(error)
    }

    fn close(&mut self, scope: &mut Scope<'_, Ctx>) -> Result<(), PluginError> {
        scope.ctx().push(self.cleanup.to_owned());
        Ok(())
    }
}

/// Suspendable plugin that appends `entry`, suspends once, and appends
/// `cleanup` however it terminates: resume, error injection or close.
pub fn mark_with_cleanup(entry: &'static str, cleanup: &'static str) -> PluginSpec<Ctx> {
    PluginSpec::<Ctx>::from_fn(move |_scope| {
        Invocation::suspend(Cleanup {
            entry,
            cleanup,
            yielded: false,
        })
    })
}

struct Supervisor {
    entry: &'static str,
    yielded: bool,
}

impl Task<Ctx> for Supervisor {
    fn resume(&mut self, scope: &mut Scope<'_, Ctx>) -> Result<Step, PluginError> {
        if self.yielded {
            Ok(Step::Done)
        } else {
            self.yielded = true;
            scope.ctx().push(self.entry.to_owned());
            Ok(Step::Yield)
        }
    }

    fn throw(&mut self, scope: &mut Scope<'_, Ctx>, error: PluginError) -> Result<Step, PluginError> {
        scope.ctx().push(error.cause().to_string());
        Ok(Step::Done)
    }
}

/// Suspendable plugin that appends `entry`, suspends once, and absorbs any
/// failure thrown into it by recording the failure's cause.
pub fn supervisor(entry: &'static str) -> PluginSpec<Ctx> {
    PluginSpec::<Ctx>::from_fn(move |_scope| {
        Invocation::suspend(Supervisor {
            entry,
            yielded: false,
        })
    })
}
