//! Weft: a cooperative plugin pipeline.
//!
//! A [`Pipeline`] executes an ordered collection of plugins against a single
//! shared context value:
//!
//! 1. Plugins start in the order they are required.
//! 2. A plugin may suspend itself; later plugins run between its suspension
//!    points, and suspended plugins are finalized in reverse order of their
//!    first suspension.
//! 3. A running plugin may require further plugins, which join the same run.
//!    A plugin is started at most once, no matter how often it is required.
//!
//! Failures travel the same way control does: they are thrown into the
//! suspended plugins from the most recent to the oldest, and any of them may
//! absorb the failure and keep the pipeline alive.
//!
//! The scheduler is single-threaded and cooperative. There is exactly one
//! active plugin at any time, and it has exclusive access to the context
//! through its [`Scope`].
//!
//! # Example
//! ```
//! use weft::{Pipeline, PluginSpec, Scope};
//!
//! fn hello(scope: &mut Scope<'_, Vec<String>>) {
//!     scope.ctx().push("hello".to_owned());
//! }
//!
//! let mut pipeline = Pipeline::new(Vec::<String>::new());
//! pipeline.run(vec![PluginSpec::from_fn(hello)])?;
//! assert_eq!(*pipeline.ctx(), ["hello"]);
//! # Ok::<(), weft::PluginError>(())
//! ```

pub mod pipeline;
pub mod plugin;

pub use pipeline::error::{LoadError, PluginError};
pub use pipeline::task::{Step, Task};
pub use pipeline::{Pipeline, Scope};
pub use plugin::{Invocation, Plugin, PluginRef, PluginSpec};
