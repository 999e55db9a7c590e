//! Failure kinds observable at the pipeline boundary.

use std::fmt;

/// Error raised when a symbolic plugin reference cannot be resolved.
///
/// The failing identifier is part of the message; the underlying failure
/// (unknown module, whitelist rejection, resolver error) stays reachable
/// through [`cause`](LoadError::cause).
#[derive(Debug)]
pub struct LoadError {
    name: String,
    cause: anyhow::Error,
}

impl LoadError {
    pub(crate) fn new(name: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        LoadError {
            name: name.into(),
            cause: cause.into(),
        }
    }

    /// The identifier that failed to resolve.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying resolution failure.
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load plugin '{}': {}", self.name, self.cause)
    }
}

/// Error escaping a pipeline run.
///
/// Whatever a plugin raises is wrapped exactly once, when it first crosses
/// into the scheduler; the original error stays reachable through
/// [`cause`](PluginError::cause) so that a supervising plugin can inspect it
/// when the failure is thrown into its suspension point.
#[derive(Debug)]
pub enum PluginError {
    /// A plugin failed on start, on resume, or while handling an injected
    /// error.
    Failed(anyhow::Error),
    /// A symbolic plugin reference could not be resolved.
    Load(LoadError),
    /// A suspended task broke the resume/throw/close protocol. Fatal to the
    /// current run.
    Protocol(anyhow::Error),
}

impl PluginError {
    /// Builds a protocol-violation error from a description of the broken
    /// rule.
    pub fn protocol(message: impl fmt::Display) -> Self {
        PluginError::Protocol(anyhow::Error::msg(message.to_string()))
    }

    /// The original failure, with the pipeline wrapping stripped.
    pub fn cause(&self) -> &anyhow::Error {
        match self {
            PluginError::Failed(cause) | PluginError::Protocol(cause) => cause,
            PluginError::Load(load) => load.cause(),
        }
    }

    /// True for resolution failures.
    pub fn is_load(&self) -> bool {
        matches!(self, PluginError::Load(_))
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::Failed(cause) => write!(f, "plugin failed: {cause}"),
            PluginError::Load(load) => fmt::Display::fmt(load, f),
            PluginError::Protocol(cause) => write!(f, "plugin broke the suspension protocol: {cause}"),
        }
    }
}

impl<T: Into<anyhow::Error>> From<T> for PluginError {
    fn from(value: T) -> Self {
        PluginError::Failed(value.into())
    }
}
