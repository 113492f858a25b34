//! Agent error types.

use std::time::Duration;

use thiserror::Error;
use vane_core::PluginError;

/// Errors raised by the agent while registering or stopping plugins.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent is shutting down and accepts no new plugins.
    #[error("agent is shutting down")]
    ShuttingDown,

    /// The handle was already registered with the agent.
    #[error("plugin {name} was already started as {id:016x}")]
    AlreadyStarted { name: String, id: u64 },

    /// A plugin hook failed.
    #[error("plugin {name}: {source}")]
    Plugin {
        name: String,
        #[source]
        source: PluginError,
    },

    /// A stopping plugin did not reach `dead` in time.
    #[error("plugin {id:016x} did not stop within {timeout:?}")]
    StopTimeout { id: u64, timeout: Duration },
}

impl AgentError {
    pub fn plugin(name: impl Into<String>, source: PluginError) -> Self {
        Self::Plugin {
            name: name.into(),
            source,
        }
    }
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;
