//! Runtime error types.

use std::io;

use thiserror::Error;
use vane_agent::AgentError;
use vane_api::ApiError;

use crate::config::ConfigError;

/// Errors that can occur while starting or stopping the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A plugin from the configuration could not be created.
    #[error("Failed to create plugin {name}: {source}")]
    Plugin {
        name: String,
        #[source]
        source: ApiError,
    },

    /// The control API could not bind its address.
    #[error("Failed to bind control API on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
