//! Control API error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use vane_agent::{AgentError, PluginId};
use vane_core::{CoerceError, PluginError};

/// Errors returned by [`PluginController`](crate::PluginController) and the
/// HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The qualified name matches no registered plugin type.
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// The configuration map could not be applied.
    #[error("invalid configuration for {name}: {source}")]
    Config {
        name: String,
        #[source]
        source: CoerceError,
    },

    /// The plugin's `init` hook failed; nothing was registered.
    #[error("could not initialize {name}: {source}")]
    Init {
        name: String,
        #[source]
        source: PluginError,
    },

    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Strict mode: no running plugin has this ID.
    #[error("no running plugin with id {0}")]
    UnknownPlugin(PluginId),

    /// The request body is not a valid plugin spec.
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl ApiError {
    pub fn config(name: impl Into<String>, source: CoerceError) -> Self {
        Self::Config {
            name: name.into(),
            source,
        }
    }

    pub fn init(name: impl Into<String>, source: PluginError) -> Self {
        Self::Init {
            name: name.into(),
            source,
        }
    }

    /// HTTP status the error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PluginNotFound(_)
            | Self::Config { .. }
            | Self::Init { .. }
            | Self::Agent(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnknownPlugin(_) => StatusCode::NOT_FOUND,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Result type for controller operations.
pub type ApiResult<T> = Result<T, ApiError>;
