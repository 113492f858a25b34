//! # Vane Runtime
//!
//! Configuration loading, logging setup and process orchestration for the
//! Vane agent.
//!
//! ## Configuration
//!
//! Sources are merged in order, later sources winning:
//!
//! 1. built-in defaults
//! 2. `vane.{profile}.toml` then `vane.toml` in each search path
//! 3. an explicit file
//! 4. `VANE_*` environment variables (`VANE_AGENT__INTERVAL=30s`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use vane_runtime::VaneRuntime;
//!
//! #[tokio::main]
//! async fn main() -> vane_runtime::RuntimeResult<()> {
//!     VaneRuntime::builder().profile("production").build()?.run().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ApiConfig, ConfigError, ConfigLoader, ConfigResult, LogFormat, LogLevel, LogOutput,
    LogRotation, LoggingConfig, Profile, VaneConfig, load_config, load_config_from_file,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, init_from_config};
pub use runtime::{RuntimeBuilder, SHUTDOWN_TIMEOUT, VaneRuntime};

pub use tracing;
pub use tracing_subscriber;

/// Common imports for embedding the runtime.
pub mod prelude {
    pub use crate::config::{ConfigLoader, VaneConfig};
    pub use crate::error::{RuntimeError, RuntimeResult};
    pub use crate::runtime::{RuntimeBuilder, VaneRuntime};
    pub use tracing::{debug, error, info, trace, warn};
}
