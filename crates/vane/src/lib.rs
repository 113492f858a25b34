//! # Vane
//!
//! A telemetry agent whose plugins are created, inspected and stopped at
//! runtime over an HTTP control API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   JSON    ┌────────────┐  coerce   ┌──────────┐  spawn  ┌─────────┐
//! │ HTTP API │──────────▶│ Controller │──────────▶│ Registry │────────▶│  Agent  │
//! └──────────┘           └────────────┘           └──────────┘         └─────────┘
//!                                                                inputs ─▶ processors ─▶ outputs
//! ```
//!
//! - **Core**: plugin traits, typed config fields, schema describe and coercion
//! - **Agent**: running-sets, IDs, statuses and the metric pipeline
//! - **API**: the lifecycle controller and its axum router
//! - **Plugins**: built-in inputs, processors, aggregators and outputs
//! - **Runtime**: layered configuration, logging and process orchestration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vane::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     vane::plugins::link();
//!     VaneRuntime::builder().build()?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `system`: host inputs backed by sysinfo (default)
//! - `toml-config`: TOML configuration files (default)
//! - `json-log`: JSON log output

pub use vane_agent as agent;
pub use vane_api as api;
pub use vane_core as core;
pub use vane_plugins as plugins;
pub use vane_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use vane::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use vane_runtime::{RuntimeBuilder, VaneConfig, VaneRuntime};

    // Plugin authoring
    pub use vane_core::{
        Accumulator, Aggregator, Configurable, Duration, FieldValue, Input, Metric, Number,
        Output, PluginError, PluginResult, Processor, Size, register_plugin,
    };

    // Control surface
    pub use vane_agent::{PluginId, PluginStatus};
    pub use vane_api::{PluginController, PluginSpec};
}
