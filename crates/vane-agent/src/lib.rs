//! # Vane Agent
//!
//! The scheduler behind the Vane control API.
//!
//! - **Handles**: [`RunningInput`], [`RunningProcessor`] and [`RunningOutput`]
//!   pair a plugin instance with its wrapper config ([`InputConfig`],
//!   [`ProcessorConfig`], [`OutputConfig`]).
//! - **Agent**: [`Agent`] assigns IDs, keeps the running-sets, spawns one
//!   task per plugin and routes metrics from inputs through processors to
//!   outputs.
//! - **Lifecycle**: statuses are [`PluginStatus`] values owned by the agent;
//!   `stop_*` returns a [`StopHandle`] that resolves once the plugin is dead.

pub mod agent;
pub mod error;
pub mod filter;
pub mod models;
pub mod running;
pub mod settings;
pub mod status;

pub use agent::{Agent, StopHandle};
pub use error::{AgentError, AgentResult};
pub use filter::{Filter, TagFilter};
pub use models::{InputConfig, OutputConfig, ProcessorConfig};
pub use running::{ProcessorPlugin, RunningInput, RunningOutput, RunningPlugin, RunningProcessor};
pub use settings::AgentSettings;
pub use status::{PluginId, PluginStatus};
