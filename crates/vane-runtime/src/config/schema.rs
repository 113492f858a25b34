//! Configuration schema definitions.
//!
//! ```toml
//! [agent]
//! interval = "10s"
//! flush_interval = "10s"
//!
//! [global_tags]
//! dc = "eu-west"
//!
//! [api]
//! listen = "127.0.0.1:8080"
//!
//! [logging]
//! level = "debug"
//!
//! [[plugins]]
//! Name = "inputs.cpu"
//! Config = { percpu = true, interval = "5s" }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vane_agent::AgentSettings;
use vane_api::{ControllerOptions, PluginSpec};
use vane_core::Strictness;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaneConfig {
    /// Scheduler defaults.
    pub agent: AgentSettings,

    /// Tags added to every gathered metric.
    pub global_tags: HashMap<String, String>,

    pub api: ApiConfig,

    pub logging: LoggingConfig,

    /// Plugins created through the controller at startup.
    pub plugins: Vec<PluginSpec>,
}

impl VaneConfig {
    /// Agent settings with `[global_tags]` merged in.
    ///
    /// Tags from `[global_tags]` win over `agent.global_tags`.
    pub fn agent_settings(&self) -> AgentSettings {
        let mut settings = self.agent.clone();
        settings.global_tags.extend(
            self.global_tags
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        settings
    }
}

// =============================================================================
// Control API
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Serve the HTTP control API.
    pub enabled: bool,

    /// `host:port` to bind.
    pub listen: String,

    /// Reject unknown config keys and unknown plugin IDs on delete.
    pub strict: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: "127.0.0.1:8080".to_string(),
            strict: false,
        }
    }
}

impl ApiConfig {
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            strictness: if self.strict {
                Strictness::Strict
            } else {
                Strictness::Lenient
            },
        }
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// How often the log file is rolled over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,

    /// Log file for `output = "file"`.
    pub file_path: Option<PathBuf>,
    pub rotation: LogRotation,

    /// Per-module levels, e.g. `vane_agent = "debug"`.
    pub filters: HashMap<String, LogLevel>,

    pub thread_ids: bool,
    /// Include file and line of the log call.
    pub file_location: bool,
}
