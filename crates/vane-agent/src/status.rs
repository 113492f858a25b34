//! Plugin identifiers and lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a running plugin instance.
///
/// ```text
/// start_*() ──► Created ──► Running ──► Stopping ──► Dead
///                  └──────── stop before run ────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    #[default]
    Unknown,
    Created,
    Running,
    Stopping,
    Dead,
}

impl PluginStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External handle for a running plugin: the agent-assigned numeric ID
/// rendered as 16 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric ID, or `None` if the handle is not valid hex.
    pub fn as_u64(&self) -> Option<u64> {
        u64::from_str_radix(&self.0, 16).ok()
    }

    /// Wraps an externally supplied string without validating it.
    pub fn parse(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl From<u64> for PluginId {
    fn from(id: u64) -> Self {
        Self(format!("{id:016x}"))
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
