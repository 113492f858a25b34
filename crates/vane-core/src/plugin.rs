//! Plugin traits implemented by inputs, processors, aggregators and outputs.
//!
//! Every plugin is also [`Configurable`], so the same trait object can be
//! configured from an untyped map and described for the control API.

use std::fmt;
use std::str::FromStr;

use crate::configurable::Configurable;
use crate::error::PluginResult;
use crate::metric::{Accumulator, Metric};

/// The four plugin buckets, named by their qualified prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PluginKind {
    Input,
    Output,
    Processor,
    Aggregator,
}

impl PluginKind {
    /// Prefix used in qualified names, e.g. `inputs` in `inputs.cpu`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Input => "inputs",
            Self::Output => "outputs",
            Self::Processor => "processors",
            Self::Aggregator => "aggregators",
        }
    }

    /// Joins this kind with a plugin name.
    pub fn qualify(&self, name: &str) -> String {
        format!("{}.{name}", self.prefix())
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for PluginKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inputs" => Ok(Self::Input),
            "outputs" => Ok(Self::Output),
            "processors" => Ok(Self::Processor),
            "aggregators" => Ok(Self::Aggregator),
            _ => Err(()),
        }
    }
}

/// Splits `inputs.cpu` into its kind and plugin name at the first `.`.
pub fn split_qualified(name: &str) -> Option<(PluginKind, &str)> {
    let (kind, plugin) = name.split_once('.')?;
    let kind = kind.parse().ok()?;
    (!plugin.is_empty()).then_some((kind, plugin))
}

/// A metric source polled on an interval.
pub trait Input: Configurable + Send + Sync {
    /// Validates configuration and prepares state. Called once before start.
    fn init(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Collects one round of metrics into `acc`.
    fn gather(&mut self, acc: &mut Accumulator) -> PluginResult<()>;
}

/// A transformation applied to every metric in flight.
pub trait Processor: Configurable + Send + Sync {
    fn init(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Transforms a batch. Returning fewer metrics drops them.
    fn apply(&mut self, metrics: Vec<Metric>) -> Vec<Metric>;
}

/// A stateful reducer that emits summaries once per period.
pub trait Aggregator: Configurable + Send + Sync {
    fn init(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Folds one metric into the current window.
    fn add(&mut self, metric: &Metric);

    /// Emits the current window's aggregates.
    fn push(&mut self, acc: &mut Accumulator);

    /// Clears the window after a push.
    fn reset(&mut self);
}

/// A metric sink.
pub trait Output: Configurable + Send + Sync {
    fn init(&mut self) -> PluginResult<()> {
        Ok(())
    }

    fn connect(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Writes one batch.
    fn write(&mut self, metrics: &[Metric]) -> PluginResult<()>;

    fn close(&mut self) -> PluginResult<()> {
        Ok(())
    }
}
