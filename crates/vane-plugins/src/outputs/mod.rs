//! Metric sinks.

pub mod file;
