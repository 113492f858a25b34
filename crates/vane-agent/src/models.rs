//! Wrapper configurations applied around every plugin instance.
//!
//! A wrapper receives the same raw configuration map as the plugin it wraps
//! and picks up the cross-cutting keys (`interval`, `tags`, `namepass`, ...).

use std::collections::HashMap;

use vane_core::{Configurable, Duration, Metric};

use crate::filter::Filter;

/// Cross-cutting settings for an input.
#[derive(Debug, Clone, Default, PartialEq, Configurable)]
pub struct InputConfig {
    /// Plugin name without its kind prefix.
    pub name: String,
    pub alias: String,
    /// Gather interval. Zero means the agent default.
    pub interval: Duration,
    /// Upper bound of the random delay added before each gather. Zero means
    /// the agent default.
    pub collection_jitter: Duration,
    /// Timestamps are truncated to this precision.
    pub precision: Duration,
    pub name_override: String,
    pub measurement_prefix: String,
    pub measurement_suffix: String,
    pub tags: HashMap<String, String>,
    #[config(flatten)]
    pub filter: Filter,
}

impl InputConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Applies renaming, tags and the filter to a freshly gathered metric.
    ///
    /// `default_tags` are added last and never override plugin or wrapper
    /// tags.
    pub fn make_metric(
        &self,
        mut metric: Metric,
        default_tags: &HashMap<String, String>,
    ) -> Option<Metric> {
        if !self.name_override.is_empty() {
            metric.name.clone_from(&self.name_override);
        }
        if !self.measurement_prefix.is_empty() {
            metric.name.insert_str(0, &self.measurement_prefix);
        }
        if !self.measurement_suffix.is_empty() {
            metric.name.push_str(&self.measurement_suffix);
        }
        for (key, value) in &self.tags {
            metric.tags.insert(key.clone(), value.clone());
        }
        for (key, value) in default_tags {
            metric.add_default_tag(key, value);
        }
        if !self.precision.as_std().is_zero() {
            metric.time = truncate(metric.time, self.precision.as_std());
        }
        self.filter.apply(metric)
    }
}

/// Cross-cutting settings for a processor or aggregator.
#[derive(Debug, Clone, Default, PartialEq, Configurable)]
pub struct ProcessorConfig {
    pub name: String,
    pub alias: String,
    /// Position in the processing chain, lowest first.
    pub order: i64,
    /// Aggregation window. Only used by aggregators; zero means the agent
    /// flush interval.
    pub period: Duration,
    /// Aggregators only: drop the metrics they consumed.
    pub drop_original: bool,
    #[config(flatten)]
    pub filter: Filter,
}

impl ProcessorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Cross-cutting settings for an output.
#[derive(Debug, Clone, Default, PartialEq, Configurable)]
pub struct OutputConfig {
    pub name: String,
    pub alias: String,
    /// Zero means the agent default.
    pub flush_interval: Duration,
    pub metric_buffer_limit: usize,
    pub metric_batch_size: usize,
    #[config(flatten)]
    pub filter: Filter,
}

impl OutputConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

fn truncate(
    time: chrono::DateTime<chrono::Utc>,
    precision: std::time::Duration,
) -> chrono::DateTime<chrono::Utc> {
    let step = precision.as_nanos() as i64;
    match time.timestamp_nanos_opt() {
        Some(nanos) if step > 0 => chrono::DateTime::from_timestamp_nanos(nanos - nanos % step),
        _ => time,
    }
}
