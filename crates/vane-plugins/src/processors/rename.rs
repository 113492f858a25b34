//! `processors.rename`: renames measurements, tags and fields.
//!
//! ```toml
//! [[plugins]]
//! Name = "processors.rename"
//! Config = { replace = [{ tag = "host", dest = "hostname" }] }
//! ```

use vane_core::prelude::*;
use vane_core::register_plugin;

register_plugin!(RENAME: processor "rename" => Rename);

/// One rename rule. Exactly one of `measurement`, `tag` or `field` should be
/// set; the first non-empty one is used.
#[derive(Debug, Clone, Default, PartialEq, Configurable)]
pub struct Replacement {
    pub measurement: String,
    pub tag: String,
    pub field: String,
    #[config(required)]
    pub dest: String,
}

impl Replacement {
    fn apply(&self, metric: &mut Metric) {
        if !self.measurement.is_empty() {
            if metric.name == self.measurement {
                metric.name.clone_from(&self.dest);
            }
        } else if !self.tag.is_empty() {
            if let Some(value) = metric.tags.remove(&self.tag) {
                metric.tags.insert(self.dest.clone(), value);
            }
        } else if !self.field.is_empty() {
            if let Some(value) = metric.fields.remove(&self.field) {
                metric.fields.insert(self.dest.clone(), value);
            }
        }
    }
}

#[derive(Default, Configurable)]
pub struct Rename {
    pub replace: Vec<Replacement>,
}

impl Processor for Rename {
    fn init(&mut self) -> PluginResult<()> {
        if let Some(rule) = self.replace.iter().find(|r| r.dest.is_empty()) {
            return Err(PluginError::config(format!(
                "replacement {rule:?} has no dest"
            )));
        }
        Ok(())
    }

    fn apply(&mut self, mut metrics: Vec<Metric>) -> Vec<Metric> {
        for metric in &mut metrics {
            for rule in &self.replace {
                rule.apply(metric);
            }
        }
        metrics
    }
}
