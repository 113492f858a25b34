//! `aggregators.minmax`: minimum and maximum of every numeric field, per
//! series, over each period.
//!
//! A series is a measurement name plus its full tag set. Field `usage` of
//! `cpu,host=a` is pushed as `usage_min` and `usage_max` on `cpu,host=a`.

use std::collections::BTreeMap;

use vane_core::prelude::*;
use vane_core::register_plugin;

register_plugin!(MINMAX: aggregator "minmax" => MinMax);

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: f64,
    max: f64,
}

impl Bounds {
    fn new(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    fn update(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

type SeriesKey = (String, BTreeMap<String, String>);

#[derive(Default, Configurable)]
pub struct MinMax {
    series: BTreeMap<SeriesKey, BTreeMap<String, Bounds>>,
}

impl Aggregator for MinMax {
    fn add(&mut self, metric: &Metric) {
        let key = (metric.name.clone(), metric.tags.clone());
        let fields = self.series.entry(key).or_default();
        for (name, value) in &metric.fields {
            let Some(value) = value.as_f64() else {
                continue;
            };
            fields
                .entry(name.clone())
                .and_modify(|b| b.update(value))
                .or_insert_with(|| Bounds::new(value));
        }
    }

    fn push(&mut self, acc: &mut Accumulator) {
        for ((name, tags), fields) in &self.series {
            let values = fields.iter().flat_map(|(field, b)| {
                [
                    (format!("{field}_min"), FieldValue::from(b.min)),
                    (format!("{field}_max"), FieldValue::from(b.max)),
                ]
            });
            acc.add_fields(name, values, tags.clone());
        }
    }

    fn reset(&mut self) {
        self.series.clear();
    }
}

#[cfg(test)]
mod tests {
    use vane_core::describe;

    use super::*;

    #[test]
    fn test_tracks_bounds_per_series() {
        let mut agg = MinMax::default();
        for (host, value) in [("a", 3.0), ("a", 1.0), ("a", 2.0), ("b", 10.0)] {
            agg.add(
                &Metric::new("cpu")
                    .with_tag("host", host)
                    .with_field("usage", value)
                    .with_field("label", "ignored"),
            );
        }

        let mut acc = Accumulator::new();
        agg.push(&mut acc);
        let metrics = acc.drain();
        assert_eq!(metrics.len(), 2);

        let a = &metrics[0];
        assert_eq!(a.tags["host"], "a");
        assert_eq!(a.fields["usage_min"], FieldValue::from(1.0));
        assert_eq!(a.fields["usage_max"], FieldValue::from(3.0));
        assert!(!a.fields.contains_key("label_min"));
    }

    #[test]
    fn test_reset_clears_window() {
        let mut agg = MinMax::default();
        agg.add(&Metric::new("mem").with_field("used", 5i64));
        agg.reset();

        let mut acc = Accumulator::new();
        agg.push(&mut acc);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_has_no_options() {
        assert!(describe(&MinMax::default()).is_empty());
    }
}
