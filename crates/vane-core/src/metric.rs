//! Metric model passed between inputs, processors and outputs.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Unsigned(u64),
    Bool(bool),
    String(String),
}

impl FieldValue {
    /// Numeric view of this value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            Self::Unsigned(v) => Some(*v as f64),
            Self::Bool(_) | Self::String(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

macro_rules! impl_from_field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_field_value!(
    f64 => Float,
    f32 => Float,
    i64 => Integer,
    i32 => Integer,
    u64 => Unsigned,
    u32 => Unsigned,
    bool => Bool,
    String => String,
    &str => String,
);

/// A named set of fields and tags at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub time: DateTime<Utc>,
}

impl Metric {
    /// Creates an empty metric stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            time: Utc::now(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    /// Adds `key=value` unless the tag is already present.
    pub fn add_default_tag(&mut self, key: &str, value: &str) {
        if !self.tags.contains_key(key) {
            self.tags.insert(key.to_string(), value.to_string());
        }
    }
}

/// Collects metrics produced by one gather or flush call.
#[derive(Debug, Default)]
pub struct Accumulator {
    metrics: Vec<Metric>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a metric built from `name`, `fields` and `tags`.
    pub fn add_fields<F, T>(&mut self, name: &str, fields: F, tags: T)
    where
        F: IntoIterator<Item = (String, FieldValue)>,
        T: IntoIterator<Item = (String, String)>,
    {
        let mut metric = Metric::new(name);
        metric.fields.extend(fields);
        metric.tags.extend(tags);
        if !metric.fields.is_empty() {
            self.metrics.push(metric);
        }
    }

    pub fn push(&mut self, metric: Metric) {
        self.metrics.push(metric);
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Takes every collected metric, leaving the accumulator empty.
    pub fn drain(&mut self) -> Vec<Metric> {
        std::mem::take(&mut self.metrics)
    }
}
