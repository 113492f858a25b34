//! Metric text encodings used by outputs.

use std::fmt::Write as _;
use std::str::FromStr;

use serde_json::{Map, Value, json};
use vane_core::{FieldValue, Metric, PluginError};

/// Encoding selected by an output's `data_format` key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataFormat {
    /// InfluxDB line protocol.
    #[default]
    Influx,
    /// One JSON object per line.
    Json,
}

impl FromStr for DataFormat {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "influx" => Ok(Self::Influx),
            "json" => Ok(Self::Json),
            other => Err(PluginError::config(format!("unsupported data_format {other:?}"))),
        }
    }
}

impl DataFormat {
    /// Encodes one metric as a single line, newline included.
    pub fn serialize(&self, metric: &Metric) -> String {
        match self {
            Self::Influx => line_protocol(metric),
            Self::Json => json_line(metric),
        }
    }
}

fn escape(out: &mut String, raw: &str, specials: &[char]) {
    for c in raw.chars() {
        if specials.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn line_protocol(metric: &Metric) -> String {
    let mut line = String::new();
    escape(&mut line, &metric.name, &[',', ' ']);
    for (key, value) in &metric.tags {
        line.push(',');
        escape(&mut line, key, &[',', '=', ' ']);
        line.push('=');
        escape(&mut line, value, &[',', '=', ' ']);
    }

    let mut first = true;
    for (key, value) in &metric.fields {
        line.push(if first { ' ' } else { ',' });
        first = false;
        escape(&mut line, key, &[',', '=', ' ']);
        line.push('=');
        match value {
            FieldValue::Float(v) => {
                let _ = write!(line, "{v}");
            }
            FieldValue::Integer(v) => {
                let _ = write!(line, "{v}i");
            }
            FieldValue::Unsigned(v) => {
                let _ = write!(line, "{v}u");
            }
            FieldValue::Bool(v) => {
                let _ = write!(line, "{v}");
            }
            FieldValue::String(v) => {
                line.push('"');
                escape(&mut line, v, &['"', '\\']);
                line.push('"');
            }
        }
    }

    if let Some(nanos) = metric.time.timestamp_nanos_opt() {
        let _ = write!(line, " {nanos}");
    }
    line.push('\n');
    line
}

fn json_line(metric: &Metric) -> String {
    let fields: Map<String, Value> = metric
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect();
    let value = json!({
        "name": metric.name,
        "tags": metric.tags,
        "fields": fields,
        "timestamp": metric.time.timestamp(),
    });
    format!("{value}\n")
}
