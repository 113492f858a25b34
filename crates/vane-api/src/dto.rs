//! Request and response bodies of the control API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vane_agent::{PluginId, PluginStatus};
use vane_core::FieldMap;

/// A plugin to create: its qualified name and raw configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Qualified name, e.g. `inputs.cpu`.
    #[serde(rename = "Name", alias = "name")]
    pub name: String,

    /// Keys for both the plugin and its wrapper config.
    #[serde(rename = "Config", alias = "config", default)]
    pub config: Map<String, Value>,
}

impl PluginSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// One entry of `GET /plugins/running`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningPluginInfo {
    #[serde(rename = "ID")]
    pub id: PluginId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Config")]
    pub config: FieldMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedPlugin {
    pub id: PluginId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: PluginStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_accepts_both_casings() {
        let upper: PluginSpec =
            serde_json::from_value(json!({"Name": "inputs.cpu", "Config": {"percpu": true}}))
                .unwrap();
        let lower: PluginSpec =
            serde_json::from_value(json!({"name": "inputs.cpu", "config": {"percpu": true}}))
                .unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.config["percpu"], json!(true));
    }

    #[test]
    fn test_spec_config_defaults_to_empty() {
        let spec: PluginSpec = serde_json::from_value(json!({"Name": "inputs.mem"})).unwrap();
        assert!(spec.config.is_empty());
    }

    #[test]
    fn test_status_response_shape() {
        let body = StatusResponse {
            status: PluginStatus::Running,
        };
        assert_eq!(serde_json::to_value(body).unwrap(), json!({"status": "running"}));
    }
}
