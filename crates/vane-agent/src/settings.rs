//! Agent-wide defaults consumed by the scheduler.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Defaults applied to plugins whose wrapper leaves a setting at zero.
///
/// Loaded from the `[agent]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Default gather interval for inputs.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Default flush interval for outputs and period for aggregators.
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Default upper bound of the random delay before each gather.
    #[serde(with = "humantime_serde")]
    pub collection_jitter: Duration,

    /// Maximum metrics per output write.
    pub metric_batch_size: usize,

    /// Maximum metrics buffered per output; the oldest are dropped first.
    pub metric_buffer_limit: usize,

    /// Value of the `host` tag. Empty means the machine hostname.
    pub hostname: String,

    /// Do not add a `host` tag.
    pub omit_hostname: bool,

    /// Tags added to every gathered metric unless already present.
    pub global_tags: HashMap<String, String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            flush_interval: Duration::from_secs(10),
            collection_jitter: Duration::ZERO,
            metric_batch_size: 1000,
            metric_buffer_limit: 10_000,
            hostname: String::new(),
            omit_hostname: false,
            global_tags: HashMap::new(),
        }
    }
}

impl AgentSettings {
    /// Tags every input adds to its metrics: the global tags plus `host`.
    pub fn default_tags(&self) -> HashMap<String, String> {
        let mut tags = self.global_tags.clone();
        if !self.omit_hostname && !tags.contains_key("host") {
            let host = if self.hostname.is_empty() {
                gethostname::gethostname().to_string_lossy().into_owned()
            } else {
                self.hostname.clone()
            };
            tags.insert("host".to_string(), host);
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tags_include_host() {
        let settings = AgentSettings {
            hostname: "edge-1".into(),
            global_tags: HashMap::from([("dc".into(), "eu".into())]),
            ..Default::default()
        };
        let tags = settings.default_tags();
        assert_eq!(tags["host"], "edge-1");
        assert_eq!(tags["dc"], "eu");
    }

    #[test]
    fn test_omit_hostname() {
        let settings = AgentSettings {
            omit_hostname: true,
            ..Default::default()
        };
        assert!(settings.default_tags().is_empty());
    }

    #[test]
    fn test_deserialize_humantime() {
        let settings: AgentSettings =
            serde_json::from_value(serde_json::json!({"interval": "1m", "flush_interval": "5s"}))
                .unwrap();
        assert_eq!(settings.interval, Duration::from_secs(60));
        assert_eq!(settings.flush_interval, Duration::from_secs(5));
        assert_eq!(settings.metric_batch_size, 1000);
    }
}
