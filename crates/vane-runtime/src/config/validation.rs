//! Configuration validation.

use std::collections::HashSet;

use vane_api::PluginSpec;
use vane_core::split_qualified;

use super::error::{ConfigError, ConfigResult};
use super::schema::{ApiConfig, LogOutput, LoggingConfig, VaneConfig};
use vane_agent::AgentSettings;

/// Validates the entire configuration.
pub fn validate_config(config: &VaneConfig) -> ConfigResult<()> {
    validate_agent(&config.agent)?;
    validate_api(&config.api)?;
    validate_logging(&config.logging)?;
    validate_plugins(&config.plugins)?;
    Ok(())
}

fn validate_agent(agent: &AgentSettings) -> ConfigResult<()> {
    if agent.interval.is_zero() {
        return Err(ConfigError::validation("agent.interval must be greater than 0"));
    }
    if agent.flush_interval.is_zero() {
        return Err(ConfigError::validation(
            "agent.flush_interval must be greater than 0",
        ));
    }
    if agent.metric_batch_size == 0 {
        return Err(ConfigError::validation(
            "agent.metric_batch_size must be greater than 0",
        ));
    }
    if agent.metric_buffer_limit < agent.metric_batch_size {
        return Err(ConfigError::validation(
            "agent.metric_buffer_limit must be at least agent.metric_batch_size",
        ));
    }
    Ok(())
}

fn validate_api(api: &ApiConfig) -> ConfigResult<()> {
    if !api.enabled {
        return Ok(());
    }
    validate_listen(&api.listen)
}

/// Accepts `host:port` and `[v6]:port` with a non-empty host.
fn validate_listen(listen: &str) -> ConfigResult<()> {
    let invalid = || ConfigError::validation(format!("api.listen {listen:?} is not host:port"));
    let (host, port) = listen.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(invalid());
    }
    if host.starts_with('[') != host.ends_with(']') {
        return Err(invalid());
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }
    Ok(())
}

/// Names must be qualified; configs are checked when the plugins are created.
fn validate_plugins(plugins: &[PluginSpec]) -> ConfigResult<()> {
    let mut unknown = HashSet::new();
    for spec in plugins {
        if split_qualified(&spec.name).is_none() {
            unknown.insert(spec.name.as_str());
        }
    }
    if !unknown.is_empty() {
        let mut names: Vec<&str> = unknown.into_iter().collect();
        names.sort_unstable();
        return Err(ConfigError::validation(format!(
            "plugin names must look like kind.name: {}",
            names.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&VaneConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_interval() {
        let mut config = VaneConfig::default();
        config.agent.interval = Duration::ZERO;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_listen_addresses() {
        for ok in ["127.0.0.1:8080", "localhost:0", "[::1]:9000"] {
            assert!(validate_listen(ok).is_ok(), "{ok}");
        }
        for bad in ["8080", ":8080", "localhost:http", "[::1:80", "host:70000"] {
            assert!(validate_listen(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_disabled_api_skips_listen_check() {
        let mut config = VaneConfig::default();
        config.api.enabled = false;
        config.api.listen = "nonsense".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = VaneConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
        config.logging.file_path = Some(PathBuf::from("vane.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_unqualified_plugin_names() {
        let mut config = VaneConfig::default();
        config.plugins = vec![PluginSpec::new("cpu"), PluginSpec::new("inputs.mem")];
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("cpu"));
    }
}
