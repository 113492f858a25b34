//! Layered configuration loading with figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic overrides ([`ConfigLoader::merge`])
//! 3. Profile-specific config file (`vane.{profile}.toml`)
//! 4. Main config file (`vane.toml`)
//! 5. Environment variables (`VANE_*`)
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `VANE_` prefix with `__` as the nesting
//! separator:
//!
//! - `VANE_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `VANE_API__LISTEN=0.0.0.0:9000` → `api.listen = "0.0.0.0:9000"`
//! - `VANE_AGENT__INTERVAL=30s` → `agent.interval = "30s"`
//!
//! # Example
//!
//! ```rust,ignore
//! use vane_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("/etc/vane/vane.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Serialized};
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::VaneConfig;
use super::validation::validate_config;

/// Base name of the configuration file.
const CONFIG_STEM: &str = "vane";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `prod` and `dev` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `VANE_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("VANE_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to search for `vane.toml`.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges programmatic settings above the defaults and below every file.
    pub fn merge(mut self, config: VaneConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, extracts and validates the configuration.
    pub fn load(self) -> ConfigResult<VaneConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: VaneConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            plugins = config.plugins.len(),
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(VaneConfig::default()));
        figment = figment.merge(std::mem::take(&mut self.figment));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with VANE_ prefix");
            figment = figment.merge(Env::prefixed("VANE_").split("__"));
        }

        Ok(figment)
    }

    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(CONFIG_STEM));
        }
        paths
    }

    /// Merges `vane.{profile}.toml` then `vane.toml` from the first search
    /// path holding the base file.
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        #[cfg(feature = "toml-config")]
        for dir in self.resolve_search_paths() {
            let profile_path = dir.join(format!("{CONFIG_STEM}.{}.toml", self.profile));
            let base_path = dir.join(format!("{CONFIG_STEM}.toml"));

            if profile_path.exists() {
                debug!(path = %profile_path.display(), "Loading profile-specific config");
                figment = figment.merge(Toml::file(&profile_path));
            }
            if base_path.exists() {
                info!(path = %base_path.display(), "Loading configuration file");
                return figment.merge(Toml::file(&base_path));
            }
        }

        warn!("No configuration file found, using defaults");
        figment
    }
}

/// Loads configuration from the default search paths.
pub fn load_config() -> ConfigResult<VaneConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from one file plus environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<VaneConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use super::*;
    use crate::config::schema::LogLevel;

    #[test]
    fn test_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::new()
            .search_path(dir.path())
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level.as_str(), "info");
        assert!(config.api.enabled);
        assert_eq!(config.agent.interval, Duration::from_secs(10));
        assert!(config.plugins.is_empty());
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_file_with_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vane.toml");
        fs::write(
            &path,
            r#"
[agent]
interval = "30s"
omit_hostname = true

[global_tags]
dc = "eu"

[api]
listen = "0.0.0.0:9000"
strict = true

[logging]
level = "debug"

[[plugins]]
Name = "inputs.cpu"
Config = { percpu = true, interval = "5s" }

[[plugins]]
name = "outputs.file"
config = { files = ["stdout"] }
"#,
        )
        .unwrap();

        let config = ConfigLoader::new().file(&path).without_env().load().unwrap();
        assert_eq!(config.agent.interval, Duration::from_secs(30));
        assert_eq!(config.agent.flush_interval, Duration::from_secs(10));
        assert_eq!(config.global_tags["dc"], "eu");
        assert_eq!(config.api.listen, "0.0.0.0:9000");
        assert!(config.api.strict);
        assert_eq!(config.logging.level, LogLevel::Debug);

        assert_eq!(config.plugins.len(), 2);
        assert_eq!(config.plugins[0].name, "inputs.cpu");
        assert_eq!(config.plugins[0].config["percpu"], serde_json::json!(true));
        assert_eq!(config.plugins[1].name, "outputs.file");
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_file_is_overridden_by_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("vane.production.toml"),
            "[api]\nlisten = \"10.0.0.1:80\"\nenabled = false\n",
        )
        .unwrap();
        fs::write(dir.path().join("vane.toml"), "[api]\nlisten = \"10.0.0.2:80\"\n").unwrap();

        let config = ConfigLoader::new()
            .profile("prod")
            .search_path(dir.path())
            .without_env()
            .load()
            .unwrap();
        assert_eq!(config.api.listen, "10.0.0.2:80");
        assert!(!config.api.enabled);
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .file("/nonexistent/vane.toml")
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vane.ini");
        fs::write(&path, "").unwrap();
        let err = ConfigLoader::new().file(&path).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut overrides = VaneConfig::default();
        overrides.agent.metric_batch_size = 0;
        let err = ConfigLoader::new()
            .search_path(dir.path())
            .merge(overrides)
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_profile_names() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }
}
