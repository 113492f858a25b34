//! Agent configuration: schema, layered loading and validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{ApiConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, VaneConfig};
pub use validation::validate_config;
