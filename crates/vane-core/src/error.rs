//! Error types for configuration coercion and plugin execution.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while assigning an untyped configuration map onto a typed
/// destination.
///
/// Field-level failures are wrapped in [`CoerceError::Field`] carrying the
/// dotted path of the offending key, e.g. `clean[0].field`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    /// A nested failure, annotated with the key path that caused it.
    #[error("could not set field `{path}`: {source}")]
    Field {
        /// Dotted key path, innermost last.
        path: String,
        /// The underlying failure.
        #[source]
        source: Box<CoerceError>,
    },

    /// A string could not be parsed as a duration.
    #[error("couldn't parse duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: String },

    /// A string could not be parsed as a byte size.
    #[error("couldn't parse size {input:?}: {reason}")]
    InvalidSize { input: String, reason: String },

    /// The source value has no conversion into the destination kind.
    #[error("cannot coerce {found} into {expected}")]
    Mismatch {
        /// Destination kind.
        expected: &'static str,
        /// Source value kind.
        found: &'static str,
    },

    /// Strict mode: keys that matched no field of any target.
    #[error("unknown configuration keys: {}", .0.join(", "))]
    UnknownKeys(Vec<String>),
}

impl CoerceError {
    /// Creates a mismatch error for a value that cannot be stored as `expected`.
    pub fn mismatch(expected: &'static str, found: &Value) -> Self {
        Self::Mismatch {
            expected,
            found: value_kind(found),
        }
    }

    /// Prefixes this error with `key`.
    ///
    /// Nested field errors are merged so the message names the full path once.
    pub fn at(self, key: &str) -> Self {
        match self {
            Self::Field { path, source } => {
                let path = if path.starts_with('[') {
                    format!("{key}{path}")
                } else {
                    format!("{key}.{path}")
                };
                Self::Field { path, source }
            }
            other => Self::Field {
                path: key.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the key path for field errors.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Field { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Short name of a JSON value's kind, used in error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Result type for coercion operations.
pub type CoerceResult<T> = Result<T, CoerceError>;

/// Errors returned by plugin hooks (`init`, `gather`, `write`, ...).
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin rejected its configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O failure inside the plugin.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other plugin-specific failure.
    #[error("{0}")]
    Custom(String),
}

impl PluginError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a custom error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Result type for plugin hooks.
pub type PluginResult<T> = Result<T, PluginError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_path_is_merged() {
        let err = CoerceError::mismatch("string", &json!(1))
            .at("field")
            .at("[0]")
            .at("clean");
        assert_eq!(err.path(), Some("clean[0].field"));
        assert_eq!(
            err.to_string(),
            "could not set field `clean[0].field`: cannot coerce integer into string"
        );
    }

    #[test]
    fn test_value_kind_distinguishes_numbers() {
        assert_eq!(value_kind(&json!(1)), "integer");
        assert_eq!(value_kind(&json!(-1)), "integer");
        assert_eq!(value_kind(&json!(1.5)), "float");
    }
}
