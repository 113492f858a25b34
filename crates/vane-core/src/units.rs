//! Semantic wrapper types: durations, byte sizes and numbers.
//!
//! Each wrapper is a scalar in the schema (`duration`, `size`, `float`) and is
//! never descended into. Durations accept humantime strings (`"3s"`,
//! `"1h 30m"`) or integer nanoseconds; sizes accept strict byte strings
//! (`"8MiB"`, `"10KB"`) or integer bytes.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use byte_unit::Byte;
use serde_json::Value;

use crate::configurable::ConfigField;
use crate::error::{CoerceError, CoerceResult};
use crate::schema::FieldKind;

// =============================================================================
// Duration
// =============================================================================

/// A configurable span of time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(pub std::time::Duration);

impl Duration {
    pub const ZERO: Self = Self(std::time::Duration::ZERO);

    pub const fn from_secs(secs: u64) -> Self {
        Self(std::time::Duration::from_secs(secs))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(std::time::Duration::from_millis(millis))
    }

    pub const fn from_nanos(nanos: u64) -> Self {
        Self(std::time::Duration::from_nanos(nanos))
    }

    /// Returns the wrapped standard duration.
    pub const fn as_std(&self) -> std::time::Duration {
        self.0
    }

    /// Total nanoseconds, saturating at `u64::MAX`.
    pub fn as_nanos(&self) -> u64 {
        u64::try_from(self.0.as_nanos()).unwrap_or(u64::MAX)
    }
}

impl Deref for Duration {
    type Target = std::time::Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self(d)
    }
}

impl From<Duration> for std::time::Duration {
    fn from(d: Duration) -> Self {
        d.0
    }
}

impl FromStr for Duration {
    type Err = CoerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "0" {
            return Ok(Self::ZERO);
        }
        humantime::parse_duration(trimmed)
            .map(Self)
            .map_err(|e| CoerceError::InvalidDuration {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

impl ConfigField for Duration {
    fn field_kind() -> FieldKind {
        FieldKind::Duration
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    fn to_value(&self) -> Value {
        Value::from(self.as_nanos())
    }

    fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
        match value {
            Value::String(s) => *self = s.parse()?,
            Value::Number(n) => match n.as_u64() {
                Some(nanos) => *self = Self::from_nanos(nanos),
                None => return Err(CoerceError::mismatch("duration", value)),
            },
            other => return Err(CoerceError::mismatch("duration", other)),
        }
        Ok(())
    }
}

// =============================================================================
// Size
// =============================================================================

/// A configurable byte count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Size(pub u64);

impl Size {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl FromStr for Size {
    type Err = CoerceError;

    /// A bare integer or a byte unit (`B`, `KB`, `KiB`, `MiB`, ...). Bit units
    /// and lowercase `b` are rejected rather than converted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unit = trimmed.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.');
        let unit = unit.trim();
        if !unit.is_empty() && !unit.ends_with('B') {
            return Err(CoerceError::InvalidSize {
                input: s.to_string(),
                reason: format!("unit `{unit}` is not a byte unit"),
            });
        }
        Byte::parse_str(trimmed, false)
            .map(|b| Self(b.as_u64()))
            .map_err(|e| CoerceError::InvalidSize {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

impl ConfigField for Size {
    fn field_kind() -> FieldKind {
        FieldKind::Size
    }

    fn is_zero(&self) -> bool {
        self.0 == 0
    }

    fn to_value(&self) -> Value {
        Value::from(self.0)
    }

    fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
        match value {
            Value::String(s) => *self = s.parse()?,
            Value::Number(n) => match n.as_u64() {
                Some(bytes) => *self = Self(bytes),
                None => return Err(CoerceError::mismatch("size", value)),
            },
            other => return Err(CoerceError::mismatch("size", other)),
        }
        Ok(())
    }
}

// =============================================================================
// Number
// =============================================================================

/// A numeric value stored as `f64` regardless of the source's width.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Number(pub f64);

impl Number {
    pub const fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl ConfigField for Number {
    fn field_kind() -> FieldKind {
        FieldKind::Float
    }

    fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    fn to_value(&self) -> Value {
        Value::from(self.0)
    }

    fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
        match value.as_f64() {
            Some(v) => {
                self.0 = v;
                Ok(())
            }
            None => Err(CoerceError::mismatch("float", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duration_from_string() {
        let mut d = Duration::default();
        d.set_from(&json!("3s")).unwrap();
        assert_eq!(d.as_nanos(), 3_000_000_000);

        d.set_from(&json!("1ms")).unwrap();
        assert_eq!(d, Duration::from_millis(1));

        d.set_from(&json!("1h 30m")).unwrap();
        assert_eq!(d, Duration::from_secs(5400));
    }

    #[test]
    fn test_duration_from_integer_nanos() {
        let mut d = Duration::default();
        d.set_from(&json!(1_500)).unwrap();
        assert_eq!(d, Duration::from_nanos(1_500));
    }

    #[test]
    fn test_duration_rejects_garbage() {
        let mut d = Duration::from_secs(1);
        let err = d.set_from(&json!("soon")).unwrap_err();
        assert!(matches!(err, CoerceError::InvalidDuration { .. }));
        assert_eq!(d, Duration::from_secs(1));
    }

    #[test]
    fn test_duration_default_is_nanos() {
        let d = Duration::from_secs(10);
        assert_eq!(d.schema().default, Some(json!(10_000_000_000u64)));
        assert!(Duration::ZERO.schema().default.is_none());
    }

    #[test]
    fn test_size_from_string() {
        let mut s = Size::default();
        s.set_from(&json!("8MiB")).unwrap();
        assert_eq!(s.as_u64(), 8 * 1024 * 1024);

        s.set_from(&json!("10KB")).unwrap();
        assert_eq!(s.as_u64(), 10_000);
    }

    #[test]
    fn test_size_rejects_bit_units() {
        for input in ["8Mb", "8mib", "10mb", "1kb"] {
            let mut s = Size::default();
            let err = s.set_from(&json!(input)).unwrap_err();
            assert!(matches!(err, CoerceError::InvalidSize { .. }), "{input}: {err}");
            assert_eq!(s, Size::default());
        }
    }

    #[test]
    fn test_size_accepts_bare_integers() {
        let mut s = Size::default();
        s.set_from(&json!("4096")).unwrap();
        assert_eq!(s.as_u64(), 4096);
        s.set_from(&json!("512 B")).unwrap();
        assert_eq!(s.as_u64(), 512);
    }

    #[test]
    fn test_size_rejects_garbage() {
        let mut s = Size::default();
        let err = s.set_from(&json!("lots")).unwrap_err();
        assert!(matches!(err, CoerceError::InvalidSize { .. }));
    }

    #[test]
    fn test_number_stores_float() {
        let mut n = Number::default();
        n.set_from(&json!(1)).unwrap();
        assert_eq!(n.value(), 1.0);
        n.set_from(&json!(2.5)).unwrap();
        assert_eq!(n.value(), 2.5);
        assert_eq!(Number::field_kind(), FieldKind::Float);
    }
}
