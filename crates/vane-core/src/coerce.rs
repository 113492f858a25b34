//! Assignment of untyped configuration maps onto [`Configurable`] values.
//!
//! Keys are applied in sorted order. A key that matches no field is dropped
//! and reported in [`AssignReport::unmatched`]; under
//! [`Strictness::Strict`] it becomes [`CoerceError::UnknownKeys`] instead.
//!
//! Assignment is not transactional: when a key fails, fields set by earlier
//! keys stay set. Use [`assign_atomic`] to work on a scratch copy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::configurable::Configurable;
use crate::error::{CoerceError, CoerceResult};

/// How keys that match no field are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Unknown keys are dropped silently.
    #[default]
    Lenient,
    /// Unknown keys fail the assignment.
    Strict,
}

/// Which keys an assignment consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignReport {
    /// Keys that matched a field, in the order they were applied.
    pub applied: Vec<String>,
    /// Keys that matched no field.
    pub unmatched: Vec<String>,
}

fn sorted_keys(raw: &Map<String, Value>) -> Vec<&String> {
    let mut keys: Vec<&String> = raw.keys().collect();
    keys.sort();
    keys
}

/// Assigns every key of `raw` onto `dest`, dropping unknown keys.
pub fn assign<T>(raw: &Map<String, Value>, dest: &mut T) -> CoerceResult<AssignReport>
where
    T: Configurable + ?Sized,
{
    let mut report = AssignReport::default();
    for key in sorted_keys(raw) {
        if dest.assign_key(key, &raw[key.as_str()])? {
            report.applied.push(key.clone());
        } else {
            trace!(key = %key, "No field matches configuration key");
            report.unmatched.push(key.clone());
        }
    }
    Ok(report)
}

/// Like [`assign`], failing on unknown keys when `strictness` is strict.
///
/// In strict mode the check runs after all known keys were applied, so the
/// destination must still be discarded on error.
pub fn assign_with<T>(
    raw: &Map<String, Value>,
    dest: &mut T,
    strictness: Strictness,
) -> CoerceResult<AssignReport>
where
    T: Configurable + ?Sized,
{
    let report = assign(raw, dest)?;
    if strictness == Strictness::Strict && !report.unmatched.is_empty() {
        return Err(CoerceError::UnknownKeys(report.unmatched));
    }
    Ok(report)
}

/// Assigns into a clone of `dest` and swaps it in only on success.
pub fn assign_atomic<T>(
    raw: &Map<String, Value>,
    dest: &mut T,
    strictness: Strictness,
) -> CoerceResult<AssignReport>
where
    T: Configurable + Clone,
{
    let mut scratch = dest.clone();
    let report = assign_with(raw, &mut scratch, strictness)?;
    *dest = scratch;
    Ok(report)
}

/// Replaces `dest` with a fresh default instance configured from an object.
///
/// Used by derived [`ConfigField`](crate::ConfigField) impls for nested
/// structs.
pub fn assign_object<T>(dest: &mut T, value: &Value) -> CoerceResult<()>
where
    T: Configurable + Default,
{
    let Value::Object(raw) = value else {
        return Err(CoerceError::mismatch("object", value));
    };
    let mut fresh = T::default();
    assign(raw, &mut fresh)?;
    *dest = fresh;
    Ok(())
}

// =============================================================================
// Named targets
// =============================================================================

/// Per-target outcome of [`ConfigTargets::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetsReport {
    /// `(target name, keys it consumed)`, in target order.
    pub consumed: Vec<(String, Vec<String>)>,
    /// Keys consumed by no target.
    pub unmatched: Vec<String>,
}

impl TargetsReport {
    /// Keys consumed by the named target.
    pub fn keys_for(&self, target: &str) -> &[String] {
        self.consumed
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, keys)| keys.as_slice())
            .unwrap_or_default()
    }
}

/// Applies one configuration map to an ordered list of named destinations.
///
/// Every target sees the whole map and takes the keys that match its fields,
/// so a plugin struct and its wrapper config can share one map while the
/// split stays visible in the [`TargetsReport`].
///
/// # Example
///
/// ```rust,ignore
/// let report = ConfigTargets::new()
///     .strictness(Strictness::Strict)
///     .target("plugin", &mut plugin)
///     .target("wrapper", &mut wrapper)
///     .apply(&raw)?;
/// ```
pub struct ConfigTargets<'a> {
    targets: Vec<(&'a str, &'a mut dyn Configurable)>,
    strictness: Strictness,
}

impl Default for ConfigTargets<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ConfigTargets<'a> {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            strictness: Strictness::default(),
        }
    }

    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Appends a destination. Targets are applied in insertion order.
    pub fn target(mut self, name: &'a str, dest: &'a mut dyn Configurable) -> Self {
        self.targets.push((name, dest));
        self
    }

    /// Assigns `raw` to every target, stopping at the first error.
    pub fn apply(self, raw: &Map<String, Value>) -> CoerceResult<TargetsReport> {
        let mut report = TargetsReport::default();
        let mut matched = std::collections::BTreeSet::new();

        for (name, dest) in self.targets {
            let applied = assign(raw, dest)?.applied;
            matched.extend(applied.iter().cloned());
            report.consumed.push((name.to_string(), applied));
        }

        report.unmatched = sorted_keys(raw)
            .into_iter()
            .filter(|k| !matched.contains(*k))
            .cloned()
            .collect();

        if self.strictness == Strictness::Strict && !report.unmatched.is_empty() {
            return Err(CoerceError::UnknownKeys(report.unmatched));
        }
        Ok(report)
    }
}
