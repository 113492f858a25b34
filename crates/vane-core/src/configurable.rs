//! Traits connecting typed plugin structs to the generic schema and coercer.
//!
//! Two traits split the work:
//!
//! - [`Configurable`] is implemented by structs (normally through
//!   `#[derive(Configurable)]`). It is object safe so plugin trait objects can
//!   be described and assigned without knowing their concrete type.
//! - [`ConfigField`] is implemented by every type that may appear as a field:
//!   scalars, the unit wrappers, `Option`/`Box`, `Vec`, string-keyed maps,
//!   `serde_json::Value`, and derived structs.
//!
//! A field type that implements neither is rejected at compile time, which is
//! how unrepresentable field shapes are caught.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::error::{CoerceError, CoerceResult};
use crate::schema::{FieldKind, FieldMap, FieldSchema};

// =============================================================================
// Struct-level trait
// =============================================================================

/// A struct whose public fields can be described and assigned by key.
///
/// # Example
///
/// ```rust,ignore
/// use vane_core::Configurable;
///
/// #[derive(Default, Configurable)]
/// pub struct Cpu {
///     pub percpu: bool,
///     #[config(rename = "collect_cpu_time")]
///     pub collect_time: bool,
/// }
/// ```
pub trait Configurable {
    /// Inserts one schema node per configurable field into `fields`.
    ///
    /// Flattened fields merge their own nodes into the same map.
    fn describe_into(&self, fields: &mut FieldMap);

    /// Assigns `value` to the field matching `key`.
    ///
    /// Returns `Ok(false)` when no field matches, leaving `self` untouched.
    fn assign_key(&mut self, key: &str, value: &Value) -> CoerceResult<bool>;
}

impl<T: Configurable + ?Sized> Configurable for Box<T> {
    fn describe_into(&self, fields: &mut FieldMap) {
        (**self).describe_into(fields);
    }

    fn assign_key(&mut self, key: &str, value: &Value) -> CoerceResult<bool> {
        (**self).assign_key(key, value)
    }
}

// =============================================================================
// Field-level trait
// =============================================================================

/// A type that can be stored in a field of a [`Configurable`] struct.
pub trait ConfigField {
    /// Schema kind of this type.
    fn field_kind() -> FieldKind;

    /// Element kind and element fields, for arrays and maps.
    fn element() -> Option<(FieldKind, FieldMap)> {
        None
    }

    /// Sub-fields of a fresh default instance, for objects.
    fn object_fields() -> FieldMap {
        FieldMap::new()
    }

    /// Whether this value is the zero value of its type.
    fn is_zero(&self) -> bool;

    /// Current value as JSON. Durations render as nanoseconds and sizes as bytes.
    fn to_value(&self) -> Value;

    /// Replaces this value with one converted from `value`.
    fn set_from(&mut self, value: &Value) -> CoerceResult<()>;

    /// Describes this field, recording its current value as the default when
    /// it is non-zero.
    fn schema(&self) -> FieldSchema
    where
        Self: Sized,
    {
        let kind = Self::field_kind();
        if kind == FieldKind::Object {
            return FieldSchema::object(Self::object_fields());
        }

        let default = (!self.is_zero()).then(|| self.to_value());
        let schema = FieldSchema::new(kind).with_default(default);
        match Self::element() {
            Some((element_kind, fields)) => schema.with_element(element_kind, fields),
            None => schema,
        }
    }
}

// ─── Scalars ─────────────────────────────────────────────────────────────────

impl ConfigField for String {
    fn field_kind() -> FieldKind {
        FieldKind::String
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
        match value {
            Value::String(s) => {
                self.clone_from(s);
                Ok(())
            }
            other => Err(CoerceError::mismatch("string", other)),
        }
    }
}

impl ConfigField for bool {
    fn field_kind() -> FieldKind {
        FieldKind::Bool
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
        match value {
            Value::Bool(b) => {
                *self = *b;
                Ok(())
            }
            other => Err(CoerceError::mismatch("bool", other)),
        }
    }
}

/// Integers accept any integer source and cast without range checks.
/// Float sources are rejected.
macro_rules! impl_integer_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ConfigField for $ty {
                fn field_kind() -> FieldKind {
                    FieldKind::Integer
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
                    let Value::Number(n) = value else {
                        return Err(CoerceError::mismatch("integer", value));
                    };
                    if let Some(i) = n.as_i64() {
                        *self = i as $ty;
                    } else if let Some(u) = n.as_u64() {
                        *self = u as $ty;
                    } else {
                        return Err(CoerceError::mismatch("integer", value));
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_integer_field!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_float_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ConfigField for $ty {
                fn field_kind() -> FieldKind {
                    FieldKind::Float
                }

                fn is_zero(&self) -> bool {
                    *self == 0.0
                }

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
                    match value {
                        Value::Number(n) => match n.as_f64() {
                            Some(f) => {
                                *self = f as $ty;
                                Ok(())
                            }
                            None => Err(CoerceError::mismatch("float", value)),
                        },
                        other => Err(CoerceError::mismatch("float", other)),
                    }
                }
            }
        )*
    };
}

impl_float_field!(f32, f64);

/// Untyped destination: stores the source verbatim.
impl ConfigField for Value {
    fn field_kind() -> FieldKind {
        FieldKind::Any
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
        *self = value.clone();
        Ok(())
    }
}

// ─── Pointer-like wrappers ───────────────────────────────────────────────────

/// `Option<T>` is allocated lazily and otherwise behaves as `T`.
/// A JSON `null` resets it to `None`.
impl<T: ConfigField + Default> ConfigField for Option<T> {
    fn field_kind() -> FieldKind {
        T::field_kind()
    }

    fn element() -> Option<(FieldKind, FieldMap)> {
        T::element()
    }

    fn object_fields() -> FieldMap {
        T::object_fields()
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ConfigField::to_value)
    }

    fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).set_from(value)
    }
}

impl<T: ConfigField> ConfigField for Box<T> {
    fn field_kind() -> FieldKind {
        T::field_kind()
    }

    fn element() -> Option<(FieldKind, FieldMap)> {
        T::element()
    }

    fn object_fields() -> FieldMap {
        T::object_fields()
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
        (**self).set_from(value)
    }
}

// ─── Collections ─────────────────────────────────────────────────────────────

impl<T: ConfigField + Default> ConfigField for Vec<T> {
    fn field_kind() -> FieldKind {
        FieldKind::Array
    }

    fn element() -> Option<(FieldKind, FieldMap)> {
        Some((T::field_kind(), T::object_fields()))
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(ConfigField::to_value).collect())
    }

    fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
        let Value::Array(items) = value else {
            return Err(CoerceError::mismatch("array", value));
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut element = T::default();
            element
                .set_from(item)
                .map_err(|e| e.at(&format!("[{i}]")))?;
            out.push(element);
        }
        *self = out;
        Ok(())
    }
}

/// Builds a fresh string-keyed map from a JSON object, converting each value.
fn collect_map<T, M>(value: &Value) -> CoerceResult<M>
where
    T: ConfigField + Default,
    M: FromIterator<(String, T)>,
{
    let Value::Object(entries) = value else {
        return Err(CoerceError::mismatch("map", value));
    };
    entries
        .iter()
        .map(|(key, item)| {
            let mut element = T::default();
            element.set_from(item).map_err(|e| e.at(key))?;
            Ok::<_, CoerceError>((key.clone(), element))
        })
        .collect()
}

fn map_to_value<'a, T: ConfigField + 'a>(entries: impl Iterator<Item = (&'a String, &'a T)>) -> Value {
    Value::Object(
        entries
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect::<Map<String, Value>>(),
    )
}

impl<T: ConfigField + Default, S: std::hash::BuildHasher + Default> ConfigField
    for HashMap<String, T, S>
{
    fn field_kind() -> FieldKind {
        FieldKind::Map
    }

    fn element() -> Option<(FieldKind, FieldMap)> {
        Some((T::field_kind(), T::object_fields()))
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn to_value(&self) -> Value {
        map_to_value(self.iter())
    }

    fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
        *self = collect_map::<T, _>(value)?;
        Ok(())
    }
}

impl<T: ConfigField + Default> ConfigField for BTreeMap<String, T> {
    fn field_kind() -> FieldKind {
        FieldKind::Map
    }

    fn element() -> Option<(FieldKind, FieldMap)> {
        Some((T::field_kind(), T::object_fields()))
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn to_value(&self) -> Value {
        map_to_value(self.iter())
    }

    fn set_from(&mut self, value: &Value) -> CoerceResult<()> {
        *self = collect_map::<T, _>(value)?;
        Ok(())
    }
}
