//! Generic, recursive description of a plugin's configurable shape.
//!
//! A [`FieldMap`] is produced by [`describe`](crate::describe) from any
//! [`Configurable`](crate::Configurable) value. The wire form keeps the field
//! names external clients already consume: `type`, `default`, `format`,
//! `required`, `sub_type` and `sub_fields`, each omitted when empty.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a configurable field.
///
/// `Duration` and `Size` are scalar kinds even though their storage is a
/// wrapper type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Bool,
    Duration,
    Size,
    Any,
    Array,
    Map,
    Object,
}

impl FieldKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Duration => "duration",
            Self::Size => "size",
            Self::Any => "any",
            Self::Array => "array",
            Self::Map => "map",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered map from configuration key to field description.
pub type FieldMap = BTreeMap<String, FieldSchema>;

/// One node of a configuration schema.
///
/// `fields` is populated exactly when `kind` is [`FieldKind::Object`] or
/// `element_kind` is `Some(FieldKind::Object)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub kind: FieldKind,

    /// Non-zero value held by the described instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Free-form formatting hint such as `url`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,

    /// Element kind for arrays, value kind for maps.
    #[serde(rename = "sub_type", default, skip_serializing_if = "Option::is_none")]
    pub element_kind: Option<FieldKind>,

    #[serde(rename = "sub_fields", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: FieldMap,
}

impl FieldSchema {
    /// Creates a bare node of the given kind.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            default: None,
            format: String::new(),
            required: false,
            element_kind: None,
            fields: FieldMap::new(),
        }
    }

    /// Creates an `object` node with the given sub-fields.
    pub fn object(fields: FieldMap) -> Self {
        Self {
            fields,
            ..Self::new(FieldKind::Object)
        }
    }

    /// Sets the element kind and, for object elements, the element fields.
    pub fn with_element(mut self, kind: FieldKind, fields: FieldMap) -> Self {
        self.element_kind = Some(kind);
        if kind == FieldKind::Object {
            self.fields = fields;
        }
        self
    }

    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// Catalog entry for one registered plugin type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSchema {
    /// Qualified name, e.g. `inputs.cpu`.
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Config")]
    pub config: FieldMap,
}
