//! # Vane Core
//!
//! Typed plugin configuration for the Vane telemetry agent.
//!
//! This crate turns plain Rust structs into runtime-configurable plugins:
//!
//! - **Introspection**: [`describe`] walks a [`Configurable`] value and yields
//!   a [`FieldMap`] of [`FieldSchema`] nodes.
//! - **Coercion**: [`assign`] applies an untyped JSON map onto a typed value,
//!   converting strings to [`Duration`] and [`Size`] along the way.
//! - **Registry**: plugin crates register factories in [`registry::PLUGINS`];
//!   [`Registry::collect_all`] gathers them into an explicit value.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vane_core::{Configurable, Duration, assign, describe};
//!
//! #[derive(Default, Configurable)]
//! pub struct Ping {
//!     pub urls: Vec<String>,
//!     pub timeout: Duration,
//! }
//!
//! let mut ping = Ping::default();
//! let raw = serde_json::json!({"urls": ["example.org"], "timeout": "5s"});
//! assign(raw.as_object().unwrap(), &mut ping)?;
//!
//! let schema = describe(&ping);
//! assert_eq!(schema["timeout"].default, Some(5_000_000_000u64.into()));
//! ```

// Lets the derive's `::vane_core` paths resolve inside this crate's tests.
extern crate self as vane_core;

pub mod coerce;
pub mod configurable;
pub mod describe;
pub mod error;
pub mod metric;
pub mod plugin;
pub mod registry;
pub mod schema;
pub mod units;

pub use coerce::{
    AssignReport, ConfigTargets, Strictness, TargetsReport, assign, assign_atomic, assign_with,
};
pub use configurable::{ConfigField, Configurable};
pub use describe::describe;
pub use error::{CoerceError, CoerceResult, PluginError, PluginResult};
pub use metric::{Accumulator, FieldValue, Metric};
pub use plugin::{Aggregator, Input, Output, PluginKind, Processor, split_qualified};
pub use registry::{PluginFactory, PluginRegistration, Registry};
pub use schema::{FieldKind, FieldMap, FieldSchema, TypeSchema};
pub use units::{Duration, Number, Size};

/// `#[derive(Configurable)]`, sharing its name with the trait.
pub use vane_macros::Configurable;

#[doc(hidden)]
pub mod __private {
    pub use linkme;
    pub use serde_json::{Map, Value};
}

/// Prelude for plugin authors.
pub mod prelude {
    pub use super::{
        Accumulator, Aggregator, ConfigField, Configurable, Duration, FieldValue, Input, Metric,
        Number, Output, PluginError, PluginResult, Processor, Size,
    };
}
