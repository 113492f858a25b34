//! Procedural macros for the Vane agent.
//!
//! This crate provides:
//!
//! - `#[derive(Configurable)]` - Generates schema description and key-based
//!   assignment for plugin configuration structs
//!
//! The generated code refers to `::vane_core`, so the derive is normally used
//! through the re-export in `vane_core`.

mod configurable;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `vane_core::Configurable` and `vane_core::ConfigField` for a
/// struct with named fields.
///
/// Only `pub` fields take part. Fields whose type holds a function pointer,
/// a trait object or a raw reference are skipped because they have no
/// configuration form. Any other field type must implement `ConfigField`.
///
/// The struct must implement `Default`; nested instances are rebuilt from
/// `Default::default()` on assignment.
///
/// # Attributes
///
/// - `#[config(rename = "...")]` - Configuration key, matched exactly; the field name still matches case-insensitively
/// - `#[config(skip)]` - Exclude the field
/// - `#[config(flatten)]` - Merge a nested struct's keys into this level
/// - `#[config(format = "...")]` - Free-form format hint for the schema
/// - `#[config(required)]` - Mark the field as required in the schema
///
/// # Example
///
/// ```rust,ignore
/// use vane_core::{Configurable, Duration};
///
/// #[derive(Default, Configurable)]
/// pub struct HttpInput {
///     #[config(required, format = "url")]
///     pub urls: Vec<String>,
///     pub timeout: Duration,
///     #[config(flatten)]
///     pub tls: ClientTls,
///     #[config(skip)]
///     pub client: Option<Client>,
/// }
/// ```
#[proc_macro_derive(Configurable, attributes(config))]
pub fn derive_configurable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match configurable::derive_configurable(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
