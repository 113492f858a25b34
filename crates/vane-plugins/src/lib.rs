//! # Vane Plugins
//!
//! Built-in plugin types. Each module registers its types with
//! [`vane_core::register_plugin!`], so linking this crate is enough for
//! [`Registry::collect_all`](vane_core::Registry::collect_all) to find them.
//!
//! | Name | Kind | Description |
//! |------|------|-------------|
//! | `inputs.cpu` | input | Per-core and total CPU usage (feature `system`) |
//! | `inputs.mem` | input | Physical memory and swap (feature `system`) |
//! | `processors.rename` | processor | Renames measurements, tags and fields |
//! | `aggregators.minmax` | aggregator | Per-series minimum and maximum of numeric fields |
//! | `outputs.file` | output | Writes metrics to stdout or files with rotation |

pub mod aggregators;
pub mod inputs;
pub mod outputs;
pub mod processors;
pub mod serializer;

/// Forces the linker to keep this crate's registrations.
///
/// Binaries that never name a type from this crate call this once at startup;
/// otherwise the crate can be dropped from the link along with its entries in
/// [`vane_core::registry::PLUGINS`].
#[inline(never)]
pub fn link() {}
