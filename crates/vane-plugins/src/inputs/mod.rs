//! Metric sources.

#[cfg(feature = "system")]
pub mod cpu;
#[cfg(feature = "system")]
pub mod mem;
