//! In-flight metric transformations.

pub mod rename;
