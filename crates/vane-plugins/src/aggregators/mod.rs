//! Windowed reducers.

pub mod minmax;
