//! # Vane API
//!
//! Runtime control of plugin instances.
//!
//! [`PluginController`] turns a [`PluginSpec`] (qualified name plus raw config
//! map) into a running instance scheduled by the agent, and looks instances up
//! again by [`PluginId`](vane_agent::PluginId). [`server::router`] exposes it
//! over HTTP; [`ApiServer`] binds and serves that router.

pub mod controller;
pub mod dto;
pub mod error;
pub mod server;

pub use controller::{ControllerOptions, PluginController};
pub use dto::{CreatedPlugin, PluginSpec, RunningPluginInfo, StatusResponse};
pub use error::{ApiError, ApiResult};
pub use server::{ApiServer, router};
