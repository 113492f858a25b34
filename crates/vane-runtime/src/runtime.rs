//! Orchestration of the agent, the controller and the control API.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use vane_runtime::VaneRuntime;
//!
//! let runtime = VaneRuntime::builder()
//!     .config_file("/etc/vane/vane.toml")
//!     .build()?;
//! runtime.run().await?;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::signal;
use tracing::{error, info, warn};
use vane_agent::Agent;
use vane_api::{ApiServer, PluginController, PluginSpec};
use vane_core::{PluginKind, Registry, split_qualified};

use crate::config::{ConfigLoader, ConfigResult, VaneConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// How long [`VaneRuntime::stop`] waits for each plugin group to drain.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Startup order: sinks first so early metrics have somewhere to go.
fn startup_rank(spec: &PluginSpec) -> u8 {
    match split_qualified(&spec.name).map(|(kind, _)| kind) {
        Some(PluginKind::Output) => 0,
        Some(PluginKind::Processor | PluginKind::Aggregator) => 1,
        Some(PluginKind::Input) | None => 2,
    }
}

/// A configured agent with its controller and optional API server.
pub struct VaneRuntime {
    config: VaneConfig,
    controller: Arc<PluginController>,
    server: Mutex<Option<ApiServer>>,
}

impl VaneRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime over every plugin linked into the binary.
    ///
    /// Initializes logging from the configuration first.
    pub fn from_config(config: VaneConfig) -> Self {
        logging::init_from_config(&config.logging);
        Self::with_registry(config, Arc::new(Registry::collect_all()))
    }

    /// Creates a runtime over an explicit registry. Logging is left alone.
    pub fn with_registry(config: VaneConfig, registry: Arc<Registry>) -> Self {
        let agent = Agent::new(config.agent_settings());
        let controller = PluginController::new(registry, agent)
            .with_options(config.api.controller_options());

        info!(
            plugin_types = controller.registry().len(),
            startup_plugins = config.plugins.len(),
            api = config.api.enabled,
            "Runtime created"
        );

        Self {
            config,
            controller: Arc::new(controller),
            server: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &VaneConfig {
        &self.config
    }

    pub fn controller(&self) -> &Arc<PluginController> {
        &self.controller
    }

    pub fn agent(&self) -> &Arc<Agent> {
        self.controller.agent()
    }

    /// Address the control API is bound to, once started.
    pub fn api_addr(&self) -> Option<SocketAddr> {
        self.server.lock().as_ref().map(ApiServer::local_addr)
    }

    /// Creates the configured plugins, then starts the control API.
    ///
    /// A plugin that fails to create aborts startup; plugins created before
    /// it keep running until [`stop`](Self::stop).
    pub async fn start(&self) -> RuntimeResult<()> {
        let mut specs: Vec<&PluginSpec> = self.config.plugins.iter().collect();
        specs.sort_by_key(|spec| startup_rank(spec));

        for spec in specs {
            let id = self
                .controller
                .create_plugin(spec)
                .map_err(|source| RuntimeError::Plugin {
                    name: spec.name.clone(),
                    source,
                })?;
            info!(plugin = %spec.name, id = %id, "Startup plugin created");
        }

        if self.config.api.enabled {
            let listen = &self.config.api.listen;
            let server = ApiServer::bind(listen, self.controller.clone())
                .await
                .map_err(|source| RuntimeError::Bind {
                    addr: listen.clone(),
                    source,
                })?;
            *self.server.lock() = Some(server);
        }

        info!("Runtime started");
        Ok(())
    }

    /// Stops the control API, then every plugin.
    pub async fn stop(&self) -> RuntimeResult<()> {
        let server = self.server.lock().take();
        if let Some(server) = server {
            server.shutdown().await;
        }
        self.agent().shutdown(SHUTDOWN_TIMEOUT).await?;
        info!("Runtime stopped");
        Ok(())
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        if let Err(e) = self.start().await {
            error!(error = %e, "Startup failed, stopping");
            if let Err(stop_err) = self.stop().await {
                warn!(error = %stop_err, "Shutdown after failed startup was incomplete");
            }
            return Err(e);
        }
        info!("Vane is running. Press Ctrl+C to stop.");
        shutdown.await;
        self.stop().await
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads configuration and builds a [`VaneRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    api_listen: Option<String>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            api_listen: None,
        }
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Overrides `api.listen` after every configuration source.
    pub fn api_listen(mut self, listen: impl Into<String>) -> Self {
        self.api_listen = Some(listen.into());
        self
    }

    /// Loads the configuration without building a runtime.
    pub fn load_config(self) -> ConfigResult<VaneConfig> {
        let mut config = self.config_loader.load()?;
        if let Some(listen) = self.api_listen {
            config.api.listen = listen;
            crate::config::validate_config(&config)?;
        }
        Ok(config)
    }

    pub fn build(self) -> ConfigResult<VaneRuntime> {
        Ok(VaneRuntime::from_config(self.load_config()?))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use vane_core::{
        Accumulator, Configurable, Input, Metric, Output, PluginRegistration, PluginResult,
    };

    use super::*;

    #[derive(Default, Configurable)]
    pub struct Tick {}

    impl Input for Tick {
        fn gather(&mut self, acc: &mut Accumulator) -> PluginResult<()> {
            acc.push(Metric::new("tick").with_field("n", 1i64));
            Ok(())
        }
    }

    #[derive(Default, Configurable)]
    pub struct Sink {}

    impl Output for Sink {
        fn write(&mut self, _metrics: &[Metric]) -> PluginResult<()> {
            Ok(())
        }
    }

    fn registry() -> Arc<Registry> {
        Arc::new(
            Registry::new()
                .with(PluginRegistration::input("tick", || Box::new(Tick::default())))
                .with(PluginRegistration::output("sink", || Box::new(Sink::default()))),
        )
    }

    fn config() -> VaneConfig {
        let mut config = VaneConfig::default();
        config.agent.interval = Duration::from_millis(20);
        config.agent.flush_interval = Duration::from_millis(20);
        config.agent.omit_hostname = true;
        config.api.listen = "127.0.0.1:0".into();
        config.plugins = vec![PluginSpec::new("inputs.tick"), PluginSpec::new("outputs.sink")];
        config
    }

    #[test]
    fn test_outputs_start_first() {
        let mut specs = config().plugins;
        specs.sort_by_key(startup_rank);
        assert_eq!(specs[0].name, "outputs.sink");
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let runtime = VaneRuntime::with_registry(config(), registry());
        runtime.start().await.unwrap();

        assert_eq!(runtime.agent().len(), 2);
        let addr = runtime.api_addr().expect("api is enabled");
        assert_ne!(addr.port(), 0);

        let deadline = Instant::now() + Duration::from_secs(1);
        while runtime.agent().running_outputs()[0].written() == 0 {
            assert!(Instant::now() < deadline, "no metrics reached the output");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        runtime.stop().await.unwrap();
        assert!(runtime.agent().is_empty());
        assert!(runtime.api_addr().is_none());
    }

    #[tokio::test]
    async fn test_bad_startup_plugin_aborts() {
        let mut config = config();
        config.plugins.push(PluginSpec::new("inputs.missing"));
        config.api.enabled = false;

        let runtime = VaneRuntime::with_registry(config, registry());
        let err = runtime.run_until(async {}).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Plugin { .. }), "{err}");
        assert!(runtime.agent().is_empty());
    }

    #[tokio::test]
    async fn test_run_until_stops_plugins() {
        let mut config = config();
        config.api.enabled = false;
        let runtime = VaneRuntime::with_registry(config, registry());

        runtime
            .run_until(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(runtime.agent().is_empty());
    }
}
