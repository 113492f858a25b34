//! The plugin lifecycle controller.
//!
//! Turns a [`PluginSpec`] into a running plugin instance:
//!
//! ```text
//! absent ─create─► created ─schedule─► running ─delete─► stopping ─reap─► dead
//! ```
//!
//! The controller owns no state of its own. Instances live in the
//! [`Agent`]'s running-sets and are looked up by numeric ID on every call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vane_agent::{
    Agent, InputConfig, OutputConfig, PluginId, PluginStatus, ProcessorConfig, RunningInput,
    RunningOutput, RunningPlugin, RunningProcessor, StopHandle,
};
use vane_core::{
    ConfigTargets, Configurable, PluginFactory, Registry, Strictness, TypeSchema, split_qualified,
};

use crate::dto::{PluginSpec, RunningPluginInfo};
use crate::error::{ApiError, ApiResult};

/// Behaviour switches for the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerOptions {
    /// Unknown config keys and unknown IDs on delete become errors when strict.
    pub strictness: Strictness,
}

/// Creates, inspects and stops plugin instances on behalf of the API.
pub struct PluginController {
    registry: Arc<Registry>,
    agent: Arc<Agent>,
    options: ControllerOptions,
}

impl PluginController {
    pub fn new(registry: Arc<Registry>, agent: Arc<Agent>) -> Self {
        Self {
            registry,
            agent,
            options: ControllerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    fn is_strict(&self) -> bool {
        self.options.strictness == Strictness::Strict
    }

    // ─── Create ─────────────────────────────────────────────────────────────

    /// Builds, configures, initializes and schedules one plugin instance.
    ///
    /// Every failure happens before the instance is registered with the
    /// agent, so an error leaves no trace. Must be called from within a
    /// tokio runtime.
    pub fn create_plugin(&self, spec: &PluginSpec) -> ApiResult<PluginId> {
        let (kind, name) = split_qualified(&spec.name)
            .ok_or_else(|| ApiError::PluginNotFound(spec.name.clone()))?;
        let factory = self
            .registry
            .get(kind, name)
            .ok_or_else(|| ApiError::PluginNotFound(spec.name.clone()))?;

        let id = match factory {
            PluginFactory::Input(make) => {
                let mut plugin = make();
                let mut config = InputConfig::new(name);
                self.configure(spec, &mut plugin, &mut config)?;

                let mut input = RunningInput::new(plugin, config);
                input.set_default_tags(self.agent.settings().default_tags());
                input
                    .init()
                    .map_err(|e| ApiError::init(&spec.name, e))?;

                let input = Arc::new(input);
                self.agent.start_input(&input)?;
                self.agent.run_input(input.clone());
                input.plugin_id()
            }
            PluginFactory::Processor(make) => {
                let mut plugin = make();
                let mut config = ProcessorConfig::new(name);
                self.configure(spec, &mut plugin, &mut config)?;
                self.schedule_processor(spec, RunningProcessor::new(plugin, config))?
            }
            PluginFactory::Aggregator(make) => {
                let mut plugin = make();
                let mut config = ProcessorConfig::new(name);
                self.configure(spec, &mut plugin, &mut config)?;
                self.schedule_processor(spec, RunningProcessor::aggregator(plugin, config))?
            }
            PluginFactory::Output(make) => {
                let mut plugin = make();
                let mut config = OutputConfig::new(name);
                self.configure(spec, &mut plugin, &mut config)?;

                let settings = self.agent.settings();
                let mut output = RunningOutput::new(
                    plugin,
                    config,
                    settings.metric_batch_size,
                    settings.metric_buffer_limit,
                );
                output
                    .init()
                    .map_err(|e| ApiError::init(&spec.name, e))?;

                let output = Arc::new(output);
                self.agent.start_output(&output)?;
                self.agent.run_output(output.clone());
                output.plugin_id()
            }
        };

        info!(plugin = %spec.name, id = %id, "Plugin created");
        Ok(id)
    }

    fn schedule_processor(
        &self,
        spec: &PluginSpec,
        mut processor: RunningProcessor,
    ) -> ApiResult<PluginId> {
        processor
            .init()
            .map_err(|e| ApiError::init(&spec.name, e))?;
        let processor = Arc::new(processor);
        self.agent.start_processor(&processor)?;
        self.agent.run_processor(processor.clone());
        Ok(processor.plugin_id())
    }

    /// Applies the `Config` map to the plugin, then to its wrapper config.
    fn configure(
        &self,
        spec: &PluginSpec,
        plugin: &mut dyn Configurable,
        wrapper: &mut dyn Configurable,
    ) -> ApiResult<()> {
        let report = ConfigTargets::new()
            .strictness(self.options.strictness)
            .target("plugin", plugin)
            .target("wrapper", wrapper)
            .apply(&spec.config)
            .map_err(|e| ApiError::config(&spec.name, e))?;

        debug!(
            plugin = %spec.name,
            plugin_keys = ?report.keys_for("plugin"),
            wrapper_keys = ?report.keys_for("wrapper"),
            "Configuration applied"
        );
        if !report.unmatched.is_empty() {
            warn!(
                plugin = %spec.name,
                keys = ?report.unmatched,
                "Ignoring unknown configuration keys"
            );
        }
        Ok(())
    }

    // ─── Inspect ────────────────────────────────────────────────────────────

    fn running(&self) -> Vec<Arc<dyn RunningPlugin>> {
        let mut all: Vec<Arc<dyn RunningPlugin>> = Vec::with_capacity(self.agent.len());
        for input in self.agent.running_inputs() {
            all.push(input);
        }
        for processor in self.agent.running_processors() {
            all.push(processor);
        }
        for output in self.agent.running_outputs() {
            all.push(output);
        }
        all
    }

    /// Status of the instance with the given ID.
    ///
    /// Unknown and malformed IDs report [`PluginStatus::Dead`]: a plugin that
    /// was reaped and one that never existed look the same from outside.
    pub fn get_plugin_status(&self, id: &PluginId) -> PluginStatus {
        let Some(numeric) = id.as_u64() else {
            return PluginStatus::Dead;
        };
        self.running()
            .into_iter()
            .find(|plugin| plugin.id() == numeric)
            .map_or(PluginStatus::Dead, |plugin| plugin.status())
    }

    /// Live view of every running instance, inputs first.
    pub fn list_running_plugins(&self) -> Vec<RunningPluginInfo> {
        self.running()
            .into_iter()
            .map(|plugin| RunningPluginInfo {
                id: plugin.plugin_id(),
                name: plugin.name(),
                config: plugin.describe(),
            })
            .collect()
    }

    /// Schemas of every registered plugin type, sorted by name.
    pub fn list_plugin_types(&self) -> &[TypeSchema] {
        self.registry.catalog()
    }

    // ─── Delete / update ────────────────────────────────────────────────────

    /// Requests a stop and returns without waiting for it.
    ///
    /// `Ok(None)` means no instance had the ID (lenient mode only).
    pub fn delete_plugin(&self, id: &PluginId) -> ApiResult<Option<StopHandle>> {
        let numeric = id.as_u64();
        let matches = |handle_id: u64| numeric == Some(handle_id);

        let handle = if let Some(input) = self
            .agent
            .running_inputs()
            .into_iter()
            .find(|h| matches(h.id()))
        {
            Some(self.agent.stop_input(&input))
        } else if let Some(processor) = self
            .agent
            .running_processors()
            .into_iter()
            .find(|h| matches(h.id()))
        {
            Some(self.agent.stop_processor(&processor))
        } else {
            self.agent
                .running_outputs()
                .into_iter()
                .find(|h| matches(h.id()))
                .map(|output| self.agent.stop_output(&output))
        };

        match handle {
            Some(handle) => {
                info!(id = %id, "Plugin stop requested");
                Ok(Some(handle))
            }
            None if self.is_strict() => Err(ApiError::UnknownPlugin(id.clone())),
            None => {
                debug!(id = %id, "Delete of unknown plugin ignored");
                Ok(None)
            }
        }
    }

    /// Reconfiguring a live instance is not supported; delete and recreate.
    pub fn update_plugin(&self, _id: &PluginId, _spec: &PluginSpec) -> ApiResult<()> {
        Err(ApiError::NotImplemented("plugin update"))
    }
}
