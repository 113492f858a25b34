//! Running handles: a plugin instance, its wrapper config and its lifecycle.
//!
//! Handles are built by the caller, initialized, then handed to the
//! [`Agent`](crate::Agent) as `Arc`s. The agent owns every status transition.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use vane_core::{
    Accumulator, Aggregator, CoerceResult, Configurable, FieldMap, Input, Metric, Output,
    PluginKind, PluginResult, Processor, describe,
};

use crate::models::{InputConfig, OutputConfig, ProcessorConfig};
use crate::status::{PluginId, PluginStatus};

// =============================================================================
// Lifecycle
// =============================================================================

/// ID, status and cancellation shared by every kind of handle.
pub(crate) struct Lifecycle {
    id: AtomicU64,
    status: watch::Sender<PluginStatus>,
    cancel: CancellationToken,
    scheduled: AtomicBool,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            id: AtomicU64::new(0),
            status: watch::Sender::new(PluginStatus::Unknown),
            cancel: CancellationToken::new(),
            scheduled: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id.load(Ordering::Acquire)
    }

    pub(crate) fn status(&self) -> PluginStatus {
        *self.status.borrow()
    }

    /// Assigns the agent ID and moves to `created`. Fails if already started.
    pub(crate) fn register(&self, id: u64) -> bool {
        if self
            .id
            .compare_exchange(0, id, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.status.send_replace(PluginStatus::Created);
        true
    }

    /// Records that a scheduling task was spawned. Returns `false` if the
    /// handle was already scheduled.
    pub(crate) fn mark_scheduled(&self) -> bool {
        !self.scheduled.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::Acquire)
    }

    /// `created -> running`. A stop that raced ahead is not overwritten.
    pub(crate) fn mark_running(&self) {
        self.status.send_if_modified(|status| {
            if *status == PluginStatus::Created {
                *status = PluginStatus::Running;
                true
            } else {
                false
            }
        });
    }

    /// Requests cancellation. Returns `false` if the plugin is already dead.
    pub(crate) fn begin_stop(&self) -> bool {
        let stopping = self.status.send_if_modified(|status| match status {
            PluginStatus::Dead => false,
            _ => {
                *status = PluginStatus::Stopping;
                true
            }
        });
        self.cancel.cancel();
        stopping
    }

    pub(crate) fn mark_dead(&self) {
        self.status.send_replace(PluginStatus::Dead);
    }

    pub(crate) fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<PluginStatus> {
        self.status.subscribe()
    }
}

/// Common read-only view over the three handle kinds.
pub trait RunningPlugin: Send + Sync {
    /// Qualified plugin name, e.g. `inputs.cpu`.
    fn name(&self) -> String;

    /// Agent-assigned numeric ID; zero until started.
    fn id(&self) -> u64;

    fn status(&self) -> PluginStatus;

    /// Schema of the live wrapper config merged with the live plugin.
    fn describe(&self) -> FieldMap;

    fn plugin_id(&self) -> PluginId {
        PluginId::from(self.id())
    }
}

fn describe_merged<W, P>(wrapper: &W, plugin: &P) -> FieldMap
where
    W: Configurable,
    P: Configurable + ?Sized,
{
    let mut fields = describe(wrapper);
    plugin.describe_into(&mut fields);
    fields
}

// =============================================================================
// Inputs
// =============================================================================

/// A scheduled input.
pub struct RunningInput {
    plugin: RwLock<Box<dyn Input>>,
    config: InputConfig,
    default_tags: HashMap<String, String>,
    gathered: AtomicU64,
    pub(crate) lifecycle: Lifecycle,
}

impl RunningInput {
    pub fn new(plugin: Box<dyn Input>, config: InputConfig) -> Self {
        Self {
            plugin: RwLock::new(plugin),
            config,
            default_tags: HashMap::new(),
            gathered: AtomicU64::new(0),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Tags added to every metric unless already present.
    pub fn set_default_tags(&mut self, tags: HashMap<String, String>) {
        self.default_tags = tags;
    }

    /// Runs the plugin's `init` hook. Call before handing the input to the agent.
    pub fn init(&mut self) -> PluginResult<()> {
        self.plugin.get_mut().init()
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    /// Metrics gathered since start.
    pub fn gathered(&self) -> u64 {
        self.gathered.load(Ordering::Relaxed)
    }

    /// Gathers once and returns the metrics after wrapper processing.
    pub(crate) fn gather(&self) -> (Vec<Metric>, PluginResult<()>) {
        let mut acc = Accumulator::new();
        let result = self.plugin.write().gather(&mut acc);
        let metrics: Vec<Metric> = acc
            .drain()
            .into_iter()
            .filter_map(|m| self.config.make_metric(m, &self.default_tags))
            .collect();
        self.gathered
            .fetch_add(metrics.len() as u64, Ordering::Relaxed);
        (metrics, result)
    }
}

impl RunningPlugin for RunningInput {
    fn name(&self) -> String {
        PluginKind::Input.qualify(&self.config.name)
    }

    fn id(&self) -> u64 {
        self.lifecycle.id()
    }

    fn status(&self) -> PluginStatus {
        self.lifecycle.status()
    }

    fn describe(&self) -> FieldMap {
        describe_merged(&self.config, &*self.plugin.read())
    }
}

// =============================================================================
// Processors and aggregators
// =============================================================================

/// The two plugin kinds that sit in the processing chain.
pub enum ProcessorPlugin {
    Processor(Box<dyn Processor>),
    Aggregator(Box<dyn Aggregator>),
}

impl Configurable for ProcessorPlugin {
    fn describe_into(&self, fields: &mut FieldMap) {
        match self {
            Self::Processor(p) => p.describe_into(fields),
            Self::Aggregator(a) => a.describe_into(fields),
        }
    }

    fn assign_key(&mut self, key: &str, value: &serde_json::Value) -> CoerceResult<bool> {
        match self {
            Self::Processor(p) => p.assign_key(key, value),
            Self::Aggregator(a) => a.assign_key(key, value),
        }
    }
}

/// A processor or aggregator in the processing chain.
pub struct RunningProcessor {
    plugin: RwLock<ProcessorPlugin>,
    config: ProcessorConfig,
    pub(crate) lifecycle: Lifecycle,
}

impl RunningProcessor {
    pub fn new(plugin: Box<dyn Processor>, config: ProcessorConfig) -> Self {
        Self::from_plugin(ProcessorPlugin::Processor(plugin), config)
    }

    pub fn aggregator(plugin: Box<dyn Aggregator>, config: ProcessorConfig) -> Self {
        Self::from_plugin(ProcessorPlugin::Aggregator(plugin), config)
    }

    fn from_plugin(plugin: ProcessorPlugin, config: ProcessorConfig) -> Self {
        Self {
            plugin: RwLock::new(plugin),
            config,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn init(&mut self) -> PluginResult<()> {
        match self.plugin.get_mut() {
            ProcessorPlugin::Processor(p) => p.init(),
            ProcessorPlugin::Aggregator(a) => a.init(),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn kind(&self) -> PluginKind {
        match &*self.plugin.read() {
            ProcessorPlugin::Processor(_) => PluginKind::Processor,
            ProcessorPlugin::Aggregator(_) => PluginKind::Aggregator,
        }
    }

    pub fn is_aggregator(&self) -> bool {
        self.kind() == PluginKind::Aggregator
    }

    /// Runs one batch through the plugin. Metrics rejected by the wrapper
    /// filter pass through untouched.
    pub(crate) fn apply(&self, metrics: Vec<Metric>) -> Vec<Metric> {
        let filter = &self.config.filter;
        let (selected, mut passed): (Vec<Metric>, Vec<Metric>) = if filter.is_active() {
            metrics.into_iter().partition(|m| filter.select(m))
        } else {
            (metrics, Vec::new())
        };

        let mut plugin = self.plugin.write();
        match &mut *plugin {
            ProcessorPlugin::Processor(p) => passed.extend(p.apply(selected)),
            ProcessorPlugin::Aggregator(a) => {
                for metric in &selected {
                    a.add(metric);
                }
                if !self.config.drop_original {
                    passed.extend(selected);
                }
            }
        }
        passed
    }

    /// Emits and resets the aggregation window. Empty for processors.
    pub(crate) fn push(&self) -> Vec<Metric> {
        let mut plugin = self.plugin.write();
        match &mut *plugin {
            ProcessorPlugin::Processor(_) => Vec::new(),
            ProcessorPlugin::Aggregator(a) => {
                let mut acc = Accumulator::new();
                a.push(&mut acc);
                a.reset();
                acc.drain()
            }
        }
    }
}

impl RunningPlugin for RunningProcessor {
    fn name(&self) -> String {
        self.kind().qualify(&self.config.name)
    }

    fn id(&self) -> u64 {
        self.lifecycle.id()
    }

    fn status(&self) -> PluginStatus {
        self.lifecycle.status()
    }

    fn describe(&self) -> FieldMap {
        describe_merged(&self.config, &*self.plugin.read())
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// A scheduled output with its metric buffer.
pub struct RunningOutput {
    plugin: RwLock<Box<dyn Output>>,
    config: OutputConfig,
    buffer: Mutex<VecDeque<Metric>>,
    batch_size: usize,
    buffer_limit: usize,
    written: AtomicU64,
    dropped: AtomicU64,
    pub(crate) lifecycle: Lifecycle,
}

impl RunningOutput {
    /// Wraps an output. Non-zero batch and buffer sizes in `config` override
    /// the given defaults.
    pub fn new(
        plugin: Box<dyn Output>,
        config: OutputConfig,
        batch_size: usize,
        buffer_limit: usize,
    ) -> Self {
        let batch_size = non_zero(config.metric_batch_size, batch_size).max(1);
        let buffer_limit = non_zero(config.metric_buffer_limit, buffer_limit).max(batch_size);
        Self {
            plugin: RwLock::new(plugin),
            config,
            buffer: Mutex::new(VecDeque::new()),
            batch_size,
            buffer_limit,
            written: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn init(&mut self) -> PluginResult<()> {
        self.plugin.get_mut().init()
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn buffer_limit(&self) -> usize {
        self.buffer_limit
    }

    /// Metrics waiting to be written.
    pub fn buffered(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Metrics discarded because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Filters and buffers one metric, evicting the oldest when full.
    pub(crate) fn add_metric(&self, metric: Metric) {
        let Some(metric) = self.config.filter.apply(metric) else {
            return;
        };
        let mut buffer = self.buffer.lock();
        buffer.push_back(metric);
        while buffer.len() > self.buffer_limit {
            buffer.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn connect(&self) -> PluginResult<()> {
        self.plugin.write().connect()
    }

    pub(crate) fn close(&self) -> PluginResult<()> {
        self.plugin.write().close()
    }

    /// Writes the buffer out in batches. A failed batch goes back to the
    /// front of the buffer.
    pub(crate) fn flush(&self) -> PluginResult<usize> {
        let mut total = 0;
        loop {
            let batch: Vec<Metric> = {
                let mut buffer = self.buffer.lock();
                let n = buffer.len().min(self.batch_size);
                buffer.drain(..n).collect()
            };
            if batch.is_empty() {
                return Ok(total);
            }

            if let Err(e) = self.plugin.write().write(&batch) {
                let mut buffer = self.buffer.lock();
                for metric in batch.into_iter().rev() {
                    buffer.push_front(metric);
                }
                return Err(e);
            }
            total += batch.len();
            self.written
                .fetch_add(batch.len() as u64, Ordering::Relaxed);
        }
    }
}

impl RunningPlugin for RunningOutput {
    fn name(&self) -> String {
        PluginKind::Output.qualify(&self.config.name)
    }

    fn id(&self) -> u64 {
        self.lifecycle.id()
    }

    fn status(&self) -> PluginStatus {
        self.lifecycle.status()
    }

    fn describe(&self) -> FieldMap {
        describe_merged(&self.config, &*self.plugin.read())
    }
}

pub(crate) fn non_zero<T: Default + PartialEq>(value: T, fallback: T) -> T {
    if value == T::default() { fallback } else { value }
}
