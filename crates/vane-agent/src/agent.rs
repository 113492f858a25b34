//! The agent: running-sets, ID allocation and scheduling loops.
//!
//! [`Agent`] owns every running plugin. Callers build a handle, run its
//! `init` hook, then:
//!
//! 1. `start_*` assigns the numeric ID, sets `created` and inserts the handle
//!    into its running-set.
//! 2. `run_*` spawns the scheduling task, which flips the status to `running`.
//! 3. `stop_*` sets `stopping` and cancels the task. When the task exits the
//!    handle is removed from its set and marked `dead`.
//!
//! Metrics flow synchronously from an input's gather through the processor
//! chain (sorted by `order`) into every output's buffer. Outputs flush on
//! their own interval and once more when stopped.
//!
//! # Example
//!
//! ```rust,ignore
//! let agent = Agent::new(AgentSettings::default());
//!
//! let input = Arc::new(RunningInput::new(plugin, InputConfig::new("cpu")));
//! agent.start_input(&input)?;
//! agent.run_input(input.clone());
//!
//! agent.stop_input(&input).wait(Duration::from_secs(1)).await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rand::Rng;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use vane_core::Metric;

use crate::error::{AgentError, AgentResult};
use crate::running::{
    Lifecycle, RunningInput, RunningOutput, RunningPlugin, RunningProcessor, non_zero,
};
use crate::settings::AgentSettings;
use crate::status::PluginStatus;

// =============================================================================
// StopHandle
// =============================================================================

/// Awaitable result of a stop request.
#[derive(Debug, Clone)]
pub struct StopHandle {
    id: u64,
    status: watch::Receiver<PluginStatus>,
}

impl StopHandle {
    fn new(id: u64, status: watch::Receiver<PluginStatus>) -> Self {
        Self { id, status }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the plugin has reached `dead`.
    pub fn is_stopped(&self) -> bool {
        *self.status.borrow() == PluginStatus::Dead
    }

    /// Waits until the plugin reaches `dead`.
    ///
    /// A dropped handle counts as dead.
    pub async fn wait(mut self, timeout: Duration) -> AgentResult<()> {
        match tokio::time::timeout(
            timeout,
            self.status.wait_for(|s| *s == PluginStatus::Dead),
        )
        .await
        {
            Ok(_) => Ok(()),
            Err(_) => Err(AgentError::StopTimeout {
                id: self.id,
                timeout,
            }),
        }
    }
}

// =============================================================================
// Agent
// =============================================================================

/// Owner of the running plugin sets.
pub struct Agent {
    settings: AgentSettings,
    next_id: AtomicU64,
    closing: AtomicBool,
    inputs: RwLock<Vec<Arc<RunningInput>>>,
    processors: RwLock<Vec<Arc<RunningProcessor>>>,
    outputs: RwLock<Vec<Arc<RunningOutput>>>,
}

impl Agent {
    pub fn new(settings: AgentSettings) -> Arc<Self> {
        Arc::new(Self {
            settings,
            next_id: AtomicU64::new(1),
            closing: AtomicBool::new(false),
            inputs: RwLock::new(Vec::new()),
            processors: RwLock::new(Vec::new()),
            outputs: RwLock::new(Vec::new()),
        })
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    // ─── Running sets ───────────────────────────────────────────────────────

    pub fn running_inputs(&self) -> Vec<Arc<RunningInput>> {
        self.inputs.read().clone()
    }

    pub fn running_processors(&self) -> Vec<Arc<RunningProcessor>> {
        self.processors.read().clone()
    }

    pub fn running_outputs(&self) -> Vec<Arc<RunningOutput>> {
        self.outputs.read().clone()
    }

    /// Number of plugins across all sets.
    pub fn len(&self) -> usize {
        self.inputs.read().len() + self.processors.read().len() + self.outputs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register<T: RunningPlugin>(
        &self,
        set: &RwLock<Vec<Arc<T>>>,
        handle: &Arc<T>,
        lifecycle: &Lifecycle,
    ) -> AgentResult<()> {
        if self.closing.load(Ordering::Acquire) {
            return Err(AgentError::ShuttingDown);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if !lifecycle.register(id) {
            return Err(AgentError::AlreadyStarted {
                name: handle.name(),
                id: lifecycle.id(),
            });
        }
        set.write().push(handle.clone());
        debug!(plugin = %handle.name(), id = %handle.plugin_id(), "Plugin registered");
        Ok(())
    }

    /// Removes a handle from its set and marks it dead.
    fn reap<T: RunningPlugin>(set: &RwLock<Vec<Arc<T>>>, handle: &Arc<T>, lifecycle: &Lifecycle) {
        set.write().retain(|h| !Arc::ptr_eq(h, handle));
        lifecycle.mark_dead();
        info!(plugin = %handle.name(), id = %handle.plugin_id(), "Plugin stopped");
    }

    fn stop<T: RunningPlugin>(
        &self,
        set: &RwLock<Vec<Arc<T>>>,
        handle: &Arc<T>,
        lifecycle: &Lifecycle,
    ) -> StopHandle {
        let status = lifecycle.subscribe();
        if lifecycle.begin_stop() {
            info!(plugin = %handle.name(), id = %handle.plugin_id(), "Stopping plugin");
            // Never scheduled: nothing else will reap it.
            if !lifecycle.is_scheduled() {
                Self::reap(set, handle, lifecycle);
            }
        }
        StopHandle::new(lifecycle.id(), status)
    }

    // ─── Inputs ─────────────────────────────────────────────────────────────

    pub fn start_input(&self, input: &Arc<RunningInput>) -> AgentResult<()> {
        self.register(&self.inputs, input, &input.lifecycle)
    }

    /// Spawns the gather loop. Must be called from within a tokio runtime.
    pub fn run_input(self: &Arc<Self>, input: Arc<RunningInput>) {
        if !input.lifecycle.mark_scheduled() {
            warn!(plugin = %input.name(), "Input is already scheduled");
            return;
        }
        let agent = self.clone();
        tokio::spawn(async move { agent.input_loop(input).await });
    }

    pub fn stop_input(&self, input: &Arc<RunningInput>) -> StopHandle {
        self.stop(&self.inputs, input, &input.lifecycle)
    }

    async fn input_loop(self: Arc<Self>, input: Arc<RunningInput>) {
        let config = input.config();
        let interval = period(config.interval.as_std(), self.settings.interval);
        let jitter = non_zero(
            config.collection_jitter.as_std(),
            self.settings.collection_jitter,
        );

        input.lifecycle.mark_running();
        info!(
            plugin = %input.name(),
            id = %input.plugin_id(),
            interval = ?interval,
            "Input running"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = input.lifecycle.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if !jitter.is_zero() {
                let delay = rand::thread_rng().gen_range(Duration::ZERO..=jitter);
                tokio::select! {
                    _ = input.lifecycle.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let (metrics, result) = input.gather();
            if let Err(e) = result {
                error!(plugin = %input.name(), id = %input.plugin_id(), error = %e, "Gather failed");
            }
            self.route(metrics);
        }

        Self::reap(&self.inputs, &input, &input.lifecycle);
    }

    // ─── Processors ─────────────────────────────────────────────────────────

    pub fn start_processor(&self, processor: &Arc<RunningProcessor>) -> AgentResult<()> {
        self.register(&self.processors, processor, &processor.lifecycle)
    }

    /// Spawns the processor task. Aggregators push on their period; plain
    /// processors work inline and the task only tracks the lifecycle.
    pub fn run_processor(self: &Arc<Self>, processor: Arc<RunningProcessor>) {
        if !processor.lifecycle.mark_scheduled() {
            warn!(plugin = %processor.name(), "Processor is already scheduled");
            return;
        }
        let agent = self.clone();
        tokio::spawn(async move { agent.processor_loop(processor).await });
    }

    pub fn stop_processor(&self, processor: &Arc<RunningProcessor>) -> StopHandle {
        self.stop(&self.processors, processor, &processor.lifecycle)
    }

    async fn processor_loop(self: Arc<Self>, processor: Arc<RunningProcessor>) {
        processor.lifecycle.mark_running();
        info!(plugin = %processor.name(), id = %processor.plugin_id(), "Processor running");

        if processor.is_aggregator() {
            let every = period(processor.config().period.as_std(), self.settings.flush_interval);
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = processor.lifecycle.cancelled() => break,
                    _ = ticker.tick() => self.deliver(processor.push()),
                }
            }
            self.deliver(processor.push());
        } else {
            processor.lifecycle.cancelled().await;
        }

        Self::reap(&self.processors, &processor, &processor.lifecycle);
    }

    // ─── Outputs ────────────────────────────────────────────────────────────

    pub fn start_output(&self, output: &Arc<RunningOutput>) -> AgentResult<()> {
        self.register(&self.outputs, output, &output.lifecycle)
    }

    /// Spawns the flush loop.
    pub fn run_output(self: &Arc<Self>, output: Arc<RunningOutput>) {
        if !output.lifecycle.mark_scheduled() {
            warn!(plugin = %output.name(), "Output is already scheduled");
            return;
        }
        let agent = self.clone();
        tokio::spawn(async move { agent.output_loop(output).await });
    }

    pub fn stop_output(&self, output: &Arc<RunningOutput>) -> StopHandle {
        self.stop(&self.outputs, output, &output.lifecycle)
    }

    async fn output_loop(self: Arc<Self>, output: Arc<RunningOutput>) {
        if let Err(e) = output.connect() {
            error!(plugin = %output.name(), id = %output.plugin_id(), error = %e, "Connect failed");
            Self::reap(&self.outputs, &output, &output.lifecycle);
            return;
        }

        let interval = period(
            output.config().flush_interval.as_std(),
            self.settings.flush_interval,
        );
        output.lifecycle.mark_running();
        info!(
            plugin = %output.name(),
            id = %output.plugin_id(),
            flush_interval = ?interval,
            "Output running"
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = output.lifecycle.cancelled() => break,
                _ = ticker.tick() => Self::flush(&output),
            }
        }

        Self::flush(&output);
        if let Err(e) = output.close() {
            warn!(plugin = %output.name(), error = %e, "Close failed");
        }
        Self::reap(&self.outputs, &output, &output.lifecycle);
    }

    fn flush(output: &RunningOutput) {
        match output.flush() {
            Ok(0) => {}
            Ok(n) => debug!(plugin = %output.name(), written = n, "Flushed metrics"),
            Err(e) => error!(
                plugin = %output.name(),
                id = %output.plugin_id(),
                buffered = output.buffered(),
                error = %e,
                "Write failed"
            ),
        }
    }

    // ─── Pipeline ───────────────────────────────────────────────────────────

    /// Runs gathered metrics through the processor chain, then to the outputs.
    pub fn route(&self, mut metrics: Vec<Metric>) {
        if metrics.is_empty() {
            return;
        }
        let mut chain = self.running_processors();
        chain.sort_by_key(|p| p.config().order);
        for processor in &chain {
            metrics = processor.apply(metrics);
            if metrics.is_empty() {
                return;
            }
        }
        self.deliver(metrics);
    }

    /// Buffers metrics in every output.
    fn deliver(&self, metrics: Vec<Metric>) {
        if metrics.is_empty() {
            return;
        }
        let outputs = self.running_outputs();
        for output in &outputs {
            for metric in &metrics {
                output.add_metric(metric.clone());
            }
        }
    }

    // ─── Shutdown ───────────────────────────────────────────────────────────

    /// Stops every plugin, inputs first and outputs last so buffered metrics
    /// are flushed. New plugins are refused from here on.
    pub async fn shutdown(&self, timeout: Duration) -> AgentResult<()> {
        self.closing.store(true, Ordering::Release);
        info!(plugins = self.len(), "Shutting down agent");

        let inputs: Vec<StopHandle> = self
            .running_inputs()
            .iter()
            .map(|i| self.stop_input(i))
            .collect();
        wait_all(inputs, timeout).await?;

        let processors: Vec<StopHandle> = self
            .running_processors()
            .iter()
            .map(|p| self.stop_processor(p))
            .collect();
        wait_all(processors, timeout).await?;

        let outputs: Vec<StopHandle> = self
            .running_outputs()
            .iter()
            .map(|o| self.stop_output(o))
            .collect();
        wait_all(outputs, timeout).await
    }
}

/// Shortest tick accepted by the scheduling loops.
const MIN_PERIOD: Duration = Duration::from_millis(1);

fn period(value: Duration, fallback: Duration) -> Duration {
    non_zero(value, fallback).max(MIN_PERIOD)
}

async fn wait_all(handles: Vec<StopHandle>, timeout: Duration) -> AgentResult<()> {
    for handle in handles {
        handle.wait(timeout).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio_test::{assert_err, assert_ok};
    use vane_core::{
        Accumulator, Configurable, FieldValue, Input, Output, PluginResult, Processor,
    };

    use super::*;
    use crate::models::{InputConfig, OutputConfig, ProcessorConfig};

    static WRITTEN: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default, Configurable)]
    pub struct Constant {
        pub value: i64,
    }

    impl Input for Constant {
        fn gather(&mut self, acc: &mut Accumulator) -> PluginResult<()> {
            acc.push(Metric::new("constant").with_field("value", self.value));
            Ok(())
        }
    }

    #[derive(Default, Configurable)]
    pub struct Double {}

    impl Processor for Double {
        fn apply(&mut self, metrics: Vec<Metric>) -> Vec<Metric> {
            metrics
                .into_iter()
                .map(|mut m| {
                    if let Some(FieldValue::Integer(v)) = m.fields.get_mut("value") {
                        *v *= 2;
                    }
                    m
                })
                .collect()
        }
    }

    #[derive(Default, Configurable)]
    pub struct Counting {}

    impl Output for Counting {
        fn write(&mut self, metrics: &[Metric]) -> PluginResult<()> {
            WRITTEN.fetch_add(metrics.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    fn settings() -> AgentSettings {
        AgentSettings {
            interval: Duration::from_millis(20),
            flush_interval: Duration::from_millis(20),
            omit_hostname: true,
            ..Default::default()
        }
    }

    async fn wait_for_status<T: RunningPlugin>(handle: &T, status: PluginStatus) {
        let deadline = Instant::now() + Duration::from_secs(1);
        while handle.status() != status {
            assert!(Instant::now() < deadline, "timed out waiting for {status}");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_input_lifecycle() {
        let agent = Agent::new(settings());
        let input = Arc::new(RunningInput::new(
            Box::new(Constant { value: 1 }),
            InputConfig::new("constant"),
        ));

        assert_eq!(input.status(), PluginStatus::Unknown);
        agent.start_input(&input).unwrap();
        assert_eq!(input.status(), PluginStatus::Created);
        assert_ne!(input.id(), 0);
        assert_eq!(agent.running_inputs().len(), 1);

        agent.run_input(input.clone());
        wait_for_status(&*input, PluginStatus::Running).await;

        let stop = agent.stop_input(&input);
        stop.wait(Duration::from_millis(300)).await.unwrap();
        assert_eq!(input.status(), PluginStatus::Dead);
        assert!(agent.running_inputs().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let agent = Agent::new(settings());
        let a = Arc::new(RunningInput::new(Box::new(Constant::default()), InputConfig::new("a")));
        let b = Arc::new(RunningInput::new(Box::new(Constant::default()), InputConfig::new("b")));
        agent.start_input(&a).unwrap();
        agent.start_input(&b).unwrap();
        assert_ne!(a.id(), b.id());

        assert!(matches!(
            agent.start_input(&a),
            Err(AgentError::AlreadyStarted { .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_before_run_reaps_immediately() {
        let agent = Agent::new(settings());
        let output = Arc::new(RunningOutput::new(
            Box::new(Counting::default()),
            OutputConfig::new("counting"),
            10,
            100,
        ));
        agent.start_output(&output).unwrap();

        let stop = agent.stop_output(&output);
        assert!(stop.is_stopped());
        assert!(agent.running_outputs().is_empty());
    }

    #[tokio::test]
    async fn test_metrics_flow_through_processors_to_outputs() {
        let agent = Agent::new(settings());

        let output = Arc::new(RunningOutput::new(
            Box::new(Counting::default()),
            OutputConfig::new("counting"),
            10,
            100,
        ));
        agent.start_output(&output).unwrap();

        let processor = Arc::new(RunningProcessor::new(
            Box::new(Double::default()),
            ProcessorConfig::new("double"),
        ));
        agent.start_processor(&processor).unwrap();

        agent.route(vec![Metric::new("constant").with_field("value", 21i64)]);
        assert_eq!(output.buffered(), 1);

        agent.run_output(output.clone());
        wait_for_status(&*output, PluginStatus::Running).await;
        agent.stop_output(&output).wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(output.written(), 1);
        assert!(WRITTEN.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_plugins() {
        let agent = Agent::new(settings());
        let input = Arc::new(RunningInput::new(Box::new(Constant::default()), InputConfig::new("c")));
        agent.start_input(&input).unwrap();
        agent.run_input(input.clone());

        assert_ok!(agent.shutdown(Duration::from_secs(1)).await);
        assert!(agent.is_empty());
        assert_eq!(input.status(), PluginStatus::Dead);

        let late = Arc::new(RunningInput::new(Box::new(Constant::default()), InputConfig::new("c")));
        let err = assert_err!(agent.start_input(&late));
        assert!(matches!(err, AgentError::ShuttingDown));
    }

    #[tokio::test]
    async fn test_stop_handle_times_out() {
        let (_tx, rx) = watch::channel(PluginStatus::Stopping);
        let err = StopHandle::new(9, rx)
            .wait(Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::StopTimeout { id: 9, .. }));
    }
}
