//! The four-stage pipeline: ecosystem → forces → physics → render.
//!
//! Each stage is its own tokio task with its own cadence and shares no mutable state
//! with the others. Frames move through latest-wins channels; lifecycle events move
//! through an unbounded queue because they must never be dropped.
//!
//! Startup: the registry is seeded, the init payload is handed to physics and render,
//! and every stage waits on a shared barrier before its first live tick.
//!
//! Within an ecosystem tick the order is fixed: apply the latest physics positions, run
//! births and deaths, snapshot, publish.

use crate::app::channel::{latest, Latest, LatestReceiver, LatestSender};
use crate::app::ecosystem::{ChurnStats, EcosystemHandle, EcosystemLogic, RandomChurn};
use crate::app::physics::{EulerPhysics, PhysicsWorld};
use crate::app::render::{RenderSink, TracingRenderSink};
use crate::app::shutdown::ShutdownSignal;
use anyhow::{Context, Result};
use biotope_core::metrics::ForceTimingSummary;
use biotope_core::{AgentRegistry, ForceEngine, Metrics, SimConfig};
use biotope_data::{ForceFrame, LifecycleEvent, PositionFrame, RegistrySnapshot, RenderFrame};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Barrier};
use tokio::time::MissedTickBehavior;

const STAGES: usize = 4;

/// Live override of one force parameter, applied between force ticks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParamUpdate {
    pub name: String,
    pub value: f32,
}

impl ParamUpdate {
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Stop after this many ecosystem ticks. `None` runs until shutdown.
    pub max_ticks: Option<u64>,
    pub seed: u64,
}

/// Summary of one pipeline run.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub config_fingerprint: String,
    pub seed: u64,
    pub ecosystem_ticks: u64,
    pub force_ticks: u64,
    pub physics_steps: u64,
    pub render_frames: u64,
    pub final_agents: usize,
    pub structure_version: u64,
    pub churn: ChurnStats,
    pub position_mismatches: u64,
    pub positions_by_id: u64,
    pub params_applied: u64,
    pub params_rejected: u64,
    pub forces: ForceTimingSummary,
    pub registry_consistent: bool,
    pub elapsed_ms: u64,
}

pub struct Pipeline {
    config: Arc<SimConfig>,
    options: PipelineOptions,
    logic: Box<dyn EcosystemLogic>,
    physics: Box<dyn PhysicsWorld>,
    render: Box<dyn RenderSink>,
    shutdown: ShutdownSignal,
    params_tx: mpsc::UnboundedSender<ParamUpdate>,
    params_rx: mpsc::UnboundedReceiver<ParamUpdate>,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    /// A pipeline with the reference collaborators: random churn, Euler physics and a
    /// tracing render sink.
    pub fn new(config: SimConfig, options: PipelineOptions) -> Self {
        let (params_tx, params_rx) = mpsc::unbounded_channel();
        Self {
            logic: Box::new(RandomChurn::new(&config, options.seed)),
            physics: Box::new(EulerPhysics::new(config.species.clone())),
            render: Box::new(TracingRenderSink::new()),
            metrics: Arc::new(Metrics::with_log_interval(
                config.pipeline.metrics_log_interval,
            )),
            config: Arc::new(config),
            options,
            shutdown: ShutdownSignal::new(),
            params_tx,
            params_rx,
        }
    }

    pub fn with_logic(mut self, logic: impl EcosystemLogic + 'static) -> Self {
        self.logic = Box::new(logic);
        self
    }

    pub fn with_physics(mut self, physics: impl PhysicsWorld + 'static) -> Self {
        self.physics = Box::new(physics);
        self
    }

    pub fn with_render(mut self, render: impl RenderSink + 'static) -> Self {
        self.render = Box::new(render);
        self
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn param_sender(&self) -> mpsc::UnboundedSender<ParamUpdate> {
        self.params_tx.clone()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Runs every stage until `max_ticks` is reached or shutdown is requested.
    pub async fn run(self) -> Result<PipelineReport> {
        let Pipeline {
            config,
            options,
            mut logic,
            mut physics,
            mut render,
            shutdown,
            params_tx,
            params_rx,
            metrics,
        } = self;
        drop(params_tx);
        let started = Instant::now();

        let mut registry = AgentRegistry::from_config(&config.world);
        let mut churn = ChurnStats::default();
        logic.seed(&mut EcosystemHandle::silent(&mut registry, &mut churn));

        let init = registry.init_payload();
        physics.init(&init);
        render.render(&registry.render_frame(0), true);
        tracing::info!(
            agents = init.count(),
            capacity = registry.capacity(),
            fingerprint = %config.fingerprint(),
            "Pipeline initialised"
        );

        let ctx = StageContext {
            config: Arc::clone(&config),
            metrics: Arc::clone(&metrics),
            shutdown: shutdown.clone(),
            barrier: Arc::new(Barrier::new(STAGES)),
        };
        let (snapshot_tx, snapshot_rx) = latest::<RegistrySnapshot>();
        let (force_tx, force_rx) = latest::<ForceFrame>();
        let (position_tx, position_rx) = latest::<PositionFrame>();
        let (render_tx, render_rx) = latest::<RenderFrame>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let ecosystem = tokio::spawn(ecosystem_stage(
            ctx.clone(),
            EcosystemState {
                registry,
                logic,
                churn,
            },
            position_rx,
            snapshot_tx,
            render_tx,
            event_tx,
            options.max_ticks,
        ));
        let forces = tokio::spawn(force_stage(
            ctx.clone(),
            ForceEngine::new(&config),
            snapshot_rx,
            force_tx,
            params_rx,
        ));
        let physics = tokio::spawn(physics_stage(
            ctx.clone(),
            physics,
            force_rx,
            event_rx,
            position_tx,
        ));
        let render = tokio::spawn(render_stage(ctx, render, render_rx));

        let ecosystem = ecosystem.await.context("ecosystem stage panicked")?;
        shutdown.request_shutdown();
        forces.await.context("force stage panicked")??;
        physics.await.context("physics stage panicked")??;
        render.await.context("render stage panicked")??;
        let EcosystemState {
            registry, churn, ..
        } = ecosystem?;

        let report = PipelineReport {
            config_fingerprint: config.fingerprint(),
            seed: options.seed,
            ecosystem_ticks: metrics.tick_count(),
            force_ticks: metrics.counter("force_ticks"),
            physics_steps: metrics.counter("physics_steps"),
            render_frames: metrics.counter("render_frames"),
            final_agents: registry.len(),
            structure_version: registry.structure_version(),
            churn,
            position_mismatches: metrics.counter("position_mismatch"),
            positions_by_id: metrics.counter("positions_by_id"),
            params_applied: metrics.counter("params_applied"),
            params_rejected: metrics.counter("params_rejected"),
            forces: metrics.force_summary(),
            registry_consistent: registry.check_invariants().is_ok(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            ticks = report.ecosystem_ticks,
            agents = report.final_agents,
            force_avg_us = report.forces.avg_total_us,
            "Pipeline finished"
        );
        tracing::debug!(counters = ?metrics.counters_snapshot(), "Stage counters");
        Ok(report)
    }
}

#[derive(Clone)]
struct StageContext {
    config: Arc<SimConfig>,
    metrics: Arc<Metrics>,
    shutdown: ShutdownSignal,
    barrier: Arc<Barrier>,
}

impl StageContext {
    fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.config.pipeline.poll_timeout_ms)
    }

    fn running(&self) -> bool {
        !self.shutdown.is_shutdown_requested()
    }
}

struct EcosystemState {
    registry: AgentRegistry,
    logic: Box<dyn EcosystemLogic>,
    churn: ChurnStats,
}

fn ticker(hz: f32) -> tokio::time::Interval {
    let period = Duration::from_secs_f32(1.0 / hz).max(Duration::from_micros(100));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn ecosystem_stage(
    ctx: StageContext,
    mut state: EcosystemState,
    mut position_rx: LatestReceiver<PositionFrame>,
    snapshot_tx: LatestSender<RegistrySnapshot>,
    render_tx: LatestSender<RenderFrame>,
    event_tx: mpsc::UnboundedSender<LifecycleEvent>,
    max_ticks: Option<u64>,
) -> Result<EcosystemState> {
    ctx.barrier.wait().await;
    let mut interval = ticker(ctx.config.pipeline.ecosystem_hz);
    let mut events = Vec::new();
    let mut tick = 0u64;

    while ctx.running() {
        if max_ticks.is_some_and(|max| tick >= max) {
            ctx.shutdown.request_shutdown();
            break;
        }
        interval.tick().await;
        let tick_start = Instant::now();
        tick += 1;

        if let Latest::Fresh(frame) = position_rx.poll() {
            apply_positions(&mut state.registry, &frame, &ctx.metrics);
        }

        state.logic.step(
            &mut EcosystemHandle::notifying(&mut state.registry, &mut events, &mut state.churn),
            tick,
        );
        for event in events.drain(..) {
            if event_tx.send(event).is_err() {
                tracing::debug!(tick, "Physics stage gone, lifecycle event dropped");
            }
        }

        snapshot_tx.publish(state.registry.snapshot(tick));
        render_tx.publish(state.registry.render_frame(tick));
        ctx.metrics
            .record_tick(tick_start.elapsed(), state.registry.len());
    }

    tracing::debug!(tick, "Ecosystem stage stopped");
    Ok(state)
}

/// Writes physics output back into the registry.
///
/// Equal structure versions mean physics has applied exactly the adds and removes the
/// registry has, so slot orders agree and a positional write is exact. Otherwise the
/// frame is matched by id, ignoring ids recycled after the frame was produced.
fn apply_positions(registry: &mut AgentRegistry, frame: &PositionFrame, metrics: &Metrics) {
    if frame.structure_version == registry.structure_version() {
        let update = registry.update_positions(&frame.positions);
        registry.update_velocities(&frame.velocities);
        if update.is_partial() {
            metrics.increment_counter("position_mismatch");
        }
    } else {
        let applied = registry.update_positions_by_id(
            &frame.agent_ids,
            &frame.positions,
            &frame.velocities,
            frame.structure_version,
        );
        metrics.increment_counter("positions_by_id");
        tracing::debug!(
            frame_version = frame.structure_version,
            registry_version = registry.structure_version(),
            applied,
            "Physics frame is behind, positions matched by id"
        );
    }
}

async fn force_stage(
    ctx: StageContext,
    mut engine: ForceEngine,
    mut snapshot_rx: LatestReceiver<RegistrySnapshot>,
    force_tx: LatestSender<ForceFrame>,
    mut params_rx: mpsc::UnboundedReceiver<ParamUpdate>,
) -> Result<()> {
    ctx.barrier.wait().await;
    let timeout = ctx.poll_timeout();

    while ctx.running() {
        let snapshot = match snapshot_rx.wait(timeout).await {
            Latest::Fresh(snapshot) => snapshot,
            Latest::Closed => break,
            Latest::Reused(_) | Latest::Empty => continue,
        };

        drain_params(&mut engine, &mut params_rx, &ctx.metrics);

        let (returned, frame, timings) = tokio::task::spawn_blocking(move || {
            let (frame, timings) = engine.compute_frame_profiled(&snapshot);
            (engine, frame, timings)
        })
        .await
        .context("force computation failed")?;
        engine = returned;

        ctx.metrics.record_forces(&timings);
        ctx.metrics.increment_counter("force_ticks");
        force_tx.publish(frame);
    }

    tracing::debug!("Force stage stopped");
    Ok(())
}

fn drain_params(
    engine: &mut ForceEngine,
    params_rx: &mut mpsc::UnboundedReceiver<ParamUpdate>,
    metrics: &Metrics,
) {
    while let Ok(update) = params_rx.try_recv() {
        match engine.set_param(&update.name, update.value) {
            Ok(()) => {
                metrics.increment_counter("params_applied");
                tracing::info!(name = %update.name, value = update.value, "Force parameter applied");
            }
            Err(e) => {
                metrics.increment_counter("params_rejected");
                tracing::warn!(name = %update.name, error = %e, "Force parameter rejected");
            }
        }
    }
}

async fn physics_stage(
    ctx: StageContext,
    mut physics: Box<dyn PhysicsWorld>,
    mut force_rx: LatestReceiver<ForceFrame>,
    mut event_rx: mpsc::UnboundedReceiver<LifecycleEvent>,
    position_tx: LatestSender<PositionFrame>,
) -> Result<()> {
    ctx.barrier.wait().await;
    let dt = ctx.config.pipeline.dt;
    let mut interval = ticker(1.0 / dt);
    let mut step = 0u64;

    while ctx.running() {
        interval.tick().await;

        while let Ok(event) = event_rx.try_recv() {
            physics.apply_event(&event);
        }
        // Forces stay on the bodies between frames, so a reused frame needs no work.
        match force_rx.poll() {
            Latest::Fresh(frame) => physics.apply_forces(&frame),
            Latest::Reused(_) => ctx.metrics.increment_counter("forces_reused"),
            Latest::Empty | Latest::Closed => {}
        }

        physics.step(dt);
        step += 1;
        ctx.metrics.increment_counter("physics_steps");
        position_tx.publish(physics.position_frame(step));
    }

    tracing::debug!(step, bodies = physics.len(), "Physics stage stopped");
    Ok(())
}

async fn render_stage(
    ctx: StageContext,
    mut sink: Box<dyn RenderSink>,
    mut render_rx: LatestReceiver<RenderFrame>,
) -> Result<()> {
    ctx.barrier.wait().await;
    let mut interval = ticker(ctx.config.pipeline.render_fps);

    while ctx.running() {
        interval.tick().await;
        match render_rx.poll() {
            Latest::Fresh(frame) => sink.render(&frame, true),
            Latest::Reused(frame) => sink.render(&frame, false),
            Latest::Empty => continue,
            Latest::Closed => break,
        }
        ctx.metrics.increment_counter("render_frames");
    }

    tracing::debug!("Render stage stopped");
    Ok(())
}
