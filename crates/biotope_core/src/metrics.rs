//! Runtime metrics for the pipeline stages.
//!
//! Stages share one [`Metrics`] through an `Arc`; every field is atomic or behind a
//! mutex so recording never needs `&mut`.

use crate::forces::ForceTimings;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Shared metrics collector.
pub struct Metrics {
    tick_count: AtomicU64,
    agent_count: AtomicU64,
    log_interval: u64,
    force_nanos: [AtomicU64; 5],
    force_samples: AtomicU64,
    pub counters: Mutex<HashMap<String, AtomicU64>>,
}

/// Averages over every profiled force computation so far.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceTimingSummary {
    pub samples: u64,
    pub avg_distances_us: f64,
    pub avg_flocking_us: f64,
    pub avg_predation_us: f64,
    pub avg_environment_us: f64,
    pub avg_total_us: f64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::with_log_interval(1000)
    }

    /// A collector that logs a summary line every `log_interval` ticks. Zero disables it.
    #[must_use]
    pub fn with_log_interval(log_interval: u64) -> Self {
        Self {
            tick_count: AtomicU64::new(0),
            agent_count: AtomicU64::new(0),
            log_interval,
            force_nanos: Default::default(),
            force_samples: AtomicU64::new(0),
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Records a completed ecosystem tick.
    pub fn record_tick(&self, duration: Duration, agents: usize) {
        let tick = self.tick_count.fetch_add(1, Ordering::Relaxed) + 1;
        self.agent_count.store(agents as u64, Ordering::Relaxed);

        if self.log_interval > 0 && tick.is_multiple_of(self.log_interval) {
            let forces = self.force_summary();
            tracing::info!(
                tick,
                agents,
                duration_ms = duration.as_millis() as u64,
                force_avg_us = forces.avg_total_us,
                "Simulation tick"
            );
        }
    }

    /// Adds one profiled force computation to the running averages.
    pub fn record_forces(&self, timings: &ForceTimings) {
        let phases = [
            timings.distances,
            timings.flocking,
            timings.predation,
            timings.environment,
            timings.total,
        ];
        for (slot, phase) in self.force_nanos.iter().zip(phases) {
            slot.fetch_add(phase.as_nanos() as u64, Ordering::Relaxed);
        }
        self.force_samples.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn force_summary(&self) -> ForceTimingSummary {
        let samples = self.force_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return ForceTimingSummary::default();
        }
        let avg = |i: usize| {
            self.force_nanos[i].load(Ordering::Relaxed) as f64 / samples as f64 / 1_000.0
        };
        ForceTimingSummary {
            samples,
            avg_distances_us: avg(0),
            avg_flocking_us: avg(1),
            avg_predation_us: avg(2),
            avg_environment_us: avg(3),
            avg_total_us: avg(4),
        }
    }

    pub fn increment_counter(&self, name: &str) {
        self.add_to_counter(name, 1);
    }

    pub fn add_to_counter(&self, name: &str, amount: u64) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(amount, Ordering::Relaxed);
    }

    /// Current value of a named counter, zero if it was never touched.
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Copy of every counter, sorted by name.
    #[must_use]
    pub fn counters_snapshot(&self) -> Vec<(String, u64)> {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<_> = counters
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();
        out.sort();
        out
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn agent_count(&self) -> u64 {
        self.agent_count.load(Ordering::Relaxed)
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_level` when set. Calling this twice is harmless.
pub fn init_logging(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .finish(),
    )
    .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.tick_count(), 0);
        assert_eq!(metrics.force_summary(), ForceTimingSummary::default());
    }

    #[test]
    fn test_record_tick() {
        let metrics = Metrics::with_log_interval(1);
        metrics.record_tick(Duration::from_millis(16), 100);
        assert_eq!(metrics.tick_count(), 1);
        assert_eq!(metrics.agent_count(), 100);
    }

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.increment_counter("stale_frames");
        metrics.increment_counter("stale_frames");
        metrics.add_to_counter("births", 5);
        assert_eq!(metrics.counter("stale_frames"), 2);
        assert_eq!(metrics.counter("births"), 5);
        assert_eq!(metrics.counter("deaths"), 0);
        assert_eq!(
            metrics.counters_snapshot(),
            vec![("births".to_string(), 5), ("stale_frames".to_string(), 2)]
        );
    }

    #[test]
    fn test_force_summary_averages() {
        let metrics = Metrics::new();
        let timings = |us: u64| ForceTimings {
            distances: Duration::from_micros(us),
            flocking: Duration::from_micros(us),
            predation: Duration::from_micros(us),
            environment: Duration::from_micros(us),
            total: Duration::from_micros(4 * us),
        };
        metrics.record_forces(&timings(10));
        metrics.record_forces(&timings(30));
        let summary = metrics.force_summary();
        assert_eq!(summary.samples, 2);
        assert!((summary.avg_distances_us - 20.0).abs() < 1e-9);
        assert!((summary.avg_total_us - 80.0).abs() < 1e-9);
    }
}
