#![allow(dead_code)]

use biotope_core::{AgentRegistry, SimConfig};
use biotope_data::{AgentId, RegistrySnapshot, Species, Vec2};

pub fn species(raw: u8) -> Species {
    Species::new(raw).expect("species in 1..=8")
}

/// Agents of species 1 at `(0, 0), (1, 0), ...`.
pub fn registry_with_line(capacity: usize, n: usize) -> (AgentRegistry, Vec<AgentId>) {
    let mut registry = AgentRegistry::new(capacity);
    let ids = (0..n)
        .map(|i| {
            registry
                .add(species(1), Vec2::new(i as f32, 0.0))
                .expect("capacity")
        })
        .collect();
    (registry, ids)
}

/// Default config with every environment force switched off.
pub fn quiet_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.forces.center_attraction_weight = 0.0;
    config.forces.confinement_weight = 0.0;
    config.forces.rotation_strength = 0.0;
    config
}

/// Config small and fast enough for a pipeline run inside a test.
pub fn fast_pipeline_config(initial_agents: usize) -> SimConfig {
    let mut config = SimConfig::default();
    config.world.initial_agents = initial_agents;
    config.world.max_agents = initial_agents * 2;
    config.pipeline.ecosystem_hz = 200.0;
    config.pipeline.render_fps = 200.0;
    config.pipeline.dt = 0.005;
    config.pipeline.poll_timeout_ms = 20;
    config.pipeline.birth_rate = 0.3;
    config.pipeline.death_rate = 0.3;
    config
}

pub fn snapshot_of(agents: &[(f32, f32, u8)]) -> RegistrySnapshot {
    let mut registry = AgentRegistry::new(agents.len());
    for &(x, y, s) in agents {
        registry.add(species(s), Vec2::new(x, y));
    }
    registry.snapshot(0)
}
