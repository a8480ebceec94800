//! Ecosystem logic: who is born and who dies.
//!
//! Logic never touches the registry directly. It goes through an [`EcosystemHandle`],
//! which applies the change and, once the pipeline is live, queues the matching
//! [`LifecycleEvent`] for physics. Seeding before startup uses a silent handle because
//! physics learns about the initial population from the init payload instead.

use biotope_core::{AgentRegistry, SimConfig, WorldConfig};
use biotope_data::{AgentId, LifecycleEvent, Species, Vec2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Running totals of structural changes requested by ecosystem logic.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChurnStats {
    pub adds: u64,
    pub removes: u64,
    pub add_rejected: u64,
    pub remove_unknown: u64,
}

/// Mutable view of the registry handed to [`EcosystemLogic`].
pub struct EcosystemHandle<'a> {
    registry: &'a mut AgentRegistry,
    events: Option<&'a mut Vec<LifecycleEvent>>,
    stats: &'a mut ChurnStats,
}

impl<'a> EcosystemHandle<'a> {
    /// Handle whose changes are reported as lifecycle events.
    pub fn notifying(
        registry: &'a mut AgentRegistry,
        events: &'a mut Vec<LifecycleEvent>,
        stats: &'a mut ChurnStats,
    ) -> Self {
        Self {
            registry,
            events: Some(events),
            stats,
        }
    }

    /// Handle for bulk seeding before the init payload is built.
    pub fn silent(registry: &'a mut AgentRegistry, stats: &'a mut ChurnStats) -> Self {
        Self {
            registry,
            events: None,
            stats,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        self.registry
    }

    pub fn add_agent(
        &mut self,
        species: Species,
        position: Vec2,
        velocity: Vec2,
    ) -> Option<AgentId> {
        let Some(id) = self.registry.add_with_velocity(species, position, velocity) else {
            self.stats.add_rejected += 1;
            tracing::warn!(
                capacity = self.registry.capacity(),
                %species,
                "Registry at capacity, birth dropped"
            );
            return None;
        };
        self.stats.adds += 1;
        if let Some(events) = self.events.as_deref_mut() {
            events.push(LifecycleEvent::Added {
                id,
                species,
                position,
                velocity,
            });
        }
        Some(id)
    }

    pub fn remove_agent(&mut self, id: AgentId) -> bool {
        if !self.registry.remove(id).is_removed() {
            self.stats.remove_unknown += 1;
            tracing::warn!(agent = %id, "Removal of unknown agent ignored");
            return false;
        }
        self.stats.removes += 1;
        if let Some(events) = self.events.as_deref_mut() {
            events.push(LifecycleEvent::Removed { id });
        }
        true
    }
}

/// Decides births and deaths. Runs on the ecosystem stage only.
pub trait EcosystemLogic: Send {
    /// Fills the registry before the pipeline starts.
    fn seed(&mut self, handle: &mut EcosystemHandle<'_>);

    /// One live tick.
    fn step(&mut self, handle: &mut EcosystemHandle<'_>, tick: u64);
}

/// Seeded random births and deaths at fixed per-tick probabilities.
pub struct RandomChurn {
    rng: ChaCha8Rng,
    world: WorldConfig,
    species: Vec<Species>,
    birth_rate: f64,
    death_rate: f64,
}

impl RandomChurn {
    pub fn new(config: &SimConfig, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            world: config.world.clone(),
            species: Species::all().collect(),
            birth_rate: config.pipeline.birth_rate,
            death_rate: config.pipeline.death_rate,
        }
    }

    fn random_agent(&mut self) -> (Species, Vec2, Vec2) {
        let species = self.species[self.rng.gen_range(0..self.species.len())];
        let position = Vec2::new(
            self.rng.gen_range(0.0..=self.world.width),
            self.rng.gen_range(0.0..=self.world.height),
        );
        let (lo, hi) = (
            self.world.initial_velocity_min,
            self.world.initial_velocity_max,
        );
        let velocity = Vec2::new(self.rng.gen_range(lo..=hi), self.rng.gen_range(lo..=hi));
        (species, position, velocity)
    }
}

impl EcosystemLogic for RandomChurn {
    fn seed(&mut self, handle: &mut EcosystemHandle<'_>) {
        for _ in 0..self.world.initial_agents {
            let (species, position, velocity) = self.random_agent();
            if handle.add_agent(species, position, velocity).is_none() {
                break;
            }
        }
        tracing::info!(agents = handle.registry().len(), "Registry seeded");
    }

    fn step(&mut self, handle: &mut EcosystemHandle<'_>, tick: u64) {
        if self.rng.gen_bool(self.birth_rate) {
            let (species, position, velocity) = self.random_agent();
            if let Some(id) = handle.add_agent(species, position, velocity) {
                tracing::trace!(tick, agent = %id, %species, "Birth");
            }
        }

        let living = handle.registry().available_ids();
        if !living.is_empty() && self.rng.gen_bool(self.death_rate) {
            let id = living[self.rng.gen_range(0..living.len())];
            if handle.remove_agent(id) {
                tracing::trace!(tick, agent = %id, "Death");
            }
        }
    }
}
