//! The force kernel.
//!
//! [`ForceEngine::compute`] turns a [`RegistrySnapshot`] into one force vector per
//! agent, in snapshot order. Per tick it:
//!
//! 1. rebuilds the pairwise [`DistanceMatrix`],
//! 2. sums separation, cohesion and predator/prey terms and caps that group at
//!    `max_force`,
//! 3. sums centre attraction, confinement and rotation and caps that group at
//!    `max_environment_force`,
//! 4. returns the sum of the two capped groups.
//!
//! The engine reads only the snapshot it is given and its own parameters; it never
//! touches the registry.

pub mod environment;
pub mod flocking;
pub mod predation;

use crate::config::{ForceConfig, SimConfig, SpeciesTable};
use crate::error::Result;
use crate::numeric::{limit_magnitude, DistanceMatrix};
use biotope_data::{ForceFrame, RegistrySnapshot, Species, Vec2};
use environment::EnvironmentParams;
use predation::PredationParams;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Wall-clock cost of each phase of one [`ForceEngine::compute_profiled`] call.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceTimings {
    pub distances: Duration,
    pub flocking: Duration,
    pub predation: Duration,
    pub environment: Duration,
    pub total: Duration,
}

/// Uncapped per-term forces, exposed for diagnostics and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForceBreakdown {
    pub separation: Vec<Vec2>,
    pub cohesion: Vec<Vec2>,
    pub predation: Vec<Vec2>,
    pub environment: Vec<Vec2>,
}

impl ForceBreakdown {
    /// Applies both caps and sums the groups.
    #[must_use]
    pub fn combine(&self, config: &ForceConfig) -> Vec<Vec2> {
        (0..self.separation.len())
            .into_par_iter()
            .map(|i| {
                let interaction = self.separation[i] + self.cohesion[i] + self.predation[i];
                limit_magnitude(interaction, config.max_force)
                    + limit_magnitude(self.environment[i], config.max_environment_force)
            })
            .collect()
    }
}

pub struct ForceEngine {
    config: ForceConfig,
    species: SpeciesTable,
    distances: DistanceMatrix,
}

impl ForceEngine {
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        Self::with_parts(config.forces.clone(), config.species.clone())
    }

    #[must_use]
    pub fn with_parts(config: ForceConfig, species: SpeciesTable) -> Self {
        Self {
            config,
            species,
            distances: DistanceMatrix::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ForceConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ForceConfig {
        &mut self.config
    }

    #[must_use]
    pub fn species_table(&self) -> &SpeciesTable {
        &self.species
    }

    /// Live override of one tunable parameter; takes effect on the next compute.
    pub fn set_param(&mut self, name: &str, value: f32) -> Result<()> {
        self.config.set_named(name, value)?;
        tracing::debug!(name, value, "Force parameter updated");
        Ok(())
    }

    /// Forces for every agent in `snapshot`, index-aligned with its arrays.
    ///
    /// An empty snapshot yields an empty vector.
    pub fn compute(&mut self, snapshot: &RegistrySnapshot) -> Vec<Vec2> {
        self.compute_profiled(snapshot).0
    }

    /// [`compute`](Self::compute), tagged with the snapshot's tick, ids and structure
    /// version. `agent_ids` always has one entry per force.
    pub fn compute_frame(&mut self, snapshot: &RegistrySnapshot) -> ForceFrame {
        self.compute_frame_profiled(snapshot).0
    }

    pub fn compute_frame_profiled(
        &mut self,
        snapshot: &RegistrySnapshot,
    ) -> (ForceFrame, ForceTimings) {
        let (forces, timings) = self.compute_profiled(snapshot);
        let agent_ids = snapshot.agent_ids[..forces.len()].to_vec();
        let frame = ForceFrame {
            tick: snapshot.tick,
            agent_ids,
            forces,
            structure_version: snapshot.structure_version,
        };
        (frame, timings)
    }

    /// [`compute`](Self::compute) plus how long each phase took.
    pub fn compute_profiled(&mut self, snapshot: &RegistrySnapshot) -> (Vec<Vec2>, ForceTimings) {
        let start = Instant::now();
        let mut timings = ForceTimings::default();
        let (positions, species) = aligned(snapshot);
        if positions.is_empty() {
            return (Vec::new(), timings);
        }

        let t = Instant::now();
        self.distances.rebuild(positions);
        timings.distances = t.elapsed();

        let breakdown = self.breakdown_timed(positions, species, &mut timings);
        let forces = breakdown.combine(&self.config);

        timings.total = start.elapsed();
        (forces, timings)
    }

    /// Every uncapped term for `snapshot`.
    pub fn breakdown(&mut self, snapshot: &RegistrySnapshot) -> ForceBreakdown {
        let (positions, species) = aligned(snapshot);
        self.distances.rebuild(positions);
        self.breakdown_timed(positions, species, &mut ForceTimings::default())
    }

    fn breakdown_timed(
        &self,
        positions: &[Vec2],
        species: &[Species],
        timings: &mut ForceTimings,
    ) -> ForceBreakdown {
        let c = &self.config;

        let t = Instant::now();
        let separation = flocking::separation(
            positions,
            &self.distances,
            c.separation_distance,
            c.separation_weight,
        );
        let cohesion = flocking::cohesion(
            positions,
            &self.distances,
            c.cohesion_distance,
            c.cohesion_weight,
        );
        timings.flocking = t.elapsed();

        let t = Instant::now();
        let predation = predation::predator_prey(
            positions,
            species,
            &self.distances,
            &self.species,
            &PredationParams {
                escape_distance: c.escape_distance,
                escape_weight: c.escape_weight,
                chase_distance: c.chase_distance,
                chase_weight: c.chase_weight,
            },
        );
        timings.predation = t.elapsed();

        let t = Instant::now();
        let environment = environment::environment(
            positions,
            &EnvironmentParams {
                center: c.world_center,
                radius: c.world_radius,
                center_attraction_weight: c.center_attraction_weight,
                confinement_weight: c.confinement_weight,
                rotation_strength: c.rotation_strength,
            },
        );
        timings.environment = t.elapsed();

        ForceBreakdown {
            separation,
            cohesion,
            predation,
            environment,
        }
    }
}

/// Positions and species cut to the length all three snapshot arrays share.
fn aligned(snapshot: &RegistrySnapshot) -> (&[Vec2], &[Species]) {
    let positions = snapshot.positions.len();
    let species = snapshot.species.len();
    let ids = snapshot.agent_ids.len();
    let n = positions.min(species).min(ids);
    if positions != n || species != n || ids != n {
        tracing::warn!(
            positions,
            species,
            ids,
            used = n,
            "Snapshot arrays disagree on length, extra entries ignored"
        );
    }
    (&snapshot.positions[..n], &snapshot.species[..n])
}
