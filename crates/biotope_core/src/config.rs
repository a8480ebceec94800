//! Typed simulation configuration.
//!
//! [`SimConfig`] is read once from a [`TraitTable`] at startup and then handed by
//! reference (or `Arc`) to the registry, the force engine and the pipeline stages.
//! Every trait the core needs is looked up here, so a missing or malformed trait fails
//! at startup instead of in the middle of a tick.
//!
//! ## Configuration Hierarchy
//!
//! 1. Built-in trait values ([`TraitTable::builtin`])
//! 2. A `traits.toml` file (replaces the built-in table)
//! 3. Live overrides of force parameters ([`ForceConfig::set_named`])

use crate::error::{CoreError, Result};
use crate::trait_table::TraitTable;
use biotope_data::{Species, Vec2, SPECIES_COUNT};
use serde::{Deserialize, Serialize};

/// World geometry and population bounds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    /// Added to half the shorter side to get the confinement radius.
    pub radius_margin: f32,
    pub max_agents: usize,
    pub initial_agents: usize,
    pub initial_velocity_min: f32,
    pub initial_velocity_max: f32,
}

impl WorldConfig {
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    #[must_use]
    pub fn radius(&self) -> f32 {
        self.width.min(self.height) / 2.0 + self.radius_margin
    }
}

/// Weights and thresholds of the force model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ForceConfig {
    pub separation_distance: f32,
    pub separation_weight: f32,
    pub cohesion_distance: f32,
    pub cohesion_weight: f32,
    pub escape_distance: f32,
    pub escape_weight: f32,
    pub chase_distance: f32,
    pub chase_weight: f32,
    /// Cap for the flocking + predation group.
    pub max_force: f32,
    /// Cap for the environment group.
    pub max_environment_force: f32,
    pub center_attraction_weight: f32,
    pub confinement_weight: f32,
    pub rotation_strength: f32,
    pub world_center: Vec2,
    pub world_radius: f32,
}

impl ForceConfig {
    /// Names accepted by [`set_named`](Self::set_named).
    pub const TUNABLE: [&'static str; 13] = [
        "separation_distance",
        "separation_weight",
        "cohesion_distance",
        "cohesion_weight",
        "escape_distance",
        "escape_weight",
        "chase_distance",
        "chase_weight",
        "max_force",
        "max_environment_force",
        "center_attraction_weight",
        "confinement_weight",
        "rotation_strength",
    ];

    /// Applies a live override by field name.
    pub fn set_named(&mut self, name: &str, value: f32) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(CoreError::invalid_value(
                name,
                f64::from(value),
                "force parameters must be finite and non-negative",
            ));
        }
        let slot = match name {
            "separation_distance" => &mut self.separation_distance,
            "separation_weight" => &mut self.separation_weight,
            "cohesion_distance" => &mut self.cohesion_distance,
            "cohesion_weight" => &mut self.cohesion_weight,
            "escape_distance" => &mut self.escape_distance,
            "escape_weight" => &mut self.escape_weight,
            "chase_distance" => &mut self.chase_distance,
            "chase_weight" => &mut self.chase_weight,
            "max_force" => &mut self.max_force,
            "max_environment_force" => &mut self.max_environment_force,
            "center_attraction_weight" => &mut self.center_attraction_weight,
            "confinement_weight" => &mut self.confinement_weight,
            "rotation_strength" => &mut self.rotation_strength,
            _ => return Err(CoreError::unknown_trait(name)),
        };
        *slot = value;
        Ok(())
    }
}

/// Fixed per-species lookup tables, indexed by [`Species::table_index`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpeciesTable {
    pub predator: [Species; SPECIES_COUNT],
    pub prey: [Species; SPECIES_COUNT],
    pub mass: [f32; SPECIES_COUNT],
    pub radius: [f32; SPECIES_COUNT],
    pub linear_damping: [f32; SPECIES_COUNT],
}

impl SpeciesTable {
    #[inline]
    #[must_use]
    pub fn predator_of(&self, species: Species) -> Species {
        self.predator[species.table_index()]
    }

    #[inline]
    #[must_use]
    pub fn prey_of(&self, species: Species) -> Species {
        self.prey[species.table_index()]
    }

    #[inline]
    #[must_use]
    pub fn mass(&self, species: Species) -> f32 {
        self.mass[species.table_index()]
    }

    #[inline]
    #[must_use]
    pub fn radius(&self, species: Species) -> f32 {
        self.radius[species.table_index()]
    }

    #[inline]
    #[must_use]
    pub fn linear_damping(&self, species: Species) -> f32 {
        self.linear_damping[species.table_index()]
    }

    fn from_traits(traits: &TraitTable) -> Result<Self> {
        let mut table = Self {
            predator: [SPECIES_ONE; SPECIES_COUNT],
            prey: [SPECIES_ONE; SPECIES_COUNT],
            mass: [0.0; SPECIES_COUNT],
            radius: [0.0; SPECIES_COUNT],
            linear_damping: [0.0; SPECIES_COUNT],
        };
        for species in Species::all() {
            let i = species.table_index();
            table.predator[i] = traits.get_species_reference("PREDATOR_SPECIES", species)?;
            table.prey[i] = traits.get_species_reference("PREY_SPECIES", species)?;
            table.mass[i] = traits.get_species_trait_value("MASS", species)? as f32;
            table.radius[i] = traits.get_species_trait_value("RADIUS", species)? as f32;
            table.linear_damping[i] =
                traits.get_species_trait_value("LINEAR_DAMPING", species)? as f32;
        }
        Ok(table)
    }
}

const SPECIES_ONE: Species = match Species::new(1) {
    Some(species) => species,
    None => unreachable!(),
};

/// Cadence of the stage pipeline and the reference ecosystem churn.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Physics step in seconds.
    pub dt: f32,
    pub ecosystem_hz: f32,
    pub render_fps: f32,
    pub poll_timeout_ms: u64,
    pub metrics_log_interval: u64,
    pub birth_rate: f64,
    pub death_rate: f64,
}

/// Everything the core reads from configuration, resolved once.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub forces: ForceConfig,
    pub species: SpeciesTable,
    pub pipeline: PipelineConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        match Self::from_traits(&TraitTable::builtin()) {
            Ok(config) => config,
            Err(e) => unreachable!("built-in trait table is invalid: {e}"),
        }
    }
}

impl SimConfig {
    /// Resolves every required trait, failing on the first missing or invalid one.
    pub fn from_traits(traits: &TraitTable) -> Result<Self> {
        let f = |name: &str| traits.get_trait_value(name).map(|v| v as f32);
        let count = |name: &str| -> Result<usize> {
            let v = traits.get_trait_value(name)?;
            if v < 0.0 || v.fract() != 0.0 {
                return Err(CoreError::invalid_value(
                    name,
                    v,
                    "must be a non-negative integer",
                ));
            }
            Ok(v as usize)
        };

        let world = WorldConfig {
            width: f("WORLD_WIDTH")?,
            height: f("WORLD_HEIGHT")?,
            radius_margin: f("WORLD_RADIUS_MARGIN")?,
            max_agents: count("MAX_AGENTS_NUM")?,
            initial_agents: count("INITIAL_AGENTS_NUM")?,
            initial_velocity_min: f("INITIAL_VELOCITY_MIN")?,
            initial_velocity_max: f("INITIAL_VELOCITY_MAX")?,
        };

        let max_force = f("MAX_FORCE")?;
        let forces = ForceConfig {
            separation_distance: f("SEPARATION_DISTANCE")?,
            separation_weight: f("SEPARATION_WEIGHT")?,
            cohesion_distance: f("COHESION_DISTANCE")?,
            cohesion_weight: f("COHESION_WEIGHT")?,
            escape_distance: f("ESCAPE_DISTANCE")?,
            escape_weight: f("ESCAPE_WEIGHT")?,
            chase_distance: f("CHASE_DISTANCE")?,
            chase_weight: f("CHASE_WEIGHT")?,
            max_force,
            max_environment_force: traits
                .get_optional_trait_value("MAX_ENVIRONMENT_FORCE")?
                .map_or(max_force, |v| v as f32),
            center_attraction_weight: f("CENTER_ATTRACTION_WEIGHT")?,
            confinement_weight: f("CONFINEMENT_WEIGHT")?,
            rotation_strength: f("ROTATION_STRENGTH")?,
            world_center: world.center(),
            world_radius: world.radius(),
        };

        let pipeline = PipelineConfig {
            dt: f("DT")?,
            ecosystem_hz: f("ECOSYSTEM_HZ")?,
            render_fps: f("RENDER_FPS")?,
            poll_timeout_ms: count("POLL_TIMEOUT_MS")? as u64,
            metrics_log_interval: count("METRICS_LOG_INTERVAL")? as u64,
            birth_rate: traits.get_trait_value("BIRTH_RATE")?,
            death_rate: traits.get_trait_value("DEATH_RATE")?,
        };

        let config = Self {
            world,
            forces,
            species: SpeciesTable::from_traits(traits)?,
            pipeline,
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks that a single trait range cannot express.
    ///
    /// # Validation Rules
    /// - World dimensions are positive and finite
    /// - The initial population fits in the registry
    /// - Distances, weights and caps are non-negative
    /// - Cadences are positive
    pub fn validate(&self) -> Result<()> {
        let w = &self.world;
        ensure(
            w.width > 0.0 && w.height > 0.0 && w.width.is_finite() && w.height.is_finite(),
            "World dimensions must be positive",
        )?;
        ensure(
            w.initial_agents <= w.max_agents,
            "Initial agent count exceeds MAX_AGENTS_NUM",
        )?;
        ensure(
            w.max_agents <= u32::MAX as usize,
            "MAX_AGENTS_NUM does not fit agent ids",
        )?;
        ensure(
            w.initial_velocity_min <= w.initial_velocity_max,
            "INITIAL_VELOCITY_MIN must not exceed INITIAL_VELOCITY_MAX",
        )?;

        let fc = &self.forces;
        let scalars = [
            fc.separation_distance,
            fc.separation_weight,
            fc.cohesion_distance,
            fc.cohesion_weight,
            fc.escape_distance,
            fc.escape_weight,
            fc.chase_distance,
            fc.chase_weight,
            fc.max_force,
            fc.max_environment_force,
            fc.center_attraction_weight,
            fc.confinement_weight,
            fc.rotation_strength,
        ];
        ensure(
            scalars.iter().all(|v| v.is_finite() && *v >= 0.0),
            "Force weights and thresholds must be finite and non-negative",
        )?;

        for species in Species::all() {
            ensure(
                self.species.mass(species) > 0.0,
                "Species mass must be positive",
            )?;
            ensure(
                self.species.linear_damping(species) >= 0.0,
                "Linear damping must be non-negative",
            )?;
        }

        let p = &self.pipeline;
        ensure(p.dt > 0.0, "DT must be positive")?;
        ensure(p.ecosystem_hz > 0.0, "ECOSYSTEM_HZ must be positive")?;
        ensure(p.render_fps > 0.0, "RENDER_FPS must be positive")?;
        ensure(p.poll_timeout_ms > 0, "POLL_TIMEOUT_MS must be positive")?;
        ensure(
            (0.0..=1.0).contains(&p.birth_rate) && (0.0..=1.0).contains(&p.death_rate),
            "Birth and death rates must be in [0.0, 1.0]",
        )?;
        Ok(())
    }

    /// Loads a trait table from a TOML file and resolves it.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Self::from_traits(&TraitTable::load(path)?)
    }

    /// Stable hash of the behaviour-relevant sections, for logs and reports.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.world).as_bytes());
        hasher.update(format!("{:?}", self.forces).as_bytes());
        hasher.update(format!("{:?}", self.species).as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn ensure(condition: bool, msg: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(CoreError::validation(msg))
    }
}
