//! # Biotope Core
//!
//! Simulation core for Biotope, an eight-species flocking and predator-prey world.
//!
//! This crate contains:
//! - The [`AgentRegistry`], a dense structure-of-arrays store of living agents with
//!   O(1) add, swap-delete and reusable ids
//! - The [`ForceEngine`], which turns a registry snapshot into per-agent forces
//!   (separation, cohesion, predator/prey, environment)
//! - Trait tables and typed configuration
//! - Metrics collection and structured logging
//!
//! ## Architecture
//!
//! The core is synchronous and owns no threads. Pipeline stages in the `biotope`
//! binary hold a registry, snapshot it, and hand the snapshot to the force engine,
//! which runs its per-agent loops on Rayon.
//!
//! ## Example
//!
//! ```
//! use biotope_core::{AgentRegistry, ForceEngine, SimConfig};
//! use biotope_data::{Species, Vec2};
//!
//! let config = SimConfig::default();
//! let mut registry = AgentRegistry::new(16);
//! let species = Species::new(1).unwrap();
//! registry.add(species, Vec2::new(990.0, 1000.0)).unwrap();
//! registry.add(species, Vec2::new(1010.0, 1000.0)).unwrap();
//!
//! let mut engine = ForceEngine::new(&config);
//! let forces = engine.compute(&registry.snapshot(0));
//! assert_eq!(forces.len(), 2);
//! ```

/// Typed configuration resolved from the trait table
pub mod config;
/// Error types for configuration and parameter updates
pub mod error;
/// Per-agent force computation
pub mod forces;
/// Metrics collection and logging setup
pub mod metrics;
/// Shared vector math and the pairwise distance matrix
pub mod numeric;
/// Dense agent storage with stable ids
pub mod registry;
/// Named trait values with per-species overrides
pub mod trait_table;

pub use config::{ForceConfig, PipelineConfig, SimConfig, SpeciesTable, WorldConfig};
pub use error::{CoreError, Result};
pub use forces::{ForceEngine, ForceTimings};
pub use metrics::{init_logging, Metrics};
pub use registry::AgentRegistry;
pub use trait_table::TraitTable;
