//! Payloads exchanged between pipeline stages.
//!
//! Every frame is an owned copy of the arrays it carries. Stages never share mutable
//! state; they hand each other these values (usually behind an `Arc`).

use super::agent::{AgentId, Species, Vec2};
use serde::{Deserialize, Serialize};

/// Point-in-time copy of the active agents, in registry slot order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub tick: u64,
    pub positions: Vec<Vec2>,
    pub species: Vec<Species>,
    pub agent_ids: Vec<AgentId>,
    /// Registry structure version the snapshot was taken at.
    pub structure_version: u64,
}

impl RegistrySnapshot {
    #[must_use]
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Full startup state for the physics and render collaborators.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct InitPayload {
    pub positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
    pub species: Vec<Species>,
    pub agent_ids: Vec<AgentId>,
    /// Registry structure version the payload was taken at.
    pub structure_version: u64,
}

impl InitPayload {
    #[must_use]
    pub fn count(&self) -> usize {
        self.positions.len()
    }
}

/// Net force per agent, parallel to the snapshot it was computed from.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ForceFrame {
    pub tick: u64,
    pub agent_ids: Vec<AgentId>,
    pub forces: Vec<Vec2>,
    /// Structure version of the snapshot the forces were computed from.
    pub structure_version: u64,
}

impl ForceFrame {
    #[must_use]
    pub fn count(&self) -> usize {
        self.forces.len()
    }
}

/// Integrated body state published by the physics collaborator.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PositionFrame {
    pub tick: u64,
    pub agent_ids: Vec<AgentId>,
    pub positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
    /// Number of lifecycle events the physics side had applied when it produced the frame.
    pub structure_version: u64,
}

impl PositionFrame {
    #[must_use]
    pub fn count(&self) -> usize {
        self.positions.len()
    }
}

/// Read-only view handed to the renderer.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    pub tick: u64,
    pub positions: Vec<Vec2>,
    pub agent_ids: Vec<AgentId>,
}

impl RenderFrame {
    #[must_use]
    pub fn count(&self) -> usize {
        self.positions.len()
    }
}

/// A structural change to the population, sent once per successful add or remove.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    Added {
        id: AgentId,
        species: Species,
        position: Vec2,
        velocity: Vec2,
    },
    Removed {
        id: AgentId,
    },
}

impl LifecycleEvent {
    #[must_use]
    pub fn agent_id(&self) -> AgentId {
        match self {
            Self::Added { id, .. } | Self::Removed { id } => *id,
        }
    }
}
