//! Dense agent registry with O(1) add and swap-delete removal.
//!
//! Per-agent state lives in parallel arrays (struct-of-arrays). Active agents always
//! occupy slots `0..len()` with no gaps; removing slot `i` moves the last active agent
//! into `i`. Ids come from a monotonic counter and are recycled through a free list only
//! after removal, which bounds every id below `capacity()` and lets the id→slot map be
//! a flat vector.

use crate::config::WorldConfig;
use biotope_data::{AgentId, InitPayload, RegistrySnapshot, RenderFrame, Species, Vec2};

/// Outcome of [`AgentRegistry::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The agent was removed from `slot`. `relocated` names the agent that was moved
    /// from the tail into that slot, if any.
    Removed {
        slot: usize,
        relocated: Option<AgentId>,
    },
    /// The id is not currently active. Nothing changed.
    NotFound,
}

impl RemoveOutcome {
    #[must_use]
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }
}

/// Outcome of a bulk position or velocity write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionUpdate {
    /// Every active slot was written.
    Applied { count: usize },
    /// Counts disagreed; only the first `applied` slots were written.
    Partial {
        applied: usize,
        expected: usize,
        received: usize,
    },
}

impl PositionUpdate {
    #[must_use]
    pub fn applied(&self) -> usize {
        match *self {
            Self::Applied { count } => count,
            Self::Partial { applied, .. } => applied,
        }
    }

    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial { .. })
    }
}

/// Full attribute tuple of one active agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentRecord {
    pub id: AgentId,
    pub species: Species,
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Single source of truth for which agents exist and where they are.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    max_agents: usize,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    species: Vec<Species>,
    agent_ids: Vec<AgentId>,
    /// `slot_of[id]` is the slot holding `id`, or `None` while the id is free.
    slot_of: Vec<Option<u32>>,
    /// `born_at[id]` is the structure version right after `id` was last added.
    born_at: Vec<u64>,
    free_ids: Vec<AgentId>,
    next_id: u32,
    structure_version: u64,
}

impl AgentRegistry {
    #[must_use]
    pub fn new(max_agents: usize) -> Self {
        Self {
            max_agents,
            positions: Vec::with_capacity(max_agents),
            velocities: Vec::with_capacity(max_agents),
            species: Vec::with_capacity(max_agents),
            agent_ids: Vec::with_capacity(max_agents),
            slot_of: Vec::with_capacity(max_agents),
            born_at: Vec::with_capacity(max_agents),
            free_ids: Vec::new(),
            next_id: 0,
            structure_version: 0,
        }
    }

    #[must_use]
    pub fn from_config(world: &WorldConfig) -> Self {
        Self::new(world.max_agents)
    }

    /// Current number of active agents.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.agent_ids.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agent_ids.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_agents
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() >= self.max_agents
    }

    /// Number of successful adds and removes so far.
    #[must_use]
    pub fn structure_version(&self) -> u64 {
        self.structure_version
    }

    /// Adds an agent at rest. Returns `None` when the registry is full.
    pub fn add(&mut self, species: Species, position: Vec2) -> Option<AgentId> {
        self.add_with_velocity(species, position, Vec2::ZERO)
    }

    /// Adds an agent into slot `len()`. Returns `None` when the registry is full.
    ///
    /// Positions are not bounds-checked; world boundaries belong to physics.
    pub fn add_with_velocity(
        &mut self,
        species: Species,
        position: Vec2,
        velocity: Vec2,
    ) -> Option<AgentId> {
        if self.is_full() {
            tracing::debug!(capacity = self.max_agents, "Registry full, add rejected");
            return None;
        }

        let id = match self.free_ids.pop() {
            Some(id) => id,
            None => {
                let id = AgentId(self.next_id);
                self.next_id += 1;
                self.slot_of.push(None);
                self.born_at.push(0);
                id
            }
        };

        let slot = self.len();
        self.positions.push(position);
        self.velocities.push(velocity);
        self.species.push(species);
        self.agent_ids.push(id);
        self.slot_of[id.index()] = Some(slot as u32);
        self.structure_version += 1;
        self.born_at[id.index()] = self.structure_version;
        Some(id)
    }

    /// Removes an agent by swapping the last active agent into its slot.
    pub fn remove(&mut self, id: AgentId) -> RemoveOutcome {
        let Some(slot) = self.index_of(id) else {
            tracing::debug!(agent = %id, "Remove of inactive agent ignored");
            return RemoveOutcome::NotFound;
        };

        let last = self.len() - 1;
        self.positions.swap_remove(slot);
        self.velocities.swap_remove(slot);
        self.species.swap_remove(slot);
        self.agent_ids.swap_remove(slot);

        let relocated = if slot != last {
            let moved = self.agent_ids[slot];
            self.slot_of[moved.index()] = Some(slot as u32);
            Some(moved)
        } else {
            None
        };

        self.slot_of[id.index()] = None;
        self.free_ids.push(id);
        self.structure_version += 1;
        RemoveOutcome::Removed { slot, relocated }
    }

    /// Slot currently holding `id`, if it is active.
    #[inline]
    #[must_use]
    pub fn index_of(&self, id: AgentId) -> Option<usize> {
        self.slot_of
            .get(id.index())
            .copied()
            .flatten()
            .map(|slot| slot as usize)
    }

    #[must_use]
    pub fn contains(&self, id: AgentId) -> bool {
        self.index_of(id).is_some()
    }

    /// Structure version at which the current holder of `id` was added.
    #[must_use]
    pub fn born_at(&self, id: AgentId) -> Option<u64> {
        self.index_of(id).map(|_| self.born_at[id.index()])
    }

    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<AgentRecord> {
        self.index_of(id).map(|slot| self.record_at(slot))
    }

    /// Attribute tuple at `slot`. Panics if `slot >= len()`.
    #[must_use]
    pub fn record_at(&self, slot: usize) -> AgentRecord {
        AgentRecord {
            id: self.agent_ids[slot],
            species: self.species[slot],
            position: self.positions[slot],
            velocity: self.velocities[slot],
        }
    }

    #[must_use]
    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    #[must_use]
    pub fn velocities(&self) -> &[Vec2] {
        &self.velocities
    }

    #[must_use]
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// Ids of every active agent, in slot order.
    #[must_use]
    pub fn available_ids(&self) -> &[AgentId] {
        &self.agent_ids
    }

    /// Owned copy of the active agents, isolated from later mutation.
    #[must_use]
    pub fn snapshot(&self, tick: u64) -> RegistrySnapshot {
        RegistrySnapshot {
            tick,
            positions: self.positions.clone(),
            species: self.species.clone(),
            agent_ids: self.agent_ids.clone(),
            structure_version: self.structure_version,
        }
    }

    /// Startup payload for physics and rendering.
    #[must_use]
    pub fn init_payload(&self) -> InitPayload {
        InitPayload {
            positions: self.positions.clone(),
            velocities: self.velocities.clone(),
            species: self.species.clone(),
            agent_ids: self.agent_ids.clone(),
            structure_version: self.structure_version,
        }
    }

    #[must_use]
    pub fn render_frame(&self, tick: u64) -> RenderFrame {
        RenderFrame {
            tick,
            positions: self.positions.clone(),
            agent_ids: self.agent_ids.clone(),
        }
    }

    /// Overwrites positions slot by slot.
    ///
    /// A length that differs from `len()` is tolerated: the first
    /// `min(len, positions.len())` slots are written and the mismatch is reported.
    pub fn update_positions(&mut self, positions: &[Vec2]) -> PositionUpdate {
        overwrite_prefix(&mut self.positions, positions, "positions")
    }

    /// Same policy as [`update_positions`](Self::update_positions), for velocities.
    pub fn update_velocities(&mut self, velocities: &[Vec2]) -> PositionUpdate {
        overwrite_prefix(&mut self.velocities, velocities, "velocities")
    }

    /// Writes positions and velocities by agent id.
    ///
    /// Used when the producer's slot order is known to differ from ours. `as_of` is the
    /// structure version the producer had applied; ids that are inactive, or whose
    /// current holder was added after `as_of`, are skipped because the values belong to
    /// an earlier agent. Returns the number of agents written.
    pub fn update_positions_by_id(
        &mut self,
        ids: &[AgentId],
        positions: &[Vec2],
        velocities: &[Vec2],
        as_of: u64,
    ) -> usize {
        let mut applied = 0;
        for (i, (&id, &position)) in ids.iter().zip(positions).enumerate() {
            let Some(slot) = self.index_of(id) else {
                continue;
            };
            if self.born_at[id.index()] > as_of {
                tracing::trace!(agent = %id, as_of, "Skipping stale state for recycled id");
                continue;
            }
            self.positions[slot] = position;
            if let Some(&velocity) = velocities.get(i) {
                self.velocities[slot] = velocity;
            }
            applied += 1;
        }
        applied
    }

    /// Checks the structural invariants, describing the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let n = self.len();
        if n > self.max_agents {
            return Err(format!("count {n} exceeds capacity {}", self.max_agents));
        }
        if self.positions.len() != n || self.velocities.len() != n || self.species.len() != n
        {
            return Err("parallel arrays disagree on length".into());
        }
        for (slot, &id) in self.agent_ids.iter().enumerate() {
            if self.index_of(id) != Some(slot) {
                return Err(format!("{id} at slot {slot} maps to {:?}", self.index_of(id)));
            }
        }
        if self.born_at.len() != self.slot_of.len() {
            return Err("born_at and slot_of disagree on length".into());
        }
        let mapped = self.slot_of.iter().filter(|s| s.is_some()).count();
        if mapped != n {
            return Err(format!("{mapped} ids mapped but {n} agents active"));
        }
        if self.free_ids.len() + n != self.next_id as usize {
            return Err(format!(
                "{} free + {n} active != {} issued",
                self.free_ids.len(),
                self.next_id
            ));
        }
        Ok(())
    }
}

fn overwrite_prefix(dst: &mut [Vec2], src: &[Vec2], what: &'static str) -> PositionUpdate {
    let expected = dst.len();
    let received = src.len();
    let applied = expected.min(received);
    dst[..applied].copy_from_slice(&src[..applied]);
    if expected == received {
        PositionUpdate::Applied { count: applied }
    } else {
        tracing::warn!(
            expected,
            received,
            applied,
            what,
            "Count mismatch on bulk update, applied partially"
        );
        PositionUpdate::Partial {
            applied,
            expected,
            received,
        }
    }
}
