//! Physics collaborator: integrates forces into positions and velocities.
//!
//! [`EulerPhysics`] keeps its bodies in a dense vector and applies lifecycle events
//! with the same swap-delete rule as the registry. As long as both sides have applied
//! the same events (equal structure versions) their slot orders are identical and
//! position frames can be written back positionally.

use biotope_core::SpeciesTable;
use biotope_data::{AgentId, ForceFrame, InitPayload, LifecycleEvent, PositionFrame, Species, Vec2};
use std::collections::HashMap;

pub trait PhysicsWorld: Send {
    /// Replaces every body with the startup population.
    fn init(&mut self, payload: &InitPayload);

    fn apply_event(&mut self, event: &LifecycleEvent);

    /// Sets the force on each body named in `frame`. Bodies not in the frame, or added
    /// after the frame's snapshot was taken, get none.
    fn apply_forces(&mut self, frame: &ForceFrame);

    fn step(&mut self, dt: f32);

    fn position_frame(&self, tick: u64) -> PositionFrame;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Body {
    id: AgentId,
    position: Vec2,
    velocity: Vec2,
    force: Vec2,
    /// Structure version right after this body was added.
    born_at: u64,
    inv_mass: f32,
    damping: f32,
}

/// Semi-implicit Euler with Box2D-style linear damping.
pub struct EulerPhysics {
    species: SpeciesTable,
    bodies: Vec<Body>,
    slot_of: HashMap<AgentId, usize>,
    structure_version: u64,
}

impl EulerPhysics {
    pub fn new(species: SpeciesTable) -> Self {
        Self {
            species,
            bodies: Vec::new(),
            slot_of: HashMap::new(),
            structure_version: 0,
        }
    }

    pub fn structure_version(&self) -> u64 {
        self.structure_version
    }

    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.bodies.iter().map(|b| b.id)
    }

    fn body(
        &self,
        id: AgentId,
        species: Species,
        position: Vec2,
        velocity: Vec2,
        born_at: u64,
    ) -> Body {
        Body {
            id,
            position,
            velocity,
            force: Vec2::ZERO,
            born_at,
            inv_mass: 1.0 / self.species.mass(species),
            damping: self.species.linear_damping(species),
        }
    }

    fn push(&mut self, body: Body) {
        self.slot_of.insert(body.id, self.bodies.len());
        self.bodies.push(body);
    }
}

impl PhysicsWorld for EulerPhysics {
    fn init(&mut self, payload: &InitPayload) {
        self.bodies.clear();
        self.slot_of.clear();
        for i in 0..payload.count() {
            let body = self.body(
                payload.agent_ids[i],
                payload.species[i],
                payload.positions[i],
                payload.velocities.get(i).copied().unwrap_or(Vec2::ZERO),
                payload.structure_version,
            );
            self.push(body);
        }
        self.structure_version = payload.structure_version;
    }

    fn apply_event(&mut self, event: &LifecycleEvent) {
        match *event {
            LifecycleEvent::Added {
                id,
                species,
                position,
                velocity,
            } => {
                let born_at = self.structure_version + 1;
                let body = self.body(id, species, position, velocity, born_at);
                self.push(body);
            }
            LifecycleEvent::Removed { id } => {
                let Some(slot) = self.slot_of.remove(&id) else {
                    tracing::warn!(agent = %id, "Physics asked to remove unknown body");
                    return;
                };
                self.bodies.swap_remove(slot);
                if let Some(moved) = self.bodies.get(slot) {
                    self.slot_of.insert(moved.id, slot);
                }
            }
        }
        self.structure_version += 1;
    }

    fn apply_forces(&mut self, frame: &ForceFrame) {
        let aligned = frame.structure_version == self.structure_version
            && frame.agent_ids.len() == self.bodies.len()
            && frame.forces.len() == self.bodies.len()
            && self.bodies.iter().zip(&frame.agent_ids).all(|(b, &id)| b.id == id);

        if aligned {
            for (body, &force) in self.bodies.iter_mut().zip(&frame.forces) {
                body.force = force;
            }
            return;
        }

        for body in &mut self.bodies {
            body.force = Vec2::ZERO;
        }
        for (id, &force) in frame.agent_ids.iter().zip(&frame.forces) {
            let Some(&slot) = self.slot_of.get(id) else {
                continue;
            };
            let body = &mut self.bodies[slot];
            if body.born_at <= frame.structure_version {
                body.force = force;
            }
        }
    }

    fn step(&mut self, dt: f32) {
        for body in &mut self.bodies {
            body.velocity += body.force * (body.inv_mass * dt);
            body.velocity = body.velocity * (1.0 / (1.0 + body.damping * dt));
            body.position += body.velocity * dt;
        }
    }

    fn position_frame(&self, tick: u64) -> PositionFrame {
        PositionFrame {
            tick,
            agent_ids: self.bodies.iter().map(|b| b.id).collect(),
            positions: self.bodies.iter().map(|b| b.position).collect(),
            velocities: self.bodies.iter().map(|b| b.velocity).collect(),
            structure_version: self.structure_version,
        }
    }

    fn len(&self) -> usize {
        self.bodies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biotope_core::{AgentRegistry, SimConfig};

    fn s(raw: u8) -> Species {
        Species::new(raw).unwrap()
    }

    fn physics() -> EulerPhysics {
        EulerPhysics::new(SimConfig::default().species)
    }

    #[test]
    fn test_mirrors_registry_order() {
        let mut registry = AgentRegistry::new(8);
        for i in 0..5 {
            registry.add(s(1), Vec2::new(i as f32, 0.0));
        }
        let mut world = physics();
        world.init(&registry.init_payload());

        let victims = [AgentId(1), AgentId(4), AgentId(0)];
        for id in victims {
            registry.remove(id);
            world.apply_event(&LifecycleEvent::Removed { id });
        }
        let id = registry.add(s(3), Vec2::new(9.0, 9.0)).unwrap();
        world.apply_event(&LifecycleEvent::Added {
            id,
            species: s(3),
            position: Vec2::new(9.0, 9.0),
            velocity: Vec2::ZERO,
        });

        assert_eq!(world.structure_version(), registry.structure_version());
        assert_eq!(world.ids().collect::<Vec<_>>(), registry.available_ids());
    }

    #[test]
    fn test_step_integrates_and_damps() {
        let mut world = physics();
        world.apply_event(&LifecycleEvent::Added {
            id: AgentId(0),
            species: s(1),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
        });
        world.apply_forces(&ForceFrame {
            tick: 0,
            agent_ids: vec![AgentId(0)],
            forces: vec![Vec2::new(10.0, 0.0)],
            structure_version: 1,
        });
        world.step(0.1);
        let frame = world.position_frame(1);
        // Species 1 has mass 1.0 and damping 0.5: v = 1.0 / 1.05.
        let v = 1.0 / 1.05;
        assert!((frame.velocities[0].x - v).abs() < 1e-5);
        assert!((frame.positions[0].x - v * 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_forces_by_id_when_out_of_order() {
        let mut world = physics();
        for i in 0..3 {
            world.apply_event(&LifecycleEvent::Added {
                id: AgentId(i),
                species: s(1),
                position: Vec2::ZERO,
                velocity: Vec2::ZERO,
            });
        }
        world.apply_forces(&ForceFrame {
            tick: 0,
            agent_ids: vec![AgentId(2), AgentId(7)],
            forces: vec![Vec2::new(0.0, 5.0), Vec2::new(1.0, 1.0)],
            structure_version: 3,
        });
        world.step(1.0);
        let frame = world.position_frame(0);
        assert_eq!(frame.velocities[0], Vec2::ZERO);
        assert!(frame.velocities[2].y > 0.0);
    }

    #[test]
    fn test_stale_forces_skip_recycled_body() {
        let mut world = physics();
        let added = |id: u32, x: f32| LifecycleEvent::Added {
            id: AgentId(id),
            species: s(1),
            position: Vec2::new(x, 0.0),
            velocity: Vec2::ZERO,
        };
        world.apply_event(&added(0, 0.0));
        world.apply_event(&added(1, 5.0));
        let stale = ForceFrame {
            tick: 0,
            agent_ids: vec![AgentId(0), AgentId(1)],
            forces: vec![Vec2::new(100.0, 0.0), Vec2::new(0.0, 100.0)],
            structure_version: world.structure_version(),
        };
        world.apply_event(&LifecycleEvent::Removed { id: AgentId(1) });
        world.apply_event(&added(1, 50.0));

        world.apply_forces(&stale);
        world.step(1.0);
        let frame = world.position_frame(1);
        assert_eq!(frame.agent_ids, vec![AgentId(0), AgentId(1)]);
        assert!(frame.velocities[0].x > 0.0);
        assert_eq!(frame.velocities[1], Vec2::ZERO);
        assert_eq!(frame.positions[1], Vec2::new(50.0, 0.0));
    }

    #[test]
    fn test_unknown_removal_keeps_version() {
        let mut world = physics();
        world.apply_event(&LifecycleEvent::Removed { id: AgentId(3) });
        assert_eq!(world.structure_version(), 0);
        assert!(world.is_empty());
    }
}
