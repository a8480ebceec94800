use biotope_core::AgentRegistry;
use biotope_data::{AgentId, Species, Vec2};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Op {
    Add(u8, f32, f32),
    /// Remove the agent at `pick % len`, if any.
    RemoveLive(usize),
    /// Remove an id that may or may not be active.
    RemoveRaw(u32),
}

prop_compose! {
    fn arb_add()(s in 1u8..=8, x in -500.0f32..500.0, y in -500.0f32..500.0) -> Op {
        Op::Add(s, x, y)
    }
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => arb_add(),
        2 => any::<usize>().prop_map(Op::RemoveLive),
        1 => (0u32..64).prop_map(Op::RemoveRaw),
    ]
}

fn apply(registry: &mut AgentRegistry, op: &Op) {
    match *op {
        Op::Add(s, x, y) => {
            if let Some(species) = Species::new(s) {
                registry.add(species, Vec2::new(x, y));
            }
        }
        Op::RemoveLive(pick) => {
            if !registry.is_empty() {
                let id = registry.available_ids()[pick % registry.len()];
                registry.remove(id);
            }
        }
        Op::RemoveRaw(raw) => {
            registry.remove(AgentId(raw));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_registry_invariants_hold(
        capacity in 0usize..32,
        ops in prop::collection::vec(arb_op(), 0..200)
    ) {
        let mut registry = AgentRegistry::new(capacity);
        for op in &ops {
            apply(&mut registry, op);

            prop_assert!(registry.len() <= capacity);
            prop_assert_eq!(registry.check_invariants(), Ok(()));

            let unique: HashSet<_> = registry.available_ids().iter().collect();
            prop_assert_eq!(unique.len(), registry.len(), "active ids must be unique");
            for (slot, &id) in registry.available_ids().iter().enumerate() {
                prop_assert_eq!(registry.index_of(id), Some(slot));
                prop_assert!(id.index() < capacity.max(1));
            }
        }
    }

    #[test]
    fn test_add_remove_round_trip(
        capacity in 1usize..32,
        prefill in 0usize..32,
        s in 1u8..=8
    ) {
        let mut registry = AgentRegistry::new(capacity);
        let species = Species::new(s).unwrap();
        for i in 0..prefill.min(capacity - 1) {
            registry.add(species, Vec2::new(i as f32, 0.0));
        }
        let count = registry.len();

        let id = registry.add(species, Vec2::ZERO).unwrap();
        prop_assert!(registry.remove(id).is_removed());
        prop_assert_eq!(registry.len(), count);
        prop_assert_eq!(registry.add(species, Vec2::ZERO), Some(id));
    }
}
