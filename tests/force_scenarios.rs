mod common;

use biotope_core::{ForceEngine, SimConfig};
use biotope_data::Vec2;
use common::{quiet_config, snapshot_of};

#[test]
fn test_predator_and_prey_five_units_apart() {
    let mut config = quiet_config();
    config.forces.separation_weight = 0.0;
    config.forces.cohesion_weight = 0.0;
    config.forces.escape_distance = 10.0;
    config.forces.chase_distance = 10.0;
    let mut engine = ForceEngine::new(&config);

    // Species 2 preys on species 1 in the built-in cycle.
    let snapshot = snapshot_of(&[(100.0, 100.0, 2), (105.0, 100.0, 1)]);
    let forces = engine.compute(&snapshot);

    let (hunter, prey) = (forces[0], forces[1]);
    assert!(hunter.length() > 0.0);
    assert!(hunter.x > 0.0, "chase points toward the prey");
    assert!(prey.length() > 0.0);
    assert!(prey.x > 0.0, "escape points away from the predator");
    assert!(hunter.y.abs() < 1e-4 && prey.y.abs() < 1e-4);
}

#[test]
fn test_separation_is_equal_and_opposite() {
    let mut config = quiet_config();
    config.forces.cohesion_weight = 0.0;
    let mut engine = ForceEngine::new(&config);

    let snapshot = snapshot_of(&[(500.0, 500.0, 4), (510.0, 507.0, 4)]);
    let b = engine.breakdown(&snapshot);

    let sum = b.separation[0] + b.separation[1];
    assert!(sum.length() < 1e-4);
    assert!(b.separation[0].length() > 0.0);
}

#[test]
fn test_lonely_agent_outside_radius() {
    let config = SimConfig::default();
    let mut engine = ForceEngine::new(&config);

    // Far outside the confinement circle, no neighbours anywhere near.
    let snapshot = snapshot_of(&[(-2000.0, 1000.0, 3), (4000.0, 1000.0, 6)]);
    let b = engine.breakdown(&snapshot);

    for i in 0..2 {
        assert_eq!(b.separation[i], Vec2::ZERO);
        assert_eq!(b.cohesion[i], Vec2::ZERO);
        assert_eq!(b.predation[i], Vec2::ZERO);
        assert!(b.environment[i].length() > 0.0);
    }
    // Confinement pushes both back toward the centre.
    assert!(b.environment[0].x > 0.0);
    assert!(b.environment[1].x < 0.0);
}

#[test]
fn test_output_is_index_aligned() {
    let config = SimConfig::default();
    let mut engine = ForceEngine::new(&config);
    let snapshot = snapshot_of(&[
        (1000.0, 1000.0, 1),
        (1010.0, 1000.0, 2),
        (1000.0, 1015.0, 3),
        (1500.0, 400.0, 8),
    ]);
    let frame = engine.compute_frame(&snapshot);
    assert_eq!(frame.forces.len(), snapshot.count());
    assert_eq!(frame.agent_ids, snapshot.agent_ids);
    assert!(frame.forces.iter().all(|f| f.is_finite()));
}

#[test]
fn test_coincident_agents_stay_finite() {
    let config = SimConfig::default();
    let mut engine = ForceEngine::new(&config);
    let snapshot = snapshot_of(&[(1000.0, 1000.0, 1), (1000.0, 1000.0, 2), (1000.0, 1000.0, 1)]);
    let forces = engine.compute(&snapshot);
    assert!(forces.iter().all(|f| f.is_finite()));
}
