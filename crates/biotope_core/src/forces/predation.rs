//! Chase and escape between predator and prey species.
//!
//! Each species has exactly one predator species and one prey species. An agent flees
//! its nearest predator inside `escape_distance` and chases its nearest prey inside
//! `chase_distance`. "Nearest" is the strict minimum; on an exact tie the lowest slot
//! wins, which keeps the result deterministic for a given snapshot.

use crate::config::SpeciesTable;
use crate::numeric::{normalize_or_zero, DistanceMatrix};
use biotope_data::{Species, Vec2};
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredationParams {
    pub escape_distance: f32,
    pub escape_weight: f32,
    pub chase_distance: f32,
    pub chase_weight: f32,
}

/// Slot of the closest agent of `target` species with distance below `threshold`,
/// excluding `me`.
#[inline]
#[must_use]
pub fn nearest_of(
    row: &[f32],
    species: &[Species],
    target: Species,
    threshold: f32,
    me: usize,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (j, (&d, &s)) in row.iter().zip(species).enumerate() {
        if j == me || s != target || d >= threshold {
            continue;
        }
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((j, d)),
        }
    }
    best.map(|(j, _)| j)
}

/// Sum of the escape and chase terms for every agent.
#[must_use]
pub fn predator_prey(
    positions: &[Vec2],
    species: &[Species],
    distances: &DistanceMatrix,
    table: &SpeciesTable,
    params: &PredationParams,
) -> Vec<Vec2> {
    positions
        .par_iter()
        .enumerate()
        .map(|(i, &pi)| {
            let row = distances.row(i);
            let own = species[i];
            let mut force = Vec2::ZERO;

            if let Some(j) = nearest_of(
                row,
                species,
                table.predator_of(own),
                params.escape_distance,
                i,
            ) {
                force += normalize_or_zero(pi - positions[j]) * params.escape_weight;
            }

            if let Some(j) = nearest_of(row, species, table.prey_of(own), params.chase_distance, i)
            {
                force += normalize_or_zero(positions[j] - pi) * params.chase_weight;
            }

            force
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn s(raw: u8) -> Species {
        Species::new(raw).unwrap()
    }

    #[test]
    fn test_nearest_of_picks_minimum() {
        let row = [0.0, 5.0, 3.0, 4.0];
        let species = [s(1), s(2), s(2), s(2)];
        assert_eq!(nearest_of(&row, &species, s(2), 10.0, 0), Some(2));
        assert_eq!(nearest_of(&row, &species, s(2), 3.0, 0), None);
        assert_eq!(nearest_of(&row, &species, s(3), 10.0, 0), None);
    }

    #[test]
    fn test_nearest_of_tie_goes_to_lowest_slot() {
        let row = [0.0, 4.0, 4.0, 4.0];
        let species = [s(1), s(2), s(2), s(2)];
        assert_eq!(nearest_of(&row, &species, s(2), 10.0, 0), Some(1));
    }

    #[test]
    fn test_nearest_of_skips_self() {
        let row = [0.0, 2.0];
        let species = [s(2), s(2)];
        assert_eq!(nearest_of(&row, &species, s(2), 10.0, 0), Some(1));
    }

    #[test]
    fn test_predator_and_prey_pull() {
        let config = SimConfig::default();
        // Species 2 hunts species 1 in the built-in table.
        let positions = vec![Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0)];
        let species = vec![s(2), s(1)];
        let d = DistanceMatrix::from_positions(&positions);
        let params = PredationParams {
            escape_distance: 10.0,
            escape_weight: 2.0,
            chase_distance: 10.0,
            chase_weight: 3.0,
        };
        let f = predator_prey(&positions, &species, &d, &config.species, &params);
        assert!((f[0] - Vec2::new(3.0, 0.0)).length() < 1e-4);
        assert!((f[1] - Vec2::new(2.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_out_of_range_contributes_nothing() {
        let config = SimConfig::default();
        let positions = vec![Vec2::new(0.0, 0.0), Vec2::new(50.0, 0.0)];
        let species = vec![s(2), s(1)];
        let d = DistanceMatrix::from_positions(&positions);
        let params = PredationParams {
            escape_distance: 10.0,
            escape_weight: 2.0,
            chase_distance: 10.0,
            chase_weight: 3.0,
        };
        let f = predator_prey(&positions, &species, &d, &config.species, &params);
        assert_eq!(f, vec![Vec2::ZERO; 2]);
    }
}
