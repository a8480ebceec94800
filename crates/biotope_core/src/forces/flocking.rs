//! Separation and cohesion over the shared distance matrix.

use crate::numeric::{DistanceMatrix, EPSILON};
use biotope_data::Vec2;
use rayon::prelude::*;

/// Mean of `(p_i - p_j) / (D_ij + ε)` over neighbours with `0 < D_ij < distance`,
/// times `weight`. Zero when no neighbour qualifies.
///
/// Coincident agents (`D_ij == 0`) are not neighbours, so they never push each other.
#[must_use]
pub fn separation(
    positions: &[Vec2],
    distances: &DistanceMatrix,
    distance: f32,
    weight: f32,
) -> Vec<Vec2> {
    positions
        .par_iter()
        .enumerate()
        .map(|(i, &pi)| {
            let mut sum = Vec2::ZERO;
            let mut count = 0u32;
            for (j, &d) in distances.row(i).iter().enumerate() {
                if d > 0.0 && d < distance {
                    sum += (pi - positions[j]) / (d + EPSILON);
                    count += 1;
                }
            }
            if count > 0 {
                sum / count as f32 * weight
            } else {
                Vec2::ZERO
            }
        })
        .collect()
}

/// `(centroid - p_i) * weight`, where the centroid is taken over neighbours with
/// `0 < D_ij < distance`. Zero when no neighbour qualifies.
#[must_use]
pub fn cohesion(
    positions: &[Vec2],
    distances: &DistanceMatrix,
    distance: f32,
    weight: f32,
) -> Vec<Vec2> {
    positions
        .par_iter()
        .enumerate()
        .map(|(i, &pi)| {
            let mut sum = Vec2::ZERO;
            let mut count = 0u32;
            for (j, &d) in distances.row(i).iter().enumerate() {
                if d > 0.0 && d < distance {
                    sum += positions[j];
                    count += 1;
                }
            }
            if count > 0 {
                (sum / count as f32 - pi) * weight
            } else {
                Vec2::ZERO
            }
        })
        .collect()
}
