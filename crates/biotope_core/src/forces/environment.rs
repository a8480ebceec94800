//! Environment forces: centre attraction, soft circular confinement and a swirl.
//!
//! These depend only on an agent's own position, not on the distance matrix.

use crate::numeric::normalize_or_zero;
use biotope_data::Vec2;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentParams {
    pub center: Vec2,
    pub radius: f32,
    pub center_attraction_weight: f32,
    pub confinement_weight: f32,
    pub rotation_strength: f32,
}

/// Environment force on a single agent.
#[inline]
#[must_use]
pub fn environment_force(position: Vec2, params: &EnvironmentParams) -> Vec2 {
    let to_center = params.center - position;
    let distance = to_center.length();
    let inward = normalize_or_zero(to_center);

    let attraction = inward * params.center_attraction_weight;

    let confinement = if distance > params.radius {
        inward * (params.confinement_weight * (distance - params.radius))
    } else {
        Vec2::ZERO
    };

    let rotation = normalize_or_zero((position - params.center).perp()) * params.rotation_strength;

    attraction + confinement + rotation
}

#[must_use]
pub fn environment(positions: &[Vec2], params: &EnvironmentParams) -> Vec<Vec2> {
    positions
        .par_iter()
        .map(|&p| environment_force(p, params))
        .collect()
}
