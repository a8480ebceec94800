//! Numeric building blocks shared by the force kernel.
//!
//! The pairwise [`DistanceMatrix`] is the dominant per-tick cost (O(N²)), so it is
//! stored flat, reused across ticks and filled row-parallel with Rayon.

use biotope_data::Vec2;
use rayon::prelude::*;

/// Guard added to magnitudes before dividing by them.
pub const EPSILON: f32 = 1e-5;

/// Scales `v` down so that its magnitude does not exceed `max`.
///
/// `scale = min(max / (|v| + ε), 1)`. Vectors at or under the cap are returned
/// bit-for-bit unchanged, and a zero vector stays zero.
#[inline]
#[must_use]
pub fn limit_magnitude(v: Vec2, max: f32) -> Vec2 {
    let len = v.length();
    if len <= max {
        v
    } else {
        v * (max / (len + EPSILON)).min(1.0)
    }
}

/// `v / (|v| + ε)`: close to a unit vector, zero for a zero input, never a division by
/// exact zero.
#[inline]
#[must_use]
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    v / (v.length() + EPSILON)
}

/// Dense, symmetric N×N matrix of Euclidean distances with a zero diagonal.
///
/// Rows are stored contiguously: `D[i][j]` lives at `i * n + j`. The backing buffer is
/// kept between calls to [`rebuild`](Self::rebuild) so steady-state ticks do not
/// allocate.
#[derive(Debug, Clone, Default)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f32>,
}

impl DistanceMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the matrix for `positions` from scratch.
    #[must_use]
    pub fn from_positions(positions: &[Vec2]) -> Self {
        let mut matrix = Self::new();
        matrix.rebuild(positions);
        matrix
    }

    /// Recomputes every entry for a new set of positions.
    pub fn rebuild(&mut self, positions: &[Vec2]) {
        let n = positions.len();
        self.n = n;
        self.data.clear();
        self.data.resize(n * n, 0.0);
        if n == 0 {
            return;
        }

        self.data
            .par_chunks_mut(n)
            .enumerate()
            .for_each(|(i, row)| {
                let pi = positions[i];
                for (d, &pj) in row.iter_mut().zip(positions) {
                    *d = pi.distance(pj);
                }
                row[i] = 0.0;
            });
    }

    /// Number of agents the matrix was built for.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.n + j]
    }

    /// All distances from agent `i`.
    #[inline]
    #[must_use]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.n..(i + 1) * self.n]
    }
}
