//! Deterministic RNG utilities for reproducible tests.

use comtube_mpc::LinearDynamics;
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// `rows x cols` matrix with entries drawn uniformly from `[-scale, scale)`.
pub fn random_matrix<R: Rng + ?Sized>(
    rng: &mut R,
    rows: usize,
    cols: usize,
    scale: f64,
) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| rng.random_range(-scale..scale))
}

/// Random `(A, B)` pair with `state_dim` states and `control_dim` controls.
///
/// Entries of `A` stay below `1 / state_dim` in magnitude so that powers of
/// `A` remain well scaled over long horizons.
#[allow(clippy::cast_precision_loss)]
pub fn random_dynamics(state_dim: usize, control_dim: usize, seed: u64) -> LinearDynamics {
    let mut rng = seeded_rng(seed);
    let a = random_matrix(&mut rng, state_dim, state_dim, 1.0 / state_dim as f64);
    let b = random_matrix(&mut rng, state_dim, control_dim, 1.0);
    LinearDynamics::new(a, b)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
