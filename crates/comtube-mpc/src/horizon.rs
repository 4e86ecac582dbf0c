//! Lifted dynamics over the preview horizon.
//!
//! Unrolling `x_{k+1} = A x_k + B u_k` over N steps gives the terminal state
//! as an affine function of the initial state and the stacked controls
//! `U = [u_0, ..., u_{N-1}]`:
//!
//! ```text
//! x_N = phi_last x_0 + psi_last U
//! phi_last = A^N
//! psi_last = [A^{N-1} B, A^{N-2} B, ..., A B, B]
//! ```

use nalgebra::{DMatrix, DVector};

use crate::dynamics::LinearDynamics;

/// Terminal-state lifted dynamics matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct LiftedDynamics {
    /// `A^N`, shape (state_dim, state_dim).
    pub phi_last: DMatrix<f64>,
    /// Stacked `A^{N-1-k} B` blocks, shape (state_dim, N * control_dim).
    pub psi_last: DMatrix<f64>,
}

impl LiftedDynamics {
    /// `x_N = phi_last x_init + psi_last U`.
    pub fn terminal_state(&self, x_init: &DVector<f64>, controls: &DVector<f64>) -> DVector<f64> {
        &self.phi_last * x_init + &self.psi_last * controls
    }
}

/// Expand `(A, B)` over `nb_steps` steps.
///
/// Each iteration first propagates everything accumulated so far by `A`,
/// then writes `B` into the current step's column block. The block written
/// at step k is therefore multiplied by `A` exactly `N-1-k` more times.
///
/// # Panics
/// If `nb_steps` is zero.
pub fn expand_horizon(dynamics: &LinearDynamics, nb_steps: usize) -> LiftedDynamics {
    assert!(nb_steps > 0, "preview horizon needs at least one step");
    let x_dim = dynamics.state_dim();
    let u_dim = dynamics.control_dim();
    let a = dynamics.a();

    let mut phi = DMatrix::identity(x_dim, x_dim);
    let mut psi = DMatrix::zeros(x_dim, nb_steps * u_dim);
    for k in 0..nb_steps {
        phi = a * &phi;
        psi = a * &psi;
        psi.columns_mut(k * u_dim, u_dim).copy_from(dynamics.b());
    }

    LiftedDynamics {
        phi_last: phi,
        psi_last: psi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_dynamics(rng: &mut ChaCha8Rng, x_dim: usize, u_dim: usize) -> LinearDynamics {
        // Entries scaled so that powers of A stay well-conditioned.
        let a = DMatrix::from_fn(x_dim, x_dim, |_, _| rng.random_range(-0.4..0.4));
        let b = DMatrix::from_fn(x_dim, u_dim, |_, _| rng.random_range(-1.0..1.0));
        LinearDynamics::new(a, b)
    }

    fn matrix_power(a: &DMatrix<f64>, n: usize) -> DMatrix<f64> {
        let mut result = DMatrix::identity(a.nrows(), a.ncols());
        for _ in 0..n {
            result = a * result;
        }
        result
    }

    #[test]
    fn phi_last_is_a_to_the_n() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for (x_dim, u_dim, n) in [(2, 1, 1), (4, 2, 5), (6, 3, 12)] {
            let dynamics = random_dynamics(&mut rng, x_dim, u_dim);
            let lifted = expand_horizon(&dynamics, n);
            assert_relative_eq!(
                lifted.phi_last,
                matrix_power(dynamics.a(), n),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn psi_blocks_are_propagated_b() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let (x_dim, u_dim, n) = (4, 2, 8);
        let dynamics = random_dynamics(&mut rng, x_dim, u_dim);
        let lifted = expand_horizon(&dynamics, n);
        assert_eq!(lifted.psi_last.shape(), (x_dim, n * u_dim));

        for k in 0..n {
            let expected = matrix_power(dynamics.a(), n - 1 - k) * dynamics.b();
            let block = lifted.psi_last.columns(k * u_dim, u_dim).clone_owned();
            assert_relative_eq!(block, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn last_block_is_b_itself() {
        let dynamics = LinearDynamics::point_mass(0.1).unwrap();
        let lifted = expand_horizon(&dynamics, 6);
        let last = lifted.psi_last.columns(5 * 3, 3).clone_owned();
        assert_relative_eq!(last, dynamics.b().clone(), epsilon = 1e-15);
    }

    #[test]
    fn single_step_is_one_dynamics_step() {
        let dynamics = LinearDynamics::point_mass(0.05).unwrap();
        let lifted = expand_horizon(&dynamics, 1);
        assert_relative_eq!(lifted.phi_last, dynamics.a().clone(), epsilon = 1e-15);
        assert_relative_eq!(lifted.psi_last, dynamics.b().clone(), epsilon = 1e-15);
    }

    #[test]
    fn terminal_state_matches_rollout() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let dynamics = LinearDynamics::point_mass(0.04).unwrap();
        let n = 15;
        let lifted = expand_horizon(&dynamics, n);

        let x0 = DVector::from_fn(6, |_, _| rng.random_range(-1.0..1.0));
        let controls = DVector::from_fn(3 * n, |_, _| rng.random_range(-2.0..2.0));

        let mut x = x0.clone();
        for k in 0..n {
            let u = controls.rows(3 * k, 3).clone_owned();
            x = dynamics.step(&x, &u);
        }

        assert_relative_eq!(lifted.terminal_state(&x0, &controls), x, epsilon = 1e-10);
    }

    #[test]
    #[should_panic(expected = "at least one step")]
    fn zero_steps_panics() {
        let dynamics = LinearDynamics::point_mass(0.1).unwrap();
        let _ = expand_horizon(&dynamics, 0);
    }
}
