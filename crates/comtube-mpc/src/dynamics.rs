//! Discrete-time linear dynamics for the preview controller.
//!
//! ```text
//! x_{k+1} = A x_k + B u_k
//! ```
//!
//! The point-mass model is a double integrator driven by acceleration,
//! discretized exactly under a zero-order hold on `u`:
//!
//! ```text
//! A = [ I   dT I ]     B = [ dT²/2 I ]
//!     [ 0    I   ]         [  dT I   ]
//! ```

use comtube_core::ConfigError;
use nalgebra::{DMatrix, DVector};

use crate::types::POSITION_DIM;

/// State-space matrices (A, B), constant over one preview horizon.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearDynamics {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
}

impl LinearDynamics {
    /// Wrap existing matrices.
    ///
    /// # Panics
    /// If `a` is not square or `b` has a different number of rows.
    pub fn new(a: DMatrix<f64>, b: DMatrix<f64>) -> Self {
        assert_eq!(a.nrows(), a.ncols(), "A must be square, got {:?}", a.shape());
        assert_eq!(
            b.nrows(),
            a.nrows(),
            "B must have as many rows as A: {} vs {}",
            b.nrows(),
            a.nrows()
        );
        Self { a, b }
    }

    /// Double integrator over `position_dim` axes for one step of `dt`.
    pub fn double_integrator(position_dim: usize, dt: f64) -> Result<Self, ConfigError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::InvalidTimestep(dt));
        }
        let n = position_dim;
        let mut a = DMatrix::identity(2 * n, 2 * n);
        let mut b = DMatrix::zeros(2 * n, n);
        for i in 0..n {
            a[(i, n + i)] = dt;
            b[(i, i)] = 0.5 * dt * dt;
            b[(n + i, i)] = dt;
        }
        Ok(Self { a, b })
    }

    /// 3-D point mass (center of mass) driven by acceleration.
    pub fn point_mass(dt: f64) -> Result<Self, ConfigError> {
        Self::double_integrator(POSITION_DIM, dt)
    }

    pub const fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub const fn b(&self) -> &DMatrix<f64> {
        &self.b
    }

    pub fn state_dim(&self) -> usize {
        self.a.nrows()
    }

    pub fn control_dim(&self) -> usize {
        self.b.ncols()
    }

    /// One step of the dynamics.
    pub fn step(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        &self.a * x + &self.b * u
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_mass_block_structure() {
        let dt = 0.1;
        let dynamics = LinearDynamics::point_mass(dt).unwrap();
        assert_eq!(dynamics.state_dim(), 6);
        assert_eq!(dynamics.control_dim(), 3);

        let a = dynamics.a();
        let b = dynamics.b();
        for i in 0..3 {
            assert_relative_eq!(a[(i, i)], 1.0);
            assert_relative_eq!(a[(i + 3, i + 3)], 1.0);
            assert_relative_eq!(a[(i, i + 3)], dt);
            assert_relative_eq!(a[(i + 3, i)], 0.0);
            assert_relative_eq!(b[(i, i)], 0.005, epsilon = 1e-15);
            assert_relative_eq!(b[(i + 3, i)], dt);
        }
        // No cross-axis coupling
        assert_relative_eq!(a[(0, 4)], 0.0);
        assert_relative_eq!(b[(0, 1)], 0.0);
        assert_relative_eq!(b[(4, 0)], 0.0);
    }

    #[test]
    fn one_dimensional_double_integrator() {
        let dt = 0.05;
        let dynamics = LinearDynamics::double_integrator(1, dt).unwrap();
        let expected_a = DMatrix::from_row_slice(2, 2, &[1.0, dt, 0.0, 1.0]);
        let expected_b = DMatrix::from_row_slice(2, 1, &[0.5 * dt * dt, dt]);
        assert_relative_eq!(*dynamics.a(), expected_a, epsilon = 1e-15);
        assert_relative_eq!(*dynamics.b(), expected_b, epsilon = 1e-15);
    }

    #[test]
    fn constant_acceleration_matches_kinematics() {
        // p(t) = p0 + v0 t + a t²/2 is exact under zero-order hold.
        let dt = 0.02;
        let dynamics = LinearDynamics::point_mass(dt).unwrap();
        let mut x = DVector::from_row_slice(&[0.0, 0.0, 1.0, 0.5, 0.0, 0.0]);
        let u = DVector::from_row_slice(&[1.0, -2.0, 0.0]);
        for _ in 0..50 {
            x = dynamics.step(&x, &u);
        }
        let t = 1.0;
        assert_relative_eq!(x[0], 0.5 * t + 0.5 * t * t, epsilon = 1e-10);
        assert_relative_eq!(x[1], -t * t, epsilon = 1e-10);
        assert_relative_eq!(x[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[3], 0.5 + t, epsilon = 1e-10);
        assert_relative_eq!(x[4], -2.0 * t, epsilon = 1e-10);
    }

    #[test]
    fn non_positive_timestep_rejected() {
        assert!(matches!(
            LinearDynamics::point_mass(0.0),
            Err(ConfigError::InvalidTimestep(_))
        ));
        assert!(LinearDynamics::point_mass(-0.01).is_err());
        assert!(LinearDynamics::point_mass(f64::NAN).is_err());
    }

    #[test]
    #[should_panic(expected = "as many rows")]
    fn mismatched_b_panics() {
        let _ = LinearDynamics::new(DMatrix::identity(4, 4), DMatrix::zeros(3, 2));
    }
}
