//! Weighted quadratic cost over the stacked control sequence.
//!
//! With `b = x_goal - phi_last x_init`, the two objectives are
//!
//! ```text
//! effort:   |U|^2                  -> P1 = I,            q1 = 0
//! tracking: |psi_last U - b|^2     -> P2 = psi^T psi,    q2 = -psi^T b
//! ```
//!
//! and the QP cost is `1/2 U^T P U + q^T U` with `P = w1 P1 + w2 P2` and
//! `q = w1 q1 + w2 q2`. Both terms always trade off against each other.

use comtube_core::CostWeights;
use nalgebra::{DMatrix, DVector};

use crate::horizon::LiftedDynamics;

/// Quadratic cost `1/2 U^T P U + q^T U`.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadraticCost {
    /// Symmetric cost Hessian.
    pub p: DMatrix<f64>,
    /// Linear cost term.
    pub q: DVector<f64>,
}

impl QuadraticCost {
    pub fn n_vars(&self) -> usize {
        self.q.len()
    }

    /// `1/2 U^T P U + q^T U`.
    pub fn value(&self, u: &DVector<f64>) -> f64 {
        0.5 * u.dot(&(&self.p * u)) + self.q.dot(u)
    }

    /// Gradient `P U + q`.
    pub fn gradient(&self, u: &DVector<f64>) -> DVector<f64> {
        &self.p * u + &self.q
    }
}

/// Build the weighted effort + terminal-tracking cost.
///
/// # Panics
/// If `x_init` or `x_goal` do not match the lifted state dimension.
pub fn weighted_cost(
    lifted: &LiftedDynamics,
    x_init: &DVector<f64>,
    x_goal: &DVector<f64>,
    weights: &CostWeights,
) -> QuadraticCost {
    let x_dim = lifted.phi_last.nrows();
    assert_eq!(x_init.len(), x_dim, "x_init has wrong dimension");
    assert_eq!(x_goal.len(), x_dim, "x_goal has wrong dimension");

    let psi = &lifted.psi_last;
    let u_dim = psi.ncols();
    let b = x_goal - &lifted.phi_last * x_init;

    let p_effort = DMatrix::<f64>::identity(u_dim, u_dim);
    let p_tracking = psi.tr_mul(psi);
    let q_tracking = -psi.tr_mul(&b);

    QuadraticCost {
        p: p_effort * weights.effort + p_tracking * weights.tracking,
        q: q_tracking * weights.tracking,
    }
}
