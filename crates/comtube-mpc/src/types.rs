//! Core types for the preview-control pipeline.

use nalgebra::{DVector, Vector3};

/// Dimension of the tracked point's position (3-D center of mass).
pub const POSITION_DIM: usize = 3;

/// Point-mass state dimension: [p(3), pd(3)] = 6.
pub const STATE_DIM: usize = 2 * POSITION_DIM;

/// Point-mass control dimension: one 3-D acceleration per step.
pub const CONTROL_DIM: usize = POSITION_DIM;

/// Position and velocity of the tracked point mass.
#[derive(Clone, Debug, PartialEq)]
pub struct PointMassState {
    /// Position in world frame (meters).
    pub position: Vector3<f64>,
    /// Velocity in world frame (m/s).
    pub velocity: Vector3<f64>,
}

impl PointMassState {
    pub const fn new(position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self { position, velocity }
    }

    /// A point at rest.
    pub fn at_rest(position: Vector3<f64>) -> Self {
        Self {
            position,
            velocity: Vector3::zeros(),
        }
    }

    /// Pack into the 6-element state vector: [p, pd].
    pub fn to_state_vector(&self) -> DVector<f64> {
        let mut x = DVector::zeros(STATE_DIM);
        x.fixed_rows_mut::<3>(0).copy_from(&self.position);
        x.fixed_rows_mut::<3>(3).copy_from(&self.velocity);
        x
    }

    /// Unpack from a 6-element state vector.
    pub fn from_state_vector(x: &DVector<f64>) -> Self {
        assert_eq!(x.len(), STATE_DIM, "point-mass state must have 6 entries");
        Self {
            position: x.fixed_rows::<3>(0).into(),
            velocity: x.fixed_rows::<3>(3).into(),
        }
    }
}

/// What the stance scheduler wants the point mass to reach this tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewTargets {
    /// Time into the horizon at which the support region changes (s).
    pub switch_time: f64,
    /// Preview horizon duration (s).
    pub horizon: f64,
    /// Target state at the end of the horizon.
    pub target: PointMassState,
    /// Identifier of the scheduler phase that produced these targets.
    pub phase_id: usize,
}
