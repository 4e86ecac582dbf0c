//! Preview control of a point-mass center of mass inside a tube.
//!
//! Specializes the generic [`PreviewControl`] by construction only: the
//! dynamics are the 3-D double integrator over `duration / nb_steps`, and
//! the constraints are the tube's two dual halfspace regimes switched at
//! `floor(switch_time / dT)`.

use comtube_core::ConfigError;
use tracing::trace;

use crate::constraints::{InequalitySystem, Regime, assemble_constraints, switch_step};
use crate::dynamics::LinearDynamics;
use crate::preview::PreviewControl;
use crate::tube::Tube;
use crate::types::{CONTROL_DIM, PointMassState};

/// A point-mass preview problem and the step at which its regime switches.
#[derive(Clone, Debug)]
pub struct ComPreviewControl {
    pub preview: PreviewControl,
    /// Last step of the first regime, or `None` if the whole horizon uses it.
    pub switch_step: Option<usize>,
}

impl ComPreviewControl {
    /// Build the problem from the current and goal states.
    ///
    /// Fails only if `duration / nb_steps` is not a positive timestep.
    ///
    /// # Panics
    /// If `nb_steps` is zero or the tube's halfspaces do not act on 3-D
    /// accelerations.
    pub fn new<T: Tube + ?Sized>(
        start: &PointMassState,
        goal: &PointMassState,
        tube: &T,
        duration: f64,
        switch_time: f64,
        nb_steps: usize,
    ) -> Result<Self, ConfigError> {
        assert!(nb_steps > 0, "preview horizon needs at least one step");
        #[allow(clippy::cast_precision_loss)]
        let dt = duration / nb_steps as f64;
        Self::with_timestep(start, goal, tube, dt, switch_time, nb_steps)
    }

    /// Same as [`ComPreviewControl::new`] with the step duration given
    /// directly.
    pub fn with_timestep<T: Tube + ?Sized>(
        start: &PointMassState,
        goal: &PointMassState,
        tube: &T,
        dt: f64,
        switch_time: f64,
        nb_steps: usize,
    ) -> Result<Self, ConfigError> {
        assert!(nb_steps > 0, "preview horizon needs at least one step");
        let dynamics = LinearDynamics::point_mass(dt)?;

        let step = switch_step(switch_time, dt, nb_steps);
        let constraints = tube_constraints(tube, step, nb_steps);
        trace!(
            dt,
            switch_step = ?step,
            n_ineq = constraints.n_rows(),
            "built point-mass preview"
        );

        let preview = PreviewControl::new(
            dynamics,
            constraints,
            start.to_state_vector(),
            goal.to_state_vector(),
            nb_steps,
            dt,
        );
        Ok(Self {
            preview,
            switch_step: step,
        })
    }

    pub const fn timestep(&self) -> f64 {
        self.preview.timestep()
    }
}

/// `G U <= h` from a tube's dual representations.
///
/// # Panics
/// If the tube's halfspaces do not act on 3-D accelerations.
pub fn tube_constraints<T: Tube + ?Sized>(
    tube: &T,
    switch_step: Option<usize>,
    nb_steps: usize,
) -> InequalitySystem {
    let before = tube.dual_hrep(Regime::BeforeSwitch);
    let after = tube.dual_hrep(Regime::AfterSwitch);
    assert_eq!(
        before.dim(),
        CONTROL_DIM,
        "tube halfspaces must act on {CONTROL_DIM}-D accelerations"
    );
    assemble_constraints(before, after, switch_step, nb_steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Halfspaces;
    use crate::solver::ClarabelSolver;
    use crate::tube::HrepTube;
    use approx::assert_relative_eq;
    use comtube_core::CostWeights;
    use nalgebra::{DMatrix, DVector, Vector3};

    fn accel_box(limit: f64) -> Halfspaces {
        Halfspaces::bounds(
            &DVector::from_element(3, -limit),
            &DVector::from_element(3, limit),
        )
    }

    fn start() -> PointMassState {
        PointMassState::at_rest(Vector3::new(0.0, 0.0, 0.8))
    }

    fn goal() -> PointMassState {
        PointMassState::at_rest(Vector3::new(0.2, 0.1, 0.8))
    }

    #[test]
    fn timestep_and_switch_step() {
        let tube = HrepTube::single(accel_box(5.0));
        let com = ComPreviewControl::new(&start(), &goal(), &tube, 1.0, 0.35, 10).unwrap();
        assert_relative_eq!(com.timestep(), 0.1);
        assert_eq!(com.switch_step, Some(3));
        assert_eq!(com.preview.u_stacked_dim(), 30);
        assert_eq!(com.preview.constraints().n_rows(), 10 * 6);
    }

    #[test]
    fn switch_past_horizon_uses_first_regime() {
        let tube = HrepTube::new(accel_box(1.0), accel_box(9.0));
        let com = ComPreviewControl::new(&start(), &goal(), &tube, 1.0, 2.0, 10).unwrap();
        assert_eq!(com.switch_step, None);
        assert_relative_eq!(com.preview.constraints().h.amax(), 1.0);
    }

    #[test]
    fn second_regime_after_switch() {
        let tube = HrepTube::new(accel_box(1.0), accel_box(9.0));
        let com = ComPreviewControl::new(&start(), &goal(), &tube, 1.0, 0.45, 10).unwrap();
        assert_eq!(com.switch_step, Some(4));
        let h = &com.preview.constraints().h;
        // Steps 0..=4 use the first regime, 6 rows each.
        assert_relative_eq!(h.rows(0, 30).amax(), 1.0);
        assert_relative_eq!(h.rows(30, 30).amin(), 9.0);
    }

    #[test]
    fn with_timestep_matches_duration_form() {
        let tube = HrepTube::new(accel_box(1.0), accel_box(9.0));
        let by_duration = ComPreviewControl::new(&start(), &goal(), &tube, 0.8, 0.45, 8).unwrap();
        let by_step =
            ComPreviewControl::with_timestep(&start(), &goal(), &tube, 0.1, 0.45, 8).unwrap();
        assert_eq!(by_step.switch_step, by_duration.switch_step);
        assert_relative_eq!(by_step.timestep(), by_duration.timestep(), epsilon = 1e-15);
        assert_eq!(by_step.preview.constraints(), by_duration.preview.constraints());
    }

    #[test]
    fn non_positive_duration_is_config_error() {
        let tube = HrepTube::single(accel_box(1.0));
        let result = ComPreviewControl::new(&start(), &goal(), &tube, 0.0, 0.0, 10);
        assert!(matches!(result, Err(ConfigError::InvalidTimestep(_))));
    }

    #[test]
    fn solved_plan_respects_tube_and_approaches_goal() {
        let tube = HrepTube::new(accel_box(2.0), accel_box(1.0));
        let com = ComPreviewControl::new(&start(), &goal(), &tube, 1.0, 0.5, 10).unwrap();
        let constraints = com.preview.constraints().clone();
        let solution = com
            .preview
            .compute_dynamics()
            .compute_control(&ClarabelSolver::default(), &CostWeights::default())
            .unwrap();
        assert!(constraints.max_violation(solution.controls()) < 1e-6);

        let initial_error = (goal().position - start().position).norm();
        assert!(solution.terminal_position_error() < initial_error);
    }

    #[test]
    #[should_panic(expected = "3-D accelerations")]
    fn planar_tube_panics() {
        let flat = Halfspaces::new(DMatrix::identity(2, 2), DVector::from_element(2, 1.0));
        let tube = HrepTube::single(flat);
        let _ = ComPreviewControl::new(&start(), &goal(), &tube, 1.0, 0.5, 10);
    }
}
