//! Latest-plan buffer between the preview controller and the integrator.
//!
//! Holds the most recently published [`PreviewSolution`] and the time
//! consumed from it. Publishing replaces the plan whole and rewinds the
//! clock; ticks that fail never reach the buffer, so the previous plan keeps
//! being played back until a new one arrives.

use nalgebra::DVector;

use crate::dynamics::LinearDynamics;
use crate::preview::PreviewSolution;
use crate::traits::PreviewSink;

#[derive(Clone, Debug, Default)]
pub struct PreviewBuffer {
    plan: Option<PreviewSolution>,
    /// Seconds consumed from the current plan.
    elapsed: f64,
    /// Number of plans received.
    updates: u64,
}

impl PreviewBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn latest(&self) -> Option<&PreviewSolution> {
        self.plan.as_ref()
    }

    pub const fn updates(&self) -> u64 {
        self.updates
    }

    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Control active `t` seconds into the current plan, or `None` outside
    /// the plan.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn control_at(&self, t: f64) -> Option<DVector<f64>> {
        let plan = self.plan.as_ref()?;
        if !(0.0..plan.duration()).contains(&t) {
            return None;
        }
        let k = ((t / plan.timestep()).floor() as usize).min(plan.nb_steps() - 1);
        Some(plan.control(k).clone_owned())
    }

    /// State reached `t` seconds into the current plan.
    ///
    /// Whole steps follow the plan's dynamics; the remainder of the last
    /// step is integrated as a double integrator under its constant control.
    /// Plans whose state is not `[position, velocity]` of the control's
    /// dimension are only evaluated on the step grid: `None` between steps.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn state_at(&self, t: f64) -> Option<DVector<f64>> {
        let plan = self.plan.as_ref()?;
        if !(0.0..=plan.duration()).contains(&t) {
            return None;
        }
        let dt = plan.timestep();
        let whole = ((t / dt).floor() as usize).min(plan.nb_steps());
        let mut x = plan.x_init().clone();
        for k in 0..whole {
            x = plan.dynamics().step(&x, &plan.control(k).clone_owned());
        }
        let remainder = t - dt * whole as f64;
        if whole < plan.nb_steps() && remainder > 0.0 {
            let control_dim = plan.dynamics().control_dim();
            if plan.dynamics().state_dim() != 2 * control_dim {
                return None;
            }
            let partial = LinearDynamics::double_integrator(control_dim, remainder).ok()?;
            x = partial.step(&x, &plan.control(whole).clone_owned());
        }
        Some(x)
    }

    /// Control to apply now, then advance the plan clock by `dt`.
    pub fn advance(&mut self, dt: f64) -> Option<DVector<f64>> {
        let u = self.control_at(self.elapsed);
        self.elapsed += dt;
        u
    }

    /// Whether the current plan has been fully consumed.
    pub fn is_exhausted(&self) -> bool {
        self.plan
            .as_ref()
            .is_none_or(|plan| self.elapsed >= plan.duration())
    }
}

impl PreviewSink for PreviewBuffer {
    fn update_preview(&mut self, solution: PreviewSolution) {
        self.plan = Some(solution);
        self.elapsed = 0.0;
        self.updates += 1;
    }
}
